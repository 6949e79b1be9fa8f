//! Source video probing and frame-accurate decoding.
//!
//! Probing runs ffprobe in a separate short-lived process so it can never
//! leak playback state into the decode pipe. Decoding itself is an ffmpeg
//! child process emitting rawvideo RGBA on stdout, locked to the output
//! frame cadence with an `fps` filter, so `read_frame` yields exactly one
//! buffer per output frame.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use zoomcast_common::{ZoomcastError, ZoomcastResult};

use crate::frame::RgbaFrame;

/// Frame rates a measured inter-frame delta is snapped to.
const COMMON_FRAME_RATES: [u32; 7] = [24, 25, 30, 48, 50, 60, 120];

/// Minimum timestamp samples for an empirical frame-rate estimate.
const MIN_FPS_SAMPLES: usize = 6;

/// Timestamp samples requested from the probe.
const FPS_SAMPLE_COUNT: usize = 30;

pub(crate) const DEFAULT_FRAME_RATE: u32 = 60;

/// Check whether a binary is on PATH.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Stream properties of a probed source video.
#[derive(Debug, Clone)]
pub struct VideoSource {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    /// Container-declared frame rate, when the stream carries a sane one.
    pub declared_fps: Option<f64>,
    pub codec: String,
}

impl VideoSource {
    /// Probe `path` with ffprobe.
    pub fn open(path: &Path) -> ZoomcastResult<Self> {
        if !path.exists() {
            return Err(ZoomcastError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,codec_name,avg_frame_rate:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| ZoomcastError::decode(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ZoomcastError::decode(format!(
                "ffprobe failed on {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let probe: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ZoomcastError::decode(format!("unparseable ffprobe output: {e}")))?;

        let stream = probe["streams"]
            .get(0)
            .ok_or_else(|| ZoomcastError::decode("source has no video stream"))?;

        let width = stream["width"].as_u64().unwrap_or(0) as u32;
        let height = stream["height"].as_u64().unwrap_or(0) as u32;
        if width == 0 || height == 0 {
            return Err(ZoomcastError::decode("source has zero dimensions"));
        }

        let duration_secs = probe["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        let declared_fps = stream["avg_frame_rate"]
            .as_str()
            .and_then(parse_rational)
            .filter(|fps| (1.0..=480.0).contains(fps));

        let codec = stream["codec_name"].as_str().unwrap_or("unknown").to_string();

        tracing::debug!(
            path = %path.display(),
            width,
            height,
            duration_secs,
            ?declared_fps,
            codec,
            "Probed source video"
        );

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            duration_secs,
            declared_fps,
            codec,
        })
    }

    /// Resolve the output frame rate.
    ///
    /// Priority: a positive sidecar fps; an empirical estimate from the
    /// first ~30 frame timestamps; a duration heuristic; 60.
    pub fn resolve_frame_rate(&self, sidecar_fps: Option<f64>) -> u32 {
        if let Some(fps) = sidecar_fps.filter(|fps| *fps > 0.0) {
            tracing::debug!(fps, "Frame rate from sidecar metadata");
            return fps.round().max(1.0) as u32;
        }

        if let Some(fps) = empirical_frame_rate(&self.path) {
            tracing::debug!(fps, "Frame rate measured from frame timestamps");
            return fps;
        }

        let fps = if self.duration_secs <= 0.0 {
            DEFAULT_FRAME_RATE
        } else if self.duration_secs > 300.0 {
            30
        } else {
            60
        };
        tracing::debug!(fps, duration_secs = self.duration_secs, "Frame rate from duration heuristic");
        fps
    }
}

/// Seek targets stay inside the stream: never negative, never at or past
/// the end (the last millisecond is unreachable so a seek always leaves
/// at least one frame to read).
fn clamp_seek_target(duration_secs: f64, secs: f64) -> f64 {
    secs.clamp(0.0, (duration_secs - 1e-3).max(0.0))
}

/// Parse an ffprobe rational like `"60000/1001"`.
fn parse_rational(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Measure the frame rate from decoded frame timestamps: the median
/// inter-frame delta of the first ~30 frames, snapped to the nearest
/// common rate. Needs at least 6 samples to count.
fn empirical_frame_rate(path: &Path) -> Option<u32> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "frame=pts_time",
            "-of",
            "csv=p=0",
            "-read_intervals",
        ])
        .arg(format!("%+#{FPS_SAMPLE_COUNT}"))
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    let timestamps: Vec<f64> = raw
        .lines()
        .filter_map(|line| line.trim().trim_end_matches(',').parse::<f64>().ok())
        .take(FPS_SAMPLE_COUNT)
        .collect();

    median_interval_fps(&timestamps)
}

/// The snapping half of the empirical estimate, split out for testing.
fn median_interval_fps(timestamps: &[f64]) -> Option<u32> {
    if timestamps.len() < MIN_FPS_SAMPLES {
        return None;
    }

    let mut deltas: Vec<f64> = timestamps
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .collect();
    if deltas.len() < MIN_FPS_SAMPLES - 1 {
        return None;
    }

    deltas.sort_by(f64::total_cmp);
    let median = deltas[deltas.len() / 2];
    let measured = 1.0 / median;

    COMMON_FRAME_RATES
        .iter()
        .copied()
        .min_by(|a, b| {
            (*a as f64 - measured)
                .abs()
                .total_cmp(&(*b as f64 - measured).abs())
        })
}

/// A running rawvideo decode pipe.
pub struct FrameReader {
    path: PathBuf,
    fps: u32,
    width: u32,
    height: u32,
    duration_secs: f64,
    child: Option<Child>,
    position_secs: f64,
    frames_read: u64,
}

impl FrameReader {
    /// Spawn the decode pipe at the start of the video.
    pub fn spawn(source: &VideoSource, fps: u32) -> ZoomcastResult<Self> {
        let mut reader = Self {
            path: source.path.clone(),
            fps: fps.max(1),
            width: source.width,
            height: source.height,
            duration_secs: source.duration_secs,
            child: None,
            position_secs: 0.0,
            frames_read: 0,
        };
        reader.start_pipe(0.0)?;
        Ok(reader)
    }

    fn start_pipe(&mut self, start_secs: f64) -> ZoomcastResult<()> {
        self.stop_pipe();

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin"]);
        if start_secs > 0.0 {
            cmd.arg("-ss").arg(format!("{start_secs:.6}"));
        }
        cmd.arg("-i")
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-vf"])
            .arg(format!("fps={}", self.fps))
            .args(["-an", "-sn", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let child = cmd
            .spawn()
            .map_err(|e| ZoomcastError::decode(format!("failed to start decoder: {e}")))?;

        tracing::debug!(
            pid = child.id(),
            start_secs,
            fps = self.fps,
            "Decode pipe started"
        );

        self.child = Some(child);
        self.position_secs = start_secs;
        self.frames_read = 0;
        Ok(())
    }

    fn stop_pipe(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Current playback position in seconds.
    pub fn position_secs(&self) -> f64 {
        self.position_secs + self.frames_read as f64 / self.fps as f64
    }

    /// Restart the pipe at `secs` unless it is already positioned there.
    /// Returns once the pipe is spawned and the next `read_frame` will
    /// yield the frame at (or after) `secs`.
    pub fn seek_to(&mut self, secs: f64) -> ZoomcastResult<()> {
        let clamped = clamp_seek_target(self.duration_secs, secs);
        if (self.position_secs() - clamped).abs() < 0.5 / self.fps as f64 {
            return Ok(());
        }
        self.start_pipe(clamped)
    }

    /// Read the next frame. `Ok(None)` signals a clean end of stream.
    pub fn read_frame(&mut self) -> ZoomcastResult<Option<RgbaFrame>> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| ZoomcastError::decode("decode pipe is not running"))?;
        let stdout = child
            .stdout
            .as_mut()
            .ok_or_else(|| ZoomcastError::decode("decode pipe has no stdout"))?;

        let frame_len = self.width as usize * self.height as usize * 4;
        let mut buf = vec![0u8; frame_len];
        let mut filled = 0usize;

        while filled < frame_len {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => {
                    if filled == 0 {
                        return Ok(None);
                    }
                    return Err(ZoomcastError::decode(format!(
                        "decode pipe ended mid-frame ({filled}/{frame_len} bytes)"
                    )));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ZoomcastError::decode(format!(
                        "decode pipe read failed: {e}"
                    )))
                }
            }
        }

        self.frames_read += 1;
        RgbaFrame::from_raw(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| ZoomcastError::decode("decoded frame has wrong length"))
    }

    /// Tear down the decode pipe. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.stop_pipe();
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        self.stop_pipe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rational() {
        assert_eq!(parse_rational("60/1"), Some(60.0));
        assert!((parse_rational("60000/1001").unwrap() - 59.94).abs() < 0.01);
        assert_eq!(parse_rational("0/0"), None);
        assert_eq!(parse_rational("garbage"), None);
    }

    #[test]
    fn test_median_fps_snaps_to_common_rate() {
        // ~16.7ms deltas with jitter: 60 fps.
        let ts: Vec<f64> = (0..30).map(|i| i as f64 * 0.0167).collect();
        assert_eq!(median_interval_fps(&ts), Some(60));

        // ~33ms: 30 fps.
        let ts: Vec<f64> = (0..30).map(|i| i as f64 * 0.0333).collect();
        assert_eq!(median_interval_fps(&ts), Some(30));
    }

    #[test]
    fn test_median_fps_needs_enough_samples() {
        let ts: Vec<f64> = (0..5).map(|i| i as f64 * 0.0167).collect();
        assert_eq!(median_interval_fps(&ts), None);
    }

    #[test]
    fn test_median_fps_ignores_duplicate_timestamps() {
        let mut ts: Vec<f64> = (0..20).map(|i| i as f64 * 0.02).collect();
        ts.insert(5, ts[5]);
        assert_eq!(median_interval_fps(&ts), Some(50));
    }

    #[test]
    fn test_missing_file_is_file_not_found() {
        let err = VideoSource::open(Path::new("/nonexistent/video.mp4")).unwrap_err();
        assert!(matches!(err, ZoomcastError::FileNotFound { .. }));
    }

    #[test]
    fn test_seek_targets_clamp_to_stream_bounds() {
        assert_eq!(clamp_seek_target(10.0, -5.0), 0.0);
        assert!((clamp_seek_target(10.0, 99.0) - 9.999).abs() < 1e-9);
        assert_eq!(clamp_seek_target(10.0, 4.5), 4.5);
        // Degenerate zero-length stream still yields a valid target.
        assert_eq!(clamp_seek_target(0.0, 3.0), 0.0);
    }

    fn idle_reader(fps: u32, duration_secs: f64, position_secs: f64) -> FrameReader {
        FrameReader {
            path: PathBuf::from("/nonexistent/video.mp4"),
            fps,
            width: 2,
            height: 2,
            duration_secs,
            child: None,
            position_secs,
            frames_read: 0,
        }
    }

    #[test]
    fn test_seek_within_half_frame_is_a_no_op() {
        // Within half a frame of the current position no pipe restart
        // happens, so the reader stays in whatever state it was in.
        let mut reader = idle_reader(30, 10.0, 2.0);
        reader.seek_to(2.01).unwrap();
        assert!(reader.child.is_none());

        // Past the window a restart is required.
        let mut reader = idle_reader(30, 10.0, 2.0);
        assert!(reader.seek_to(5.0).is_err() || reader.child.is_some());
    }
}
