//! Encoding and multiplexing through an ffmpeg child process.
//!
//! Composited frames are pushed through a bounded channel to a writer
//! thread that feeds the encoder's stdin. The channel is the ordering
//! guarantee: frames leave in exactly the order they were submitted, and
//! the bounded capacity backpressures the compositor instead of piling
//! frames up in memory. The ffmpeg process both encodes and muxes the
//! mp4, so `finish` surfaces container failures as fatal errors.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use zoomcast_common::{ZoomcastError, ZoomcastResult};
use zoomcast_effect_model::ExportSettings;

use crate::export::CancelFlag;

/// Bounded frame queue depth between the compositor and the writer.
const FRAME_QUEUE_DEPTH: usize = 8;

/// Give up submitting a frame after this long without queue space.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Keyframe interval in seconds.
const KEYFRAME_INTERVAL_SECS: u32 = 1;

/// A codec family we know how to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFamily {
    H264,
    Hevc,
    Vp9,
}

impl CodecFamily {
    /// Parse a MIME-style codec string (`avc1.640028`, `hvc1`,
    /// `vp09.00.10.08`, ...).
    pub fn from_codec_string(codec: &str) -> ZoomcastResult<Self> {
        let tag = codec.split('.').next().unwrap_or(codec);
        match tag {
            "avc1" | "avc3" | "h264" => Ok(CodecFamily::H264),
            "hvc1" | "hev1" | "hevc" | "h265" => Ok(CodecFamily::Hevc),
            "vp09" | "vp9" => Ok(CodecFamily::Vp9),
            other => Err(ZoomcastError::unsupported_encoder(format!(
                "unsupported codec '{other}'"
            ))),
        }
    }

    /// Hardware encoder names in preference order.
    fn hardware_encoders(self) -> &'static [&'static str] {
        match self {
            CodecFamily::H264 => &["h264_nvenc", "h264_vaapi", "h264_videotoolbox"],
            CodecFamily::Hevc => &["hevc_nvenc", "hevc_vaapi", "hevc_videotoolbox"],
            CodecFamily::Vp9 => &["vp9_vaapi", "vp9_qsv"],
        }
    }

    fn software_encoder(self) -> &'static str {
        match self {
            CodecFamily::H264 => "libx264",
            CodecFamily::Hevc => "libx265",
            CodecFamily::Vp9 => "libvpx-vp9",
        }
    }
}

/// Whether `path` targets an mp4-family container, where the `faststart`
/// flag relocates the moov atom. Other containers (webm for VP9) must not
/// receive mov muxer options.
fn is_mp4_container(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("mp4") | Some("m4v") | Some("mov")
    )
}

/// Pick the encoder for a codec string: the first available hardware
/// encoder, else the software one. Errors when ffmpeg has neither.
pub fn select_encoder(codec: &str) -> ZoomcastResult<String> {
    let family = CodecFamily::from_codec_string(codec)?;
    let available = list_ffmpeg_encoders()?;

    for candidate in family.hardware_encoders() {
        if available.contains(*candidate) {
            tracing::info!(encoder = candidate, "Using hardware encoder");
            return Ok((*candidate).to_string());
        }
    }

    let software = family.software_encoder();
    if available.contains(software) {
        tracing::info!(encoder = software, "Using software encoder");
        return Ok(software.to_string());
    }

    Err(ZoomcastError::unsupported_encoder(format!(
        "ffmpeg has no encoder for '{codec}' (checked {:?} and {software})",
        family.hardware_encoders()
    )))
}

fn list_ffmpeg_encoders() -> ZoomcastResult<String> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .map_err(|e| {
            ZoomcastError::unsupported_encoder(format!("failed to list ffmpeg encoders: {e}"))
        })?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// The running encoder process plus its feed machinery.
pub struct EncoderSink {
    child: Option<Child>,
    tx: Option<SyncSender<Vec<u8>>>,
    writer: Option<JoinHandle<Result<u64, String>>>,
    stderr_reader: Option<JoinHandle<String>>,
    frame_len: usize,
    last_timestamp_us: Option<u64>,
    output_path: PathBuf,
}

impl EncoderSink {
    /// Spawn the encoder for `settings` at the resolved frame rate.
    pub fn spawn(settings: &ExportSettings, fps: u32, output_path: &Path) -> ZoomcastResult<Self> {
        let encoder = select_encoder(&settings.codec)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-hide_banner", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgba"])
            .arg("-video_size")
            .arg(format!("{}x{}", settings.width, settings.height))
            .arg("-framerate")
            .arg(fps.to_string())
            .args(["-i", "pipe:0", "-an"])
            .arg("-c:v")
            .arg(&encoder)
            .arg("-b:v")
            .arg(settings.bitrate.to_string())
            .args(["-pix_fmt", "yuv420p"])
            // BT.709 tags so players interpret the colors consistently.
            .args([
                "-colorspace",
                "bt709",
                "-color_primaries",
                "bt709",
                "-color_trc",
                "bt709",
            ])
            .arg("-force_key_frames")
            .arg(format!("expr:gte(t,n_forced*{KEYFRAME_INTERVAL_SECS})"));
        if is_mp4_container(output_path) {
            cmd.args(["-movflags", "+faststart"]);
        }
        cmd.arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| ZoomcastError::encode(format!("failed to start encoder: {e}")))?;

        tracing::info!(
            pid = child.id(),
            encoder,
            fps,
            bitrate = settings.bitrate,
            output = %output_path.display(),
            "Encoder process started"
        );

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ZoomcastError::encode("encoder process has no stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ZoomcastError::encode("encoder process has no stderr"))?;

        // Drain stderr concurrently so the encoder never blocks on it.
        let stderr_reader = std::thread::spawn(move || -> String {
            let mut buf = String::new();
            let mut stderr = stderr;
            match stderr.read_to_string(&mut buf) {
                Ok(_) => buf,
                Err(err) => format!("<failed to read encoder stderr: {err}>"),
            }
        });

        let (tx, rx) = sync_channel::<Vec<u8>>(FRAME_QUEUE_DEPTH);
        let writer = std::thread::spawn(move || -> Result<u64, String> {
            let mut written = 0u64;
            while let Ok(frame) = rx.recv() {
                stdin
                    .write_all(&frame)
                    .map_err(|e| format!("frame {written}: {e}"))?;
                written += 1;
            }
            // Dropping stdin closes the pipe and flushes the encoder.
            drop(stdin);
            Ok(written)
        });

        Ok(Self {
            child: Some(child),
            tx: Some(tx),
            writer: Some(writer),
            stderr_reader: Some(stderr_reader),
            frame_len: settings.width as usize * settings.height as usize * 4,
            last_timestamp_us: None,
            output_path: output_path.to_path_buf(),
        })
    }

    /// Submit one frame for encoding. Blocks under backpressure, checking
    /// the cancel flag while waiting; timestamps must be strictly
    /// increasing.
    pub fn submit(
        &mut self,
        frame: Vec<u8>,
        timestamp_us: u64,
        cancel: &CancelFlag,
    ) -> ZoomcastResult<()> {
        if frame.len() != self.frame_len {
            return Err(ZoomcastError::encode(format!(
                "frame has {} bytes, expected {}",
                frame.len(),
                self.frame_len
            )));
        }
        if let Some(last) = self.last_timestamp_us {
            if timestamp_us <= last {
                return Err(ZoomcastError::encode(format!(
                    "out-of-order frame timestamp {timestamp_us}us after {last}us"
                )));
            }
        }

        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| ZoomcastError::encode("encoder sink is closed"))?;

        let started = Instant::now();
        let mut frame = frame;
        loop {
            match tx.try_send(frame) {
                Ok(()) => {
                    self.last_timestamp_us = Some(timestamp_us);
                    return Ok(());
                }
                Err(TrySendError::Full(returned)) => {
                    if cancel.is_cancelled() {
                        return Err(ZoomcastError::Cancelled);
                    }
                    if started.elapsed() > SUBMIT_TIMEOUT {
                        return Err(ZoomcastError::encode(
                            "encoder stalled: no queue space for 30s",
                        ));
                    }
                    frame = returned;
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(TrySendError::Disconnected(_)) => {
                    return Err(self.collect_failure("encoder writer stopped"));
                }
            }
        }
    }

    /// Close the queue, flush the encoder, and wait for the muxer.
    pub fn finish(mut self) -> ZoomcastResult<u64> {
        // Closing the sender lets the writer drain and close stdin.
        drop(self.tx.take());

        let written = match self.writer.take() {
            Some(handle) => match handle.join() {
                Ok(Ok(written)) => written,
                Ok(Err(err)) => {
                    self.abort();
                    return Err(ZoomcastError::encode(format!(
                        "encoder pipe write failed: {err}"
                    )));
                }
                Err(_) => {
                    self.abort();
                    return Err(ZoomcastError::encode("encoder writer thread panicked"));
                }
            },
            None => 0,
        };

        let status = match self.child.take() {
            Some(mut child) => child
                .wait()
                .map_err(|e| ZoomcastError::encode(format!("failed to wait on encoder: {e}")))?,
            None => return Err(ZoomcastError::encode("encoder already shut down")),
        };

        let stderr = self
            .stderr_reader
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(ZoomcastError::mux(format!(
                "encoder exited with {status}: {}",
                stderr.trim()
            )));
        }

        tracing::info!(
            frames = written,
            output = %self.output_path.display(),
            "Encoder finished"
        );
        Ok(written)
    }

    /// Kill the encoder immediately. Safe to call more than once; used on
    /// cancellation and failure paths.
    pub fn abort(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_reader.take() {
            let _ = handle.join();
        }
    }

    fn collect_failure(&mut self, context: &str) -> ZoomcastError {
        let detail = match self.writer.take() {
            Some(handle) => match handle.join() {
                Ok(Err(err)) => err,
                _ => String::new(),
            },
            None => String::new(),
        };
        self.abort();
        if detail.is_empty() {
            ZoomcastError::encode(context.to_string())
        } else {
            ZoomcastError::encode(format!("{context}: {detail}"))
        }
    }
}

impl Drop for EncoderSink {
    fn drop(&mut self) {
        self.abort();
    }
}
