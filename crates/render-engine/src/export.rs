//! The export orchestrator.
//!
//! Drives the whole pipeline for one job: probe, resolve the frame rate,
//! set up the compositor, spawn the decode pipe and the encoder, then run
//! the frame loop with cooperative cancellation and per-frame progress.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use zoomcast_common::{ZoomcastError, ZoomcastResult};
use zoomcast_effect_model::{load_recording_meta, ExportSettings};
use zoomcast_motion::CameraDriver;

use crate::compositor::FrameCompositor;
use crate::decoder::{command_exists, FrameReader, VideoSource};
use crate::encoder::EncoderSink;
use crate::frame::RgbaFrame;

/// Cooperative cancellation handle, cheap to clone across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Stages of one export, in order of occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Idle,
    Initializing,
    Rendering,
    Flushing,
    Finalizing,
    Completed,
    Cancelled,
    Failed,
}

/// Export progress report.
#[derive(Debug, Clone, Copy)]
pub struct ExportProgress {
    pub current_frame: u64,
    pub total_frames: u64,
    /// Percent complete in `[0, 100]`, non-decreasing over a run.
    pub percentage: f64,
    /// Wall-clock estimate of the time remaining, in seconds.
    pub eta_secs: f64,
    pub stage: ExportStage,
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// An export job ready to run.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// The recorded screen video.
    pub input_path: PathBuf,

    /// Output mp4 path.
    pub output_path: PathBuf,

    /// Full effect and encode parameter set.
    pub settings: ExportSettings,
}

/// A completed export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub output_path: PathBuf,
    pub frames: u64,
}

/// Run an export job to completion, cancellation, or failure.
///
/// On any fatal failure the partial output file is removed and every
/// child process is torn down before this returns. Cancellation surfaces
/// as `ZoomcastError::Cancelled`, distinct from failures.
pub fn export(
    job: &ExportJob,
    progress: Option<ProgressCallback>,
    cancel: &CancelFlag,
) -> ZoomcastResult<ExportOutcome> {
    let started = Instant::now();
    let reporter = Reporter::new(progress);

    let errors = job.settings.validate();
    if !errors.is_empty() {
        return Err(ZoomcastError::invalid_settings(errors.join("; ")));
    }

    if cancel.is_cancelled() {
        reporter.stage(ExportStage::Cancelled, 0, 0);
        return Err(ZoomcastError::Cancelled);
    }

    if !command_exists("ffmpeg") || !command_exists("ffprobe") {
        return Err(ZoomcastError::decode(
            "ffmpeg and ffprobe are required for export but were not found in PATH",
        ));
    }

    reporter.stage(ExportStage::Initializing, 0, 0);
    tracing::info!(
        input = %job.input_path.display(),
        output = %job.output_path.display(),
        "Starting export"
    );

    // Initialization order: decoder probe, frame rate, compositor,
    // encoder.
    let source = VideoSource::open(&job.input_path)?;

    let sidecar_fps = match load_recording_meta(&job.input_path) {
        Ok(meta) => meta.and_then(|m| m.fps),
        Err(err) => return Err(ZoomcastError::sidecar(err.to_string())),
    };
    let fps = if job.settings.frame_rate > 0 {
        job.settings.frame_rate
    } else {
        source.resolve_frame_rate(sidecar_fps)
    };

    let total_frames = (source.duration_secs * fps as f64).ceil().max(1.0) as u64;

    let mut compositor = FrameCompositor::new(&job.settings, source.width, source.height)?;

    if let Some(parent) = job.output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut reader = FrameReader::spawn(&source, fps)?;
    let mut encoder = EncoderSink::spawn(&job.settings, fps, &job.output_path)?;

    tracing::info!(
        fps,
        total_frames,
        duration_secs = source.duration_secs,
        source_w = source.width,
        source_h = source.height,
        "Export pipeline initialized"
    );

    match render_loop(
        job,
        &mut reader,
        &mut encoder,
        &mut compositor,
        fps,
        total_frames,
        cancel,
        &reporter,
        started,
    ) {
        Ok(()) => {}
        Err(err) => {
            reader.shutdown();
            encoder.abort();
            remove_partial_output(job);
            let stage = if err.is_cancelled() {
                ExportStage::Cancelled
            } else {
                ExportStage::Failed
            };
            reporter.stage(stage, 0, total_frames);
            return Err(err);
        }
    }

    reporter.stage(ExportStage::Flushing, total_frames, total_frames);
    reader.shutdown();

    let frames = match encoder.finish() {
        Ok(frames) => frames,
        Err(err) => {
            remove_partial_output(job);
            reporter.stage(ExportStage::Failed, 0, total_frames);
            return Err(err);
        }
    };

    reporter.stage(ExportStage::Finalizing, total_frames, total_frames);
    if !job.output_path.exists() {
        reporter.stage(ExportStage::Failed, 0, total_frames);
        return Err(ZoomcastError::mux(format!(
            "encoder reported success but {} does not exist",
            job.output_path.display()
        )));
    }

    reporter.stage(ExportStage::Completed, total_frames, total_frames);
    tracing::info!(
        frames,
        elapsed_secs = started.elapsed().as_secs_f64(),
        output = %job.output_path.display(),
        "Export finished"
    );

    Ok(ExportOutcome {
        output_path: job.output_path.clone(),
        frames,
    })
}

#[allow(clippy::too_many_arguments)]
fn render_loop(
    job: &ExportJob,
    reader: &mut FrameReader,
    encoder: &mut EncoderSink,
    compositor: &mut FrameCompositor,
    fps: u32,
    total_frames: u64,
    cancel: &CancelFlag,
    reporter: &Reporter,
    started: Instant,
) -> ZoomcastResult<()> {
    let mut camera = CameraDriver::new();
    let mut last_good: Option<RgbaFrame> = None;
    let mut skipped_frames = 0u64;

    for i in 0..total_frames {
        if cancel.is_cancelled() {
            tracing::info!(frame = i, "Export cancelled");
            return Err(ZoomcastError::Cancelled);
        }

        let time_ms = i as f64 * 1000.0 / fps as f64;

        // One malformed frame may be skipped by reusing the previous
        // frame; back-to-back failures abort the export.
        let src = match reader.read_frame() {
            Ok(Some(frame)) => {
                skipped_frames = 0;
                last_good = Some(frame);
                last_good.as_ref().unwrap()
            }
            Ok(None) => match &last_good {
                // Cadence rounding can end the stream a frame early; pad
                // with the previous frame.
                Some(frame) => frame,
                None => {
                    return Err(ZoomcastError::frame_extraction(
                        i,
                        "decode pipe produced no frames",
                    ))
                }
            },
            Err(err) => {
                skipped_frames += 1;
                if skipped_frames > 1 {
                    return Err(ZoomcastError::frame_extraction(
                        i,
                        format!("repeated decode failure: {err}"),
                    ));
                }
                tracing::warn!(frame = i, error = %err, "Skipping malformed source frame");
                // Resync the decode pipe onto the next output frame so a
                // single bad frame does not kill the rest of the stream.
                if let Err(seek_err) = reader.seek_to((i + 1) as f64 / fps as f64) {
                    return Err(ZoomcastError::frame_extraction(
                        i,
                        format!("failed to resync after decode failure: {seek_err}"),
                    ));
                }
                match &last_good {
                    Some(frame) => frame,
                    None => {
                        return Err(ZoomcastError::frame_extraction(
                            i,
                            format!("first frame failed to decode: {err}"),
                        ))
                    }
                }
            }
        };

        let tick = camera.tick(&job.settings.zoom_regions, time_ms);
        let composed = compositor.compose(src, time_ms, tick)?;

        let timestamp_us = i * 1_000_000 / fps as u64;
        encoder.submit(composed.into_bytes(), timestamp_us, cancel)?;

        reporter.rendering(i + 1, total_frames, started.elapsed().as_secs_f64());
    }

    Ok(())
}

fn remove_partial_output(job: &ExportJob) {
    if job.output_path.exists() {
        if let Err(err) = std::fs::remove_file(&job.output_path) {
            tracing::warn!(
                path = %job.output_path.display(),
                error = %err,
                "Failed to remove partial output"
            );
        } else {
            tracing::info!(path = %job.output_path.display(), "Removed partial output");
        }
    }
}

/// Wraps the progress callback and keeps the percentage monotone.
struct Reporter {
    callback: Option<ProgressCallback>,
    last_percentage: std::cell::Cell<f64>,
}

impl Reporter {
    fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last_percentage: std::cell::Cell::new(0.0),
        }
    }

    fn rendering(&self, current: u64, total: u64, elapsed_secs: f64) {
        let raw = current as f64 / total.max(1) as f64 * 100.0;
        let percentage = raw.max(self.last_percentage.get()).min(100.0);
        self.last_percentage.set(percentage);

        let eta_secs = if current > 0 {
            elapsed_secs / current as f64 * (total.saturating_sub(current)) as f64
        } else {
            0.0
        };

        if let Some(cb) = &self.callback {
            cb(ExportProgress {
                current_frame: current,
                total_frames: total,
                percentage,
                eta_secs,
                stage: ExportStage::Rendering,
            });
        }
    }

    fn stage(&self, stage: ExportStage, current: u64, total: u64) {
        let percentage = match stage {
            ExportStage::Completed => 100.0,
            _ => self.last_percentage.get(),
        };
        if let Some(cb) = &self.callback {
            cb(ExportProgress {
                current_frame: current,
                total_frames: total,
                percentage,
                eta_secs: 0.0,
                stage,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_with(settings: ExportSettings) -> ExportJob {
        ExportJob {
            input_path: PathBuf::from("/nonexistent/capture.mp4"),
            output_path: PathBuf::from("/tmp/zoomcast-test-out.mp4"),
            settings,
        }
    }

    #[test]
    fn test_invalid_settings_rejected_before_any_io() {
        let job = job_with(ExportSettings {
            width: 1921,
            ..Default::default()
        });
        let err = export(&job, None, &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, ZoomcastError::InvalidSettings { .. }));
    }

    #[test]
    fn test_pre_cancelled_job_is_cancelled_not_failed() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = export(&job_with(ExportSettings::default()), None, &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_cancel_flag_clones_share_state() {
        let a = CancelFlag::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }
}
