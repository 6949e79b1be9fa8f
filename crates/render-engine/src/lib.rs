//! Zoomcast Render Engine
//!
//! The offline export pipeline: decodes the recorded screen video through
//! an ffmpeg rawvideo pipe, composites each frame on the CPU (background,
//! camera transform, corner mask, shadow, cursor overlay), and feeds the
//! result to an ffmpeg encoder process that multiplexes the final mp4.
//!
//! The pipeline is frame-accurate and deterministic: every animation is
//! driven by media timestamps, never the wall clock.

pub mod background;
pub mod compositor;
pub mod cursor_layer;
pub mod decoder;
pub mod encoder;
pub mod export;
pub mod frame;
pub mod layout;
pub mod mask;

pub use compositor::FrameCompositor;
pub use decoder::{command_exists, FrameReader, VideoSource};
pub use encoder::EncoderSink;
pub use export::{
    export, CancelFlag, ExportJob, ExportOutcome, ExportProgress, ExportStage, ProgressCallback,
};
pub use frame::RgbaFrame;
pub use layout::StageLayout;
