//! Error types shared across Zoomcast crates.
//!
//! The export pipeline distinguishes fatal failures (decode, compositor,
//! encoder, mux) from the single recoverable kind (frame extraction) and
//! from user cancellation, which is a terminal state but not an error.

use std::path::PathBuf;

/// Top-level error type for Zoomcast operations.
#[derive(Debug, thiserror::Error)]
pub enum ZoomcastError {
    /// Source video unreadable or corrupt. Fatal before any frame renders.
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Neither a hardware nor a software encoder accepts the requested
    /// codec/resolution/bitrate. Fatal before the frame loop starts.
    #[error("Unsupported encoder configuration: {message}")]
    UnsupportedEncoder { message: String },

    /// A single frame failed to materialize from the decoder. Recoverable
    /// by skipping that frame once; repeated failures become fatal.
    #[error("Frame extraction failed at frame {frame}: {message}")]
    FrameExtraction { frame: u64, message: String },

    /// A compositing sub-layer failed. Fatal — a partially broken visual
    /// pipeline must not silently continue.
    #[error("Compositor render error: {message}")]
    CompositorRender { message: String },

    /// The encoder reported a failure. Fatal — a broken encoder stream
    /// cannot be trusted for subsequent frames.
    #[error("Encode error: {message}")]
    Encode { message: String },

    /// The container muxer rejected a chunk or failed to finalize. Fatal.
    #[error("Mux error: {message}")]
    Mux { message: String },

    /// User-initiated cancellation. Terminal, but not a failure.
    #[error("Export cancelled")]
    Cancelled,

    #[error("Invalid settings: {message}")]
    InvalidSettings { message: String },

    #[error("Sidecar error: {message}")]
    Sidecar { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ZoomcastError.
pub type ZoomcastResult<T> = Result<T, ZoomcastError>;

impl ZoomcastError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn unsupported_encoder(msg: impl Into<String>) -> Self {
        Self::UnsupportedEncoder {
            message: msg.into(),
        }
    }

    pub fn frame_extraction(frame: u64, msg: impl Into<String>) -> Self {
        Self::FrameExtraction {
            frame,
            message: msg.into(),
        }
    }

    pub fn compositor(msg: impl Into<String>) -> Self {
        Self::CompositorRender {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn mux(msg: impl Into<String>) -> Self {
        Self::Mux {
            message: msg.into(),
        }
    }

    pub fn invalid_settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings {
            message: msg.into(),
        }
    }

    pub fn sidecar(msg: impl Into<String>) -> Self {
        Self::Sidecar {
            message: msg.into(),
        }
    }

    /// Whether this error is the distinct cancellation terminal state.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
