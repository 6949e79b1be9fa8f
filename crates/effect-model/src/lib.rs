//! Zoomcast Effect Model
//!
//! Defines the data contracts shared by the export pipeline and the live
//! preview:
//! - **Regions:** timeline-anchored zoom effects with depth and focus
//! - **Geometry:** crop rectangles and corner styling
//! - **Cursor:** recorded pointer samples and display settings
//! - **Background:** parsed background specifications
//! - **Settings:** the full export invocation parameter set
//! - **Sidecar:** recording metadata and cursor data files
//!
//! All coordinates are normalized to `[0.0, 1.0]` relative to the visible
//! (cropped) video area unless a type documents otherwise. This crate is
//! pure data; the only I/O lives in the explicit sidecar loaders.

pub mod background;
pub mod cursor;
pub mod geometry;
pub mod region;
pub mod settings;
pub mod sidecar;

pub use background::*;
pub use cursor::*;
pub use geometry::*;
pub use region::*;
pub use settings::*;
pub use sidecar::*;
