//! Zoomcast Motion
//!
//! Deterministic, timestamp-driven animation for the export pipeline and
//! preview:
//! - **Camera:** exponential smoothing toward the dominant zoom region
//! - **Spring:** critically damped 2D spring for cursor follow
//! - **Cursor path:** Catmull-Rom sampling, click ripples, auto-hide
//!
//! Every driver here is advanced exclusively by explicit step functions
//! fed media timestamps. Nothing reads the wall clock, so the same input
//! sequence always produces bit-identical output.

pub mod camera;
pub mod cursor_path;
pub mod spring;

pub use camera::*;
pub use cursor_path::*;
pub use spring::*;
