//! Camera animation toward the dominant zoom region.
//!
//! Each output frame the driver picks the dominant region, computes a
//! target `(scale, focus)` and moves the animated state a fixed fraction
//! of the way there. The tick is pure in its inputs: media timestamps in,
//! camera state out.

use serde::{Deserialize, Serialize};

use zoomcast_effect_model::{clamp_focus, find_dominant_region, FocusPoint, ZoomRegion};

/// Fraction of the remaining distance covered per tick.
pub const SMOOTHING_FACTOR: f64 = 0.15;

/// Below this per-component distance the state snaps to the target, so
/// the camera settles exactly instead of asymptotically.
pub const MIN_DELTA: f64 = 1e-3;

/// The animated camera state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationState {
    pub scale: f64,
    pub focus_x: f64,
    pub focus_y: f64,
}

impl AnimationState {
    /// Identity: no zoom, centered.
    pub const IDENTITY: AnimationState = AnimationState {
        scale: 1.0,
        focus_x: 0.5,
        focus_y: 0.5,
    };
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One tick's camera output, consumed by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraTick {
    pub scale: f64,
    pub focus_x: f64,
    pub focus_y: f64,
    /// Largest per-component movement this tick. Drives motion blur.
    pub motion_intensity: f64,
}

/// Advances the camera state one output frame at a time.
#[derive(Debug, Clone, Default)]
pub struct CameraDriver {
    state: AnimationState,
}

impl CameraDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    /// Advance the camera toward the dominant region at `time_ms`.
    pub fn tick(&mut self, regions: &[ZoomRegion], time_ms: f64) -> CameraTick {
        let target = Self::target_at(regions, time_ms);

        let dx = target.focus_x - self.state.focus_x;
        let dy = target.focus_y - self.state.focus_y;
        let ds = target.scale - self.state.scale;

        let settled = dx.abs() < MIN_DELTA && dy.abs() < MIN_DELTA && ds.abs() < MIN_DELTA;
        let (applied_x, applied_y, applied_s) = if settled {
            (dx, dy, ds)
        } else {
            (
                dx * SMOOTHING_FACTOR,
                dy * SMOOTHING_FACTOR,
                ds * SMOOTHING_FACTOR,
            )
        };

        self.state.focus_x += applied_x;
        self.state.focus_y += applied_y;
        self.state.scale += applied_s;

        CameraTick {
            scale: self.state.scale,
            focus_x: self.state.focus_x,
            focus_y: self.state.focus_y,
            motion_intensity: applied_x.abs().max(applied_y.abs()).max(applied_s.abs()),
        }
    }

    /// The instantaneous (unsmoothed) camera target at `time_ms`.
    ///
    /// With no dominant region this is the identity. With one, the region's
    /// full-strength pose (depth scale, focus clamped so the viewport stays
    /// inside the video) is blended with the identity by the region's
    /// current strength.
    fn target_at(regions: &[ZoomRegion], time_ms: f64) -> AnimationState {
        let dominant = find_dominant_region(regions, time_ms);
        let region = match dominant.region {
            Some(region) => region,
            None => return AnimationState::IDENTITY,
        };

        let full_scale = region.depth.scale();
        let focus = clamp_focus(region.focus, full_scale);
        let s = dominant.strength;

        AnimationState {
            scale: lerp(1.0, full_scale, s),
            focus_x: lerp(0.5, focus.cx, s),
            focus_y: lerp(0.5, focus.cy, s),
        }
    }

    /// The fully clamped focus a region resolves to at its own depth.
    pub fn resolved_focus(region: &ZoomRegion) -> FocusPoint {
        clamp_focus(region.focus, region.depth.scale())
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoomcast_effect_model::{ZoomDepth, ZoomRegion};

    fn medium_region(start: f64, end: f64) -> ZoomRegion {
        ZoomRegion::new(
            "r1",
            start,
            end,
            ZoomDepth::Medium,
            FocusPoint::new(0.3, 0.7),
        )
    }

    #[test]
    fn test_no_regions_stays_identity() {
        let mut driver = CameraDriver::new();
        for i in 0..60 {
            let tick = driver.tick(&[], i as f64 * 33.3);
            assert_eq!(tick.scale, 1.0);
            assert_eq!(tick.focus_x, 0.5);
            assert_eq!(tick.motion_intensity, 0.0);
        }
    }

    #[test]
    fn test_converges_and_snaps_in_bounded_ticks() {
        let region = medium_region(0.0, 60_000.0);
        let mut driver = CameraDriver::new();

        // Deep into the plateau the target is fixed, so exponential decay
        // must drop below MIN_DELTA and snap within ~60 ticks.
        let mut snapped_at = None;
        for i in 0..120 {
            let tick = driver.tick(std::slice::from_ref(&region), 30_000.0);
            if (tick.scale - 2.0).abs() < 1e-12 {
                snapped_at = Some(i);
                break;
            }
        }
        assert!(snapped_at.is_some(), "camera never snapped to target");
        assert!(snapped_at.unwrap() < 80);
    }

    #[test]
    fn test_ticks_are_deterministic() {
        let region = medium_region(1000.0, 3000.0);
        let timestamps: Vec<f64> = (0..150).map(|i| i as f64 * 1000.0 / 30.0).collect();

        let run = |ts: &[f64]| -> Vec<CameraTick> {
            let mut driver = CameraDriver::new();
            ts.iter()
                .map(|&t| driver.tick(std::slice::from_ref(&region), t))
                .collect()
        };

        let a = run(&timestamps);
        let b = run(&timestamps);
        assert_eq!(a, b);
    }

    /// The 5-second reference scenario: one medium region over [1s, 3s],
    /// 150 frames at 30 fps.
    #[test]
    fn test_reference_trace_five_seconds() {
        let region = medium_region(1000.0, 3000.0);
        let mut driver = CameraDriver::new();

        let mut ticks = Vec::with_capacity(150);
        for i in 0..150 {
            let t_ms = i as f64 * 1000.0 / 30.0;
            ticks.push(driver.tick(std::slice::from_ref(&region), t_ms));
        }

        // Identity before the region starts.
        for tick in &ticks[..30] {
            assert_eq!(tick.scale, 1.0, "zoomed before region start");
        }

        // Near the full target at the region midpoint (2 s = frame 60).
        assert!(
            (ticks[60].scale - 2.0).abs() < 0.05,
            "scale {} not near target at midpoint",
            ticks[60].scale
        );

        // Fully returned to identity by the last frame.
        let last = ticks.last().unwrap();
        assert_eq!(last.scale, 1.0);
        assert_eq!(last.focus_x, 0.5);
        assert_eq!(last.focus_y, 0.5);
    }

    #[test]
    fn test_motion_intensity_decays_on_plateau() {
        let region = medium_region(0.0, 60_000.0);
        let mut driver = CameraDriver::new();

        let first = driver.tick(std::slice::from_ref(&region), 30_000.0);
        let mut last = first;
        for _ in 0..30 {
            last = driver.tick(std::slice::from_ref(&region), 30_000.0);
        }
        assert!(last.motion_intensity < first.motion_intensity);
    }

    #[test]
    fn test_target_uses_clamped_focus() {
        // Focus at a corner must be pulled into the safe band at 2x.
        let region = ZoomRegion::new(
            "corner",
            0.0,
            60_000.0,
            ZoomDepth::Medium,
            FocusPoint::new(0.0, 1.0),
        );
        let mut driver = CameraDriver::new();

        let mut tick = driver.tick(std::slice::from_ref(&region), 30_000.0);
        for _ in 0..200 {
            tick = driver.tick(std::slice::from_ref(&region), 30_000.0);
        }
        assert!((tick.focus_x - 0.25).abs() < 1e-9);
        assert!((tick.focus_y - 0.75).abs() < 1e-9);
    }
}
