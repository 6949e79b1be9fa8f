//! Zoom regions: timeline-anchored camera effects.
//!
//! A region specifies a time window, a zoom depth (fixed scale factor),
//! and a focus point in normalized cropped-video coordinates. Regions may
//! overlap in storage; the dominant-region selection below picks at most
//! one per instant.

use serde::{Deserialize, Serialize};

/// Ramp-in/ramp-out easing margin around a region's window, in ms.
///
/// A region is a selection candidate within `[start - EASE, end + EASE]`
/// so it keeps ownership of the camera while its strength ramps, but its
/// strength is strictly zero outside `[start, end]`.
pub const REGION_EASE_MS: f64 = 500.0;

/// Named zoom-intensity tiers and their fixed scale factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZoomDepth {
    /// Gentle emphasis (1.5x).
    Subtle,
    /// Standard zoom (2.0x).
    #[default]
    Medium,
    /// Tight close-up (3.0x).
    Deep,
}

impl ZoomDepth {
    /// The scale factor this depth maps to.
    pub fn scale(self) -> f64 {
        match self {
            ZoomDepth::Subtle => 1.5,
            ZoomDepth::Medium => 2.0,
            ZoomDepth::Deep => 3.0,
        }
    }
}

/// A focus point in normalized `[0,1]x[0,1]` cropped-video coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub cx: f64,
    pub cy: f64,
}

impl FocusPoint {
    pub const CENTER: FocusPoint = FocusPoint { cx: 0.5, cy: 0.5 };

    pub fn new(cx: f64, cy: f64) -> Self {
        Self { cx, cy }
    }
}

/// A timeline-anchored zoom effect window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomRegion {
    /// Unique identifier assigned by the editing session.
    pub id: String,

    /// Window start in ms from recording start.
    pub start_ms: f64,

    /// Window end in ms from recording start. Invariant: `start_ms < end_ms`.
    pub end_ms: f64,

    /// Zoom intensity tier.
    pub depth: ZoomDepth,

    /// Focus point within the visible (cropped) video area.
    pub focus: FocusPoint,
}

impl ZoomRegion {
    pub fn new(
        id: impl Into<String>,
        start_ms: f64,
        end_ms: f64,
        depth: ZoomDepth,
        focus: FocusPoint,
    ) -> Self {
        Self {
            id: id.into(),
            start_ms,
            end_ms,
            depth,
            focus,
        }
    }

    /// Window duration in ms.
    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }

    /// Whether this region is a selection candidate at `time_ms`,
    /// including the easing margin.
    pub fn is_active(&self, time_ms: f64) -> bool {
        time_ms >= self.start_ms - REGION_EASE_MS && time_ms <= self.end_ms + REGION_EASE_MS
    }

    /// Effect strength in `[0,1]` at `time_ms`.
    ///
    /// Zero outside `[start_ms, end_ms]`, smoothstep ramp over the ease
    /// window after `start_ms` and before `end_ms`. Short regions clamp
    /// the ramp to half the window so in/out ramps never cross.
    pub fn strength_at(&self, time_ms: f64) -> f64 {
        if time_ms <= self.start_ms || time_ms >= self.end_ms {
            return 0.0;
        }

        let ramp = REGION_EASE_MS.min(self.duration_ms() / 2.0);
        if ramp <= 0.0 {
            return 1.0;
        }

        let rise = ((time_ms - self.start_ms) / ramp).clamp(0.0, 1.0);
        let fall = ((self.end_ms - time_ms) / ramp).clamp(0.0, 1.0);
        smoothstep(rise.min(fall))
    }

    /// Validate the region's invariants, returning messages for violations.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];
        if self.start_ms >= self.end_ms {
            errors.push(format!(
                "region {}: start_ms ({}) must be < end_ms ({})",
                self.id, self.start_ms, self.end_ms
            ));
        }
        if !(0.0..=1.0).contains(&self.focus.cx) || !(0.0..=1.0).contains(&self.focus.cy) {
            errors.push(format!(
                "region {}: focus ({}, {}) outside [0,1]",
                self.id, self.focus.cx, self.focus.cy
            ));
        }
        errors
    }
}

/// The single region chosen to drive the camera at an instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominantRegion<'a> {
    pub region: Option<&'a ZoomRegion>,
    pub strength: f64,
}

impl<'a> DominantRegion<'a> {
    pub const NONE: DominantRegion<'static> = DominantRegion {
        region: None,
        strength: 0.0,
    };
}

/// Select the dominant region at `time_ms`.
///
/// Among all active regions the one with the smallest window duration
/// wins; ties break on the lexicographically smallest `id` so the result
/// never depends on array order.
pub fn find_dominant_region(regions: &[ZoomRegion], time_ms: f64) -> DominantRegion<'_> {
    let mut best: Option<&ZoomRegion> = None;

    for region in regions.iter().filter(|r| r.is_active(time_ms)) {
        best = match best {
            None => Some(region),
            Some(current) => {
                let shorter = region.duration_ms() < current.duration_ms();
                let tie = region.duration_ms() == current.duration_ms() && region.id < current.id;
                if shorter || tie {
                    Some(region)
                } else {
                    Some(current)
                }
            }
        };
    }

    match best {
        Some(region) => DominantRegion {
            region: Some(region),
            strength: region.strength_at(time_ms),
        },
        None => DominantRegion::NONE,
    }
}

/// Clamp a focus point so the zoomed viewport never reveals area outside
/// the base video bounds.
///
/// The visible window at scale `s` has normalized extent `w = 1/s`, so
/// each axis is clamped to `[w/2, 1 - w/2]`. At `scale <= 1` the whole
/// video is visible and the focus degenerates to the center.
pub fn clamp_focus(focus: FocusPoint, scale: f64) -> FocusPoint {
    if scale <= 1.0 {
        return FocusPoint::CENTER;
    }

    let half = 1.0 / scale / 2.0;
    FocusPoint {
        cx: focus.cx.clamp(half, 1.0 - half),
        cy: focus.cy.clamp(half, 1.0 - half),
    }
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn region(id: &str, start: f64, end: f64) -> ZoomRegion {
        ZoomRegion::new(id, start, end, ZoomDepth::Medium, FocusPoint::new(0.3, 0.3))
    }

    #[test]
    fn test_strength_zero_outside_window() {
        let r = region("a", 1000.0, 3000.0);
        assert_eq!(r.strength_at(999.9), 0.0);
        assert_eq!(r.strength_at(1000.0), 0.0);
        assert_eq!(r.strength_at(3000.0), 0.0);
        assert_eq!(r.strength_at(3500.0), 0.0);
    }

    #[test]
    fn test_strength_full_at_plateau() {
        let r = region("a", 1000.0, 3000.0);
        assert!((r.strength_at(2000.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_strength_ramps_monotonically() {
        let r = region("a", 1000.0, 3000.0);
        let samples: Vec<f64> = (0..=10)
            .map(|i| r.strength_at(1000.0 + i as f64 * 50.0))
            .collect();
        for pair in samples.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_active_includes_ease_margin() {
        let r = region("a", 1000.0, 3000.0);
        assert!(r.is_active(600.0));
        assert!(r.is_active(3400.0));
        assert!(!r.is_active(400.0));
        assert!(!r.is_active(3600.0));
    }

    #[test]
    fn test_shorter_region_dominates_regardless_of_order() {
        let long = region("long", 0.0, 10_000.0);
        let short = region("short", 1000.0, 3000.0);

        let forward = vec![long.clone(), short.clone()];
        let backward = vec![short.clone(), long.clone()];

        let a = find_dominant_region(&forward, 2000.0);
        let b = find_dominant_region(&backward, 2000.0);

        assert_eq!(a.region.unwrap().id, "short");
        assert_eq!(b.region.unwrap().id, "short");
    }

    #[test]
    fn test_equal_duration_ties_break_on_lowest_id() {
        let a = region("beta", 1000.0, 3000.0);
        let b = region("alpha", 1500.0, 3500.0);

        let regions = [a, b];
        let picked = find_dominant_region(&regions, 2000.0);
        assert_eq!(picked.region.unwrap().id, "alpha");
    }

    #[test]
    fn test_no_region_active_returns_none() {
        let r = region("a", 1000.0, 3000.0);
        let regions = [r];
        let picked = find_dominant_region(&regions, 5000.0);
        assert!(picked.region.is_none());
        assert_eq!(picked.strength, 0.0);
    }

    #[test]
    fn test_clamp_focus_identity_scale_centers() {
        let clamped = clamp_focus(FocusPoint::new(0.1, 0.9), 1.0);
        assert_eq!(clamped, FocusPoint::CENTER);

        let clamped = clamp_focus(FocusPoint::new(0.0, 0.0), 0.5);
        assert_eq!(clamped, FocusPoint::CENTER);
    }

    #[test]
    fn test_depth_scales_are_ordered() {
        assert!(ZoomDepth::Subtle.scale() < ZoomDepth::Medium.scale());
        assert!(ZoomDepth::Medium.scale() < ZoomDepth::Deep.scale());
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let r = region("bad", 3000.0, 1000.0);
        assert!(!r.validate().is_empty());
    }

    proptest! {
        #[test]
        fn prop_clamped_focus_stays_inside_safe_band(
            cx in 0.0f64..=1.0,
            cy in 0.0f64..=1.0,
            scale in 1.01f64..=8.0,
        ) {
            let clamped = clamp_focus(FocusPoint::new(cx, cy), scale);
            let half = 1.0 / scale / 2.0;
            prop_assert!(clamped.cx >= half - 1e-12);
            prop_assert!(clamped.cx <= 1.0 - half + 1e-12);
            prop_assert!(clamped.cy >= half - 1e-12);
            prop_assert!(clamped.cy <= 1.0 - half + 1e-12);
        }

        #[test]
        fn prop_strength_always_in_unit_interval(
            t in -1000.0f64..=12_000.0,
        ) {
            let r = ZoomRegion::new(
                "r", 1000.0, 3000.0, ZoomDepth::Deep, FocusPoint::CENTER,
            );
            let s = r.strength_at(t);
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }
}
