//! Crop and corner styling types.

use serde::{Deserialize, Serialize};

/// A crop rectangle in normalized fractions of the full source frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    /// The full frame (no crop).
    pub const FULL: CropRegion = CropRegion {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether this crop leaves the frame untouched.
    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    /// Validate the crop invariants, returning messages for violations.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];
        if self.x < 0.0 || self.y < 0.0 || self.width <= 0.0 || self.height <= 0.0 {
            errors.push(format!(
                "crop ({}, {}, {}, {}) has negative origin or non-positive size",
                self.x, self.y, self.width, self.height
            ));
        }
        if self.x + self.width > 1.0 + 1e-9 {
            errors.push(format!(
                "crop x+width ({}) exceeds 1.0",
                self.x + self.width
            ));
        }
        if self.y + self.height > 1.0 + 1e-9 {
            errors.push(format!(
                "crop y+height ({}) exceeds 1.0",
                self.y + self.height
            ));
        }
        errors
    }
}

impl Default for CropRegion {
    fn default() -> Self {
        Self::FULL
    }
}

/// Corner rounding style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CornerStyle {
    /// Continuous-curvature superellipse approximation (iOS-style).
    #[default]
    Squircle,
    /// Plain circular-arc rounded rectangle.
    Rounded,
}

/// Corner rounding configuration for the video layer.
///
/// `radius` is in display pixels at full stage scale; the renderer scales
/// it down proportionally to the actual render scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerSettings {
    pub radius: f64,
    pub style: CornerStyle,
    pub top_left: bool,
    pub top_right: bool,
    pub bottom_left: bool,
    pub bottom_right: bool,
}

impl CornerSettings {
    /// No rounding at all.
    pub fn none() -> Self {
        Self {
            radius: 0.0,
            ..Self::default()
        }
    }

    /// Whether any corner will actually be rounded.
    pub fn any_enabled(&self) -> bool {
        self.radius > 0.0
            && (self.top_left || self.top_right || self.bottom_left || self.bottom_right)
    }
}

impl Default for CornerSettings {
    fn default() -> Self {
        Self {
            radius: 16.0,
            style: CornerStyle::Squircle,
            top_left: true,
            top_right: true,
            bottom_left: true,
            bottom_right: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_crop_is_valid() {
        assert!(CropRegion::FULL.validate().is_empty());
        assert!(CropRegion::FULL.is_full());
    }

    #[test]
    fn test_overflowing_crop_rejected() {
        let crop = CropRegion::new(0.5, 0.5, 0.6, 0.6);
        let errors = crop.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_zero_size_crop_rejected() {
        let crop = CropRegion::new(0.0, 0.0, 0.0, 1.0);
        assert!(!crop.validate().is_empty());
    }

    #[test]
    fn test_corner_any_enabled() {
        assert!(CornerSettings::default().any_enabled());
        assert!(!CornerSettings::none().any_enabled());

        let disabled = CornerSettings {
            top_left: false,
            top_right: false,
            bottom_left: false,
            bottom_right: false,
            ..Default::default()
        };
        assert!(!disabled.any_enabled());
    }
}
