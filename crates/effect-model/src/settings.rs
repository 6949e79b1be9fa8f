//! The full parameter set for one export invocation.

use serde::{Deserialize, Serialize};

use crate::background::BackgroundSpec;
use crate::cursor::{CursorData, CursorSettings};
use crate::geometry::{CornerSettings, CropRegion};
use crate::region::ZoomRegion;

/// Drop-shadow configuration for the video layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub enabled: bool,
    /// Shadow opacity/size blend in `[0, 1]`.
    pub intensity: f64,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: 0.5,
        }
    }
}

/// Everything the export pipeline needs for one run.
///
/// `frame_rate == 0` means auto-detect from the sidecar metadata or the
/// source stream. Codec strings use the MIME codec form (`avc1.640028`,
/// `hvc1`, ...) matching what the recorder writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Output width in pixels. Must be even.
    pub width: u32,

    /// Output height in pixels. Must be even.
    pub height: u32,

    /// Output frame rate; 0 = auto-detect.
    pub frame_rate: u32,

    /// Target bitrate in bits per second.
    pub bitrate: u64,

    /// Codec string, MIME form.
    pub codec: String,

    /// Background behind the padded video layer.
    pub background: BackgroundSpec,

    /// Pre-blur radius applied to the background raster at setup, in
    /// pixels. 0 disables it.
    pub background_blur_px: u32,

    /// Source crop applied before everything else.
    pub crop: CropRegion,

    /// Corner rounding for the video layer.
    pub corners: CornerSettings,

    /// Drop shadow under the video layer.
    pub shadow: ShadowSettings,

    /// Motion blur on fast camera movement.
    pub motion_blur: bool,

    /// Padding around the video layer as a percent of the stage, 0-50.
    pub padding_percent: f64,

    /// Timeline zoom effects.
    pub zoom_regions: Vec<ZoomRegion>,

    /// Recorded cursor stream, if a sidecar was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_data: Option<CursorData>,

    /// Cursor rendering configuration.
    pub cursor: CursorSettings,
}

impl ExportSettings {
    /// Fraction of each stage axis the video layer may occupy.
    pub fn viewport_fill(&self) -> f64 {
        1.0 - self.padding_percent / 100.0
    }

    /// Validate the whole parameter set, returning messages for every
    /// violation found rather than stopping at the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];

        if self.width == 0 || self.height == 0 {
            errors.push(format!(
                "output dimensions {}x{} must be non-zero",
                self.width, self.height
            ));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            errors.push(format!(
                "output dimensions {}x{} must be even for 4:2:0 encoding",
                self.width, self.height
            ));
        }
        if self.bitrate == 0 {
            errors.push("bitrate must be non-zero".to_string());
        }
        if !(0.0..=50.0).contains(&self.padding_percent) {
            errors.push(format!(
                "padding_percent ({}) outside [0, 50]",
                self.padding_percent
            ));
        }
        if !(0.0..=1.0).contains(&self.shadow.intensity) {
            errors.push(format!(
                "shadow intensity ({}) outside [0, 1]",
                self.shadow.intensity
            ));
        }
        if !(0.0..=100.0).contains(&self.cursor.smoothness) {
            errors.push(format!(
                "cursor smoothness ({}) outside [0, 100]",
                self.cursor.smoothness
            ));
        }

        errors.extend(self.crop.validate());
        for region in &self.zoom_regions {
            errors.extend(region.validate());
        }
        if let Some(data) = &self.cursor_data {
            errors.extend(data.validate());
        }

        errors
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 0,
            bitrate: 8_000_000,
            codec: "avc1.640028".to_string(),
            background: BackgroundSpec::Solid {
                color: crate::background::Rgba::opaque(0x1a, 0x1a, 0x1a),
            },
            background_blur_px: 0,
            crop: CropRegion::FULL,
            corners: CornerSettings::default(),
            shadow: ShadowSettings::default(),
            motion_blur: false,
            padding_percent: 6.0,
            zoom_regions: vec![],
            cursor_data: None,
            cursor: CursorSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{FocusPoint, ZoomDepth};

    #[test]
    fn test_defaults_are_valid() {
        assert!(ExportSettings::default().validate().is_empty());
    }

    #[test]
    fn test_odd_dimensions_rejected() {
        let settings = ExportSettings {
            width: 1921,
            height: 1080,
            ..Default::default()
        };
        assert!(!settings.validate().is_empty());
    }

    #[test]
    fn test_viewport_fill() {
        let settings = ExportSettings {
            padding_percent: 10.0,
            ..Default::default()
        };
        assert!((settings.viewport_fill() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_padding_out_of_range_rejected() {
        let settings = ExportSettings {
            padding_percent: 75.0,
            ..Default::default()
        };
        assert!(settings
            .validate()
            .iter()
            .any(|e| e.contains("padding_percent")));
    }

    #[test]
    fn test_region_errors_surface_through_settings() {
        let settings = ExportSettings {
            zoom_regions: vec![ZoomRegion::new(
                "bad",
                3000.0,
                1000.0,
                ZoomDepth::Medium,
                FocusPoint::CENTER,
            )],
            ..Default::default()
        };
        assert!(settings.validate().iter().any(|e| e.contains("bad")));
    }

    #[test]
    fn test_settings_json_roundtrip() {
        let settings = ExportSettings {
            frame_rate: 60,
            zoom_regions: vec![ZoomRegion::new(
                "r1",
                500.0,
                2500.0,
                ZoomDepth::Deep,
                FocusPoint::new(0.25, 0.75),
            )],
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let parsed: ExportSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }
}
