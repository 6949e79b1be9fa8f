//! Recorded cursor data and display settings.
//!
//! Positions are polled at a fixed sampling interval during recording in
//! raw screen pixels; `screen_width`/`screen_height` anchor the mapping
//! into display space at render time. Timestamps are ms from recording
//! start and monotonically increasing.

use serde::{Deserialize, Serialize};

/// A single recorded cursor sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    /// Screen-space X in pixels.
    pub x: f64,
    /// Screen-space Y in pixels.
    pub y: f64,
    /// Milliseconds from recording start.
    pub timestamp: f64,
    /// Whether a button was held at sample time.
    pub pressed: bool,
    /// Edge marker: this sample begins a press.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_start: Option<bool>,
    /// Edge marker: this sample ends a press.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_end: Option<bool>,
}

impl CursorPosition {
    pub fn new(x: f64, y: f64, timestamp: f64, pressed: bool) -> Self {
        Self {
            x,
            y,
            timestamp,
            pressed,
            click_start: None,
            click_end: None,
        }
    }
}

/// The full recorded cursor stream for one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorData {
    pub positions: Vec<CursorPosition>,
    /// Screen dimensions the positions were recorded against, in pixels.
    pub screen_width: f64,
    pub screen_height: f64,
    /// Sampling rate at capture time, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_fps: Option<f64>,
}

impl CursorData {
    /// Whether there is enough data to render a cursor at all.
    /// A single position degenerates to a static cursor.
    pub fn is_renderable(&self) -> bool {
        !self.positions.is_empty() && self.screen_width > 0.0 && self.screen_height > 0.0
    }

    /// Validate monotonicity of timestamps.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];
        for pair in self.positions.windows(2) {
            if pair[1].timestamp < pair[0].timestamp {
                errors.push(format!(
                    "cursor timestamps not monotonic: {} after {}",
                    pair[1].timestamp, pair[0].timestamp
                ));
                break;
            }
        }
        errors
    }
}

/// Cursor size buckets, as multipliers over the base glyph size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CursorSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl CursorSize {
    pub fn scale(self) -> f64 {
        match self {
            CursorSize::Small => 0.75,
            CursorSize::Medium => 1.0,
            CursorSize::Large => 1.5,
        }
    }
}

/// Named spring-smoothness presets mapping onto the 0-100 dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothnessPreset {
    /// Follows the raw samples closely.
    Responsive,
    /// Balanced trailing weight.
    Natural,
    /// Heavy, cinematic lag.
    Cinematic,
}

impl SmoothnessPreset {
    pub fn dial(self) -> f64 {
        match self {
            SmoothnessPreset::Responsive => 20.0,
            SmoothnessPreset::Natural => 50.0,
            SmoothnessPreset::Cinematic => 80.0,
        }
    }
}

/// Cursor display configuration for preview and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorSettings {
    /// Whether the synthetic cursor is rendered at all.
    pub enabled: bool,

    /// Size bucket for the cursor glyph.
    pub size: CursorSize,

    /// Tint color for the glyph, as a hex string.
    pub color: String,

    /// Soft glow halo behind the glyph.
    pub glow: bool,

    /// Persistent highlight circle around the glyph.
    pub highlight: bool,

    /// Expanding rings on click.
    pub ripple: bool,

    /// Fading motion trail behind the glyph.
    pub motion_trail: bool,

    /// Spring smoothness dial in `[0, 100]`. Higher = heavier trailing.
    pub smoothness: f64,

    /// Hide the cursor after this many ms without movement.
    /// `None` disables auto-hide.
    pub auto_hide_delay_ms: Option<f64>,
}

impl CursorSettings {
    /// Apply a named preset to the smoothness dial.
    pub fn with_preset(mut self, preset: SmoothnessPreset) -> Self {
        self.smoothness = preset.dial();
        self
    }
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            size: CursorSize::Medium,
            color: "#ffffff".to_string(),
            glow: false,
            highlight: false,
            ripple: true,
            motion_trail: false,
            smoothness: 50.0,
            auto_hide_delay_ms: Some(2000.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_position_is_renderable() {
        let data = CursorData {
            positions: vec![CursorPosition::new(100.0, 100.0, 0.0, false)],
            screen_width: 1920.0,
            screen_height: 1080.0,
            recorded_fps: None,
        };
        assert!(data.is_renderable());
    }

    #[test]
    fn test_empty_positions_not_renderable() {
        let data = CursorData {
            positions: vec![],
            screen_width: 1920.0,
            screen_height: 1080.0,
            recorded_fps: Some(60.0),
        };
        assert!(!data.is_renderable());
    }

    #[test]
    fn test_validate_detects_backwards_timestamps() {
        let data = CursorData {
            positions: vec![
                CursorPosition::new(0.0, 0.0, 100.0, false),
                CursorPosition::new(0.0, 0.0, 50.0, false),
            ],
            screen_width: 1920.0,
            screen_height: 1080.0,
            recorded_fps: None,
        };
        assert!(!data.validate().is_empty());
    }

    #[test]
    fn test_cursor_data_json_roundtrip() {
        let data = CursorData {
            positions: vec![
                CursorPosition {
                    x: 10.0,
                    y: 20.0,
                    timestamp: 0.0,
                    pressed: false,
                    click_start: None,
                    click_end: None,
                },
                CursorPosition {
                    x: 15.0,
                    y: 25.0,
                    timestamp: 16.0,
                    pressed: true,
                    click_start: Some(true),
                    click_end: None,
                },
            ],
            screen_width: 2560.0,
            screen_height: 1440.0,
            recorded_fps: Some(60.0),
        };
        let json = serde_json::to_string(&data).unwrap();
        let parsed: CursorData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, data);
    }

    #[test]
    fn test_preset_dials_are_monotone() {
        assert!(SmoothnessPreset::Responsive.dial() < SmoothnessPreset::Natural.dial());
        assert!(SmoothnessPreset::Natural.dial() < SmoothnessPreset::Cinematic.dial());
    }
}
