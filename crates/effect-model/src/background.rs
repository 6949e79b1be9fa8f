//! Background specifications.
//!
//! The editing layer hands the export a single string that may be a hex
//! color, a CSS-style gradient, or an image location. It is parsed ONCE
//! into the tagged variant below at compositor setup and never re-parsed
//! per frame.

use serde::{Deserialize, Serialize};

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rgb`, `#rrggbb`, or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                Some(Self::opaque(r * 17, g * 17, b * 17))
            }
            6 | 8 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                let a = if hex.len() == 8 {
                    u8::from_str_radix(&hex[6..8], 16).ok()?
                } else {
                    255
                };
                Some(Self { r, g, b, a })
            }
            _ => None,
        }
    }
}

/// A gradient color stop at a normalized offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Offset along the gradient axis in `[0, 1]`.
    pub offset: f64,
    pub color: Rgba,
}

/// A background, resolved from the string union once at setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackgroundSpec {
    Solid {
        color: Rgba,
    },
    LinearGradient {
        /// Direction angle in degrees, CSS convention (0 = up, 90 = right).
        angle_deg: f64,
        stops: Vec<GradientStop>,
    },
    RadialGradient {
        stops: Vec<GradientStop>,
    },
    Image {
        uri: String,
    },
}

impl BackgroundSpec {
    /// Parse the string union: hex color, `linear-gradient(...)`,
    /// `radial-gradient(...)`, or anything else as an image location.
    pub fn parse(spec: &str) -> Result<Self, BackgroundParseError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(BackgroundParseError::Empty);
        }

        if spec.starts_with('#') {
            return Rgba::from_hex(spec)
                .map(|color| Self::Solid { color })
                .ok_or_else(|| BackgroundParseError::BadColor(spec.to_string()));
        }

        if let Some(body) = gradient_body(spec, "linear-gradient") {
            let (angle_deg, rest) = split_angle(body);
            let stops = parse_stops(rest)?;
            return Ok(Self::LinearGradient { angle_deg, stops });
        }

        if let Some(body) = gradient_body(spec, "radial-gradient") {
            // Shape/position prelude (e.g. "circle at center") is dropped;
            // the renderer always centers on the stage.
            let rest = body
                .split_once(',')
                .filter(|(head, _)| !head.trim_start().starts_with('#'))
                .map(|(_, tail)| tail)
                .unwrap_or(body);
            let stops = parse_stops(rest)?;
            return Ok(Self::RadialGradient { stops });
        }

        Ok(Self::Image {
            uri: spec.to_string(),
        })
    }
}

/// Errors from background string parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BackgroundParseError {
    #[error("background spec is empty")]
    Empty,

    #[error("invalid color: {0}")]
    BadColor(String),

    #[error("gradient needs at least two color stops: {0}")]
    TooFewStops(String),
}

fn gradient_body<'a>(spec: &'a str, name: &str) -> Option<&'a str> {
    let rest = spec.strip_prefix(name)?.trim_start();
    let rest = rest.strip_prefix('(')?;
    rest.strip_suffix(')')
}

/// Split a leading `NNdeg,` prefix off a linear-gradient body.
/// Defaults to 180deg (top to bottom), the CSS default.
fn split_angle(body: &str) -> (f64, &str) {
    if let Some((head, tail)) = body.split_once(',') {
        let head = head.trim();
        if let Some(deg) = head.strip_suffix("deg") {
            if let Ok(angle) = deg.trim().parse::<f64>() {
                return (angle, tail);
            }
        }
    }
    (180.0, body)
}

fn parse_stops(body: &str) -> Result<Vec<GradientStop>, BackgroundParseError> {
    let mut colors = vec![];
    for part in body.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let mut tokens = part.split_whitespace();
        let color_token = tokens.next().unwrap_or_default();
        let color = Rgba::from_hex(color_token)
            .ok_or_else(|| BackgroundParseError::BadColor(color_token.to_string()))?;

        let offset = tokens
            .next()
            .and_then(|t| t.strip_suffix('%'))
            .and_then(|t| t.parse::<f64>().ok())
            .map(|pct| (pct / 100.0).clamp(0.0, 1.0));

        colors.push((color, offset));
    }

    if colors.len() < 2 {
        return Err(BackgroundParseError::TooFewStops(body.to_string()));
    }

    // Unspecified offsets spread evenly between their neighbors.
    let last = colors.len() - 1;
    let stops = colors
        .iter()
        .enumerate()
        .map(|(i, (color, offset))| GradientStop {
            offset: offset.unwrap_or(i as f64 / last as f64),
            color: *color,
        })
        .collect();

    Ok(stops)
}
