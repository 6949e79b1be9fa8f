//! Cursor path sampling and click/idle effects.
//!
//! The recorded cursor stream is sparse relative to the output frame
//! rate, so per-frame positions are interpolated with a Catmull-Rom
//! spline through the four nearest samples. Click ripples and the idle
//! auto-hide fade are tracked here as explicit per-export state.

use zoomcast_effect_model::CursorPosition;

/// Total ripple lifetime from the press edge, in ms.
pub const RIPPLE_LIFETIME_MS: f64 = 400.0;

/// Delay between the two rings of one ripple, in ms.
pub const RIPPLE_RING_STAGGER_MS: f64 = 120.0;

/// Rings spawned per press.
pub const RIPPLE_RING_COUNT: usize = 2;

/// Duration of the auto-hide fade once the idle delay has elapsed, in ms.
pub const AUTO_HIDE_FADE_MS: f64 = 300.0;

/// Movement below this many screen pixels between frames counts as idle.
pub const MOVE_EPSILON_PX: f64 = 1.5;

/// Interpolate the cursor position at `t_ms`.
///
/// Catmull-Rom through the two samples on either side of `t_ms`, clamped
/// to the first/last sample outside the recorded range. A single sample
/// yields a static cursor. Returns `None` only for an empty stream.
pub fn sample_cursor(positions: &[CursorPosition], t_ms: f64) -> Option<(f64, f64)> {
    let first = positions.first()?;
    if positions.len() == 1 || t_ms <= first.timestamp {
        return Some((first.x, first.y));
    }

    let last = positions.last()?;
    if t_ms >= last.timestamp {
        return Some((last.x, last.y));
    }

    // Index of the segment [i, i+1] containing t_ms.
    let i = match positions.binary_search_by(|p| p.timestamp.total_cmp(&t_ms)) {
        Ok(exact) => return Some((positions[exact].x, positions[exact].y)),
        Err(insert) => insert - 1,
    };

    let p1 = &positions[i];
    let p2 = &positions[i + 1];
    let span = p2.timestamp - p1.timestamp;
    if span <= 0.0 {
        return Some((p1.x, p1.y));
    }

    // Boundary segments reuse the edge sample as the outer control point.
    let p0 = if i > 0 { &positions[i - 1] } else { p1 };
    let p3 = if i + 2 < positions.len() {
        &positions[i + 2]
    } else {
        p2
    };

    let u = (t_ms - p1.timestamp) / span;
    Some((
        catmull_rom(p0.x, p1.x, p2.x, p3.x, u),
        catmull_rom(p0.y, p1.y, p2.y, p3.y, u),
    ))
}

/// Uniform Catmull-Rom interpolation between `p1` and `p2` at `u ∈ [0,1]`.
fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, u: f64) -> f64 {
    let u2 = u * u;
    let u3 = u2 * u;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * u
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u2
        + (3.0 * p1 - p2 + p3 - 2.0 * p0) * u3)
}

/// One click ripple anchored at its press position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ripple {
    pub start_ms: f64,
    pub x: f64,
    pub y: f64,
}

/// A ring of a ripple at a specific frame, ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleRing {
    pub x: f64,
    pub y: f64,
    /// Expansion progress in `[0, 1]`.
    pub progress: f64,
}

/// Tracks press edges and the ripples they spawn.
#[derive(Debug, Clone, Default)]
pub struct RippleTracker {
    ripples: Vec<Ripple>,
    was_pressed: bool,
}

impl RippleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current frame's press state; a false→true edge spawns a
    /// ripple at `(x, y)`. Expired ripples are pruned here.
    pub fn update(&mut self, pressed: bool, x: f64, y: f64, t_ms: f64) {
        if pressed && !self.was_pressed {
            self.ripples.push(Ripple { start_ms: t_ms, x, y });
        }
        self.was_pressed = pressed;

        self.ripples
            .retain(|r| t_ms - r.start_ms < RIPPLE_LIFETIME_MS + RIPPLE_RING_STAGGER_MS);
    }

    /// All rings to draw at `t_ms`. Each live ripple contributes up to
    /// two rings, the second starting `RIPPLE_RING_STAGGER_MS` later.
    pub fn rings(&self, t_ms: f64) -> Vec<RippleRing> {
        let mut rings = Vec::new();
        for ripple in &self.ripples {
            for ring in 0..RIPPLE_RING_COUNT {
                let age = t_ms - ripple.start_ms - ring as f64 * RIPPLE_RING_STAGGER_MS;
                if age >= 0.0 && age < RIPPLE_LIFETIME_MS {
                    rings.push(RippleRing {
                        x: ripple.x,
                        y: ripple.y,
                        progress: age / RIPPLE_LIFETIME_MS,
                    });
                }
            }
        }
        rings
    }

    pub fn is_empty(&self) -> bool {
        self.ripples.is_empty()
    }
}

/// Fades the cursor out after a configurable idle delay.
#[derive(Debug, Clone)]
pub struct AutoHide {
    delay_ms: Option<f64>,
    last_move_ms: f64,
    last_x: f64,
    last_y: f64,
}

impl AutoHide {
    /// `delay_ms = None` disables auto-hide (opacity is always 1).
    pub fn new(delay_ms: Option<f64>) -> Self {
        Self {
            delay_ms,
            last_move_ms: 0.0,
            last_x: f64::NAN,
            last_y: f64::NAN,
        }
    }

    /// Feed the current frame's cursor position and get the opacity.
    ///
    /// Any movement beyond `MOVE_EPSILON_PX` restores full opacity
    /// instantly; after `delay_ms` without movement the opacity fades to
    /// zero over `AUTO_HIDE_FADE_MS`.
    pub fn step(&mut self, x: f64, y: f64, t_ms: f64) -> f64 {
        let moved = !self.last_x.is_finite()
            || (x - self.last_x).hypot(y - self.last_y) > MOVE_EPSILON_PX;
        if moved {
            self.last_move_ms = t_ms;
            self.last_x = x;
            self.last_y = y;
        }

        let delay = match self.delay_ms {
            Some(delay) => delay,
            None => return 1.0,
        };

        let idle = t_ms - self.last_move_ms;
        if idle <= delay {
            1.0
        } else {
            (1.0 - (idle - delay) / AUTO_HIDE_FADE_MS).clamp(0.0, 1.0)
        }
    }
}
