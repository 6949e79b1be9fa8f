//! Critically damped 2D spring for cursor follow.
//!
//! The rendered cursor trails the raw recorded position through a spring
//! so it moves like a weighted object instead of teleporting between
//! samples. Critical damping (`friction = 2 * sqrt(tension * mass)`)
//! gives the fastest settle with no overshoot.

/// Forward timestamp jumps larger than this are treated as seeks and
/// reset the spring instead of integrating a huge dt.
pub const SPRING_RESET_GAP_SECS: f64 = 0.5;

/// Spring coefficients derived from the 0-100 smoothness dial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub tension: f64,
    pub friction: f64,
    pub mass: f64,
}

impl SpringParams {
    /// Map the smoothness dial to physical coefficients.
    ///
    /// Higher dial values mean a looser spring and a heavier bob, so the
    /// cursor lags further behind. The mapping is monotone in the dial.
    pub fn from_smoothness(dial: f64) -> Self {
        let t = (dial / 100.0).clamp(0.0, 1.0);
        let tension = 280.0 - 230.0 * t;
        let mass = 0.8 + 1.4 * t;
        Self {
            tension,
            friction: 2.0 * (tension * mass).sqrt(),
            mass,
        }
    }
}

/// A 2D spring-follower with position and velocity state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorSpring {
    params: SpringParams,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

impl CursorSpring {
    /// Create a spring at rest on `(x, y)`.
    pub fn new(params: SpringParams, x: f64, y: f64) -> Self {
        Self {
            params,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Advance the spring by `dt_secs` toward `(tx, ty)`.
    ///
    /// A non-positive or oversized dt means the media timeline jumped
    /// (seek, dropped segment); the spring snaps to the target with zero
    /// velocity rather than integrating across the gap.
    pub fn step(&mut self, tx: f64, ty: f64, dt_secs: f64) -> (f64, f64) {
        if dt_secs <= 0.0 || dt_secs > SPRING_RESET_GAP_SECS {
            self.x = tx;
            self.y = ty;
            self.vx = 0.0;
            self.vy = 0.0;
            return (self.x, self.y);
        }

        // Semi-implicit Euler, subdivided so stiff springs stay stable at
        // low output frame rates.
        let steps = (dt_secs / 0.004).ceil().max(1.0) as u32;
        let h = dt_secs / steps as f64;
        let SpringParams {
            tension,
            friction,
            mass,
        } = self.params;

        for _ in 0..steps {
            let ax = (tension * (tx - self.x) - friction * self.vx) / mass;
            let ay = (tension * (ty - self.y) - friction * self.vy) / mass;
            self.vx += ax * h;
            self.vy += ay * h;
            self.x += self.vx * h;
            self.y += self.vy * h;
        }

        (self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f64 = 1.0 / 60.0;

    fn spring(dial: f64) -> CursorSpring {
        CursorSpring::new(SpringParams::from_smoothness(dial), 0.0, 0.0)
    }

    #[test]
    fn test_settles_on_stationary_target() {
        let mut s = spring(50.0);
        for _ in 0..600 {
            s.step(100.0, 40.0, DT);
        }
        let (x, y) = s.position();
        assert!((x - 100.0).abs() < 0.5, "x={x} did not settle");
        assert!((y - 40.0).abs() < 0.5, "y={y} did not settle");
    }

    #[test]
    fn test_higher_dial_lags_more() {
        let mut responsive = spring(20.0);
        let mut cinematic = spring(80.0);

        for _ in 0..10 {
            responsive.step(100.0, 0.0, DT);
            cinematic.step(100.0, 0.0, DT);
        }

        let (rx, _) = responsive.position();
        let (cx, _) = cinematic.position();
        assert!(
            rx > cx,
            "responsive ({rx}) should lead cinematic ({cx}) early on"
        );
    }

    #[test]
    fn test_large_gap_snaps_to_target() {
        let mut s = spring(50.0);
        s.step(10.0, 10.0, DT);

        let (x, y) = s.step(500.0, 500.0, 0.75);
        assert_eq!((x, y), (500.0, 500.0));

        // Velocity was zeroed: the next small step barely moves.
        let (x2, _) = s.step(500.0, 500.0, DT);
        assert!((x2 - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_or_negative_dt_snaps() {
        let mut s = spring(50.0);
        let (x, _) = s.step(33.0, 0.0, 0.0);
        assert_eq!(x, 33.0);
        let (x, _) = s.step(44.0, 0.0, -0.1);
        assert_eq!(x, 44.0);
    }

    #[test]
    fn test_critical_damping_relation() {
        for dial in [0.0, 25.0, 50.0, 75.0, 100.0] {
            let p = SpringParams::from_smoothness(dial);
            assert!((p.friction - 2.0 * (p.tension * p.mass).sqrt()).abs() < 1e-9);
        }
    }

    proptest! {
        /// Critically damped springs never overshoot a stationary target
        /// when starting from rest.
        #[test]
        fn prop_no_overshoot_from_rest(
            dial in 0.0f64..=100.0,
            target in 1.0f64..=2000.0,
        ) {
            let mut s = spring(dial);
            for _ in 0..1200 {
                let (x, _) = s.step(target, 0.0, DT);
                prop_assert!(x <= target * (1.0 + 1e-6));
            }
        }
    }
}
