//! Fixed-duration frame advance
//!
//! [`TimedEffectDriver`] turns a total duration plus per-frame deltas into
//! calls on three override points ([`TimedHooks`]), handling durations
//! shorter than one frame and carry-over across loop boundaries. Progress
//! can be remapped through a [`TimeCurve`] for easing.

use super::{Effect, EffectContext};

/// Errors from curve construction
#[derive(Debug, thiserror::Error)]
pub enum CurveError {
    /// Control points must satisfy 0 < first < second < 1
    #[error("polynomial control points ({0}, {1}) are not strictly increasing in (0,1)")]
    NotMonotonic(f64, f64),
}

/// A monotonic, invertible remapping of linear progress in [0,1]
pub trait TimeCurve {
    fn transform(&self, progress: f64) -> f64;

    /// Inverse of [`transform`](TimeCurve::transform);
    /// `transform(untransform(p))` stays close to `p` on [0,1].
    fn untransform(&self, progress: f64) -> f64;
}

/// Identity curve
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl TimeCurve for Linear {
    fn transform(&self, progress: f64) -> f64 {
        progress
    }

    fn untransform(&self, progress: f64) -> f64 {
        progress
    }
}

/// Piecewise-quadratic ease-in-out
#[derive(Debug, Clone, Copy, Default)]
pub struct Acceleration;

impl TimeCurve for Acceleration {
    fn transform(&self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);
        if t < 0.5 {
            2.0 * t * t
        } else {
            1.0 - 2.0 * (1.0 - t) * (1.0 - t)
        }
    }

    fn untransform(&self, progress: f64) -> f64 {
        let p = progress.clamp(0.0, 1.0);
        if p < 0.5 {
            (p / 2.0).sqrt()
        } else {
            1.0 - ((1.0 - p) / 2.0).sqrt()
        }
    }
}

const POLY_XS: [f64; 4] = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];

/// Cubic interpolation through two interior control points.
///
/// The forward map is the Newton-form cubic through (0,0), (1/3, c0),
/// (2/3, c1) and (1,1); the inverse is derived analytically by building
/// the divided-difference cubic through the swapped node set, so the
/// round trip is exact at the nodes and approximate between them.
#[derive(Debug, Clone, Copy)]
pub struct Polynomial {
    forward: NewtonPoly,
    inverse: NewtonPoly,
}

#[derive(Debug, Clone, Copy)]
struct NewtonPoly {
    xs: [f64; 4],
    coeffs: [f64; 4],
}

impl NewtonPoly {
    fn fit(xs: [f64; 4], ys: [f64; 4]) -> Self {
        // divided-difference table, collapsed in place
        let mut coeffs = ys;
        for level in 1..4 {
            for i in (level..4).rev() {
                coeffs[i] = (coeffs[i] - coeffs[i - 1]) / (xs[i] - xs[i - level]);
            }
        }
        Self { xs, coeffs }
    }

    fn eval(&self, x: f64) -> f64 {
        // Horner form over the Newton basis
        let mut acc = self.coeffs[3];
        for i in (0..3).rev() {
            acc = acc * (x - self.xs[i]) + self.coeffs[i];
        }
        acc
    }
}

impl Polynomial {
    /// `c0` and `c1` are the eased progress values at one third and two
    /// thirds of linear time; they must be strictly increasing within
    /// (0,1) so both directions stay monotonic.
    pub fn new(c0: f64, c1: f64) -> Result<Self, CurveError> {
        if !(0.0 < c0 && c0 < c1 && c1 < 1.0) {
            return Err(CurveError::NotMonotonic(c0, c1));
        }
        let ys = [0.0, c0, c1, 1.0];
        Ok(Self {
            forward: NewtonPoly::fit(POLY_XS, ys),
            inverse: NewtonPoly::fit(ys, POLY_XS),
        })
    }
}

impl TimeCurve for Polynomial {
    fn transform(&self, progress: f64) -> f64 {
        self.forward.eval(progress.clamp(0.0, 1.0)).clamp(0.0, 1.0)
    }

    fn untransform(&self, progress: f64) -> f64 {
        self.inverse.eval(progress.clamp(0.0, 1.0)).clamp(0.0, 1.0)
    }
}

/// Override points driven by [`TimedEffectDriver`].
///
/// `on_start` and `execute_timed` return "continue running"; `on_end`
/// returns "restart for another loop".
#[allow(unused_variables)]
pub trait TimedHooks {
    fn on_start(&mut self, ctx: &mut EffectContext<'_>) -> bool {
        true
    }

    /// Advance by `step` milliseconds of this loop. `progress` is the
    /// curve-transformed position in [0,1] after the step.
    fn execute_timed(&mut self, ctx: &mut EffectContext<'_>, step: u32, progress: f64) -> bool;

    fn on_end(&mut self, ctx: &mut EffectContext<'_>) -> bool {
        false
    }
}

/// The fixed-duration, loopable, curve-transformed timer at the heart of
/// every concrete timed effect.
pub struct TimedEffectDriver {
    total_time: u32,
    /// `None` until the first execute starts the clock
    remaining: Option<u32>,
    curve: Box<dyn TimeCurve>,
    /// Driver-granted restarts beyond what the hooks ask for
    extra_loops: u32,
    hooks: Box<dyn TimedHooks>,
}

impl TimedEffectDriver {
    /// A single-shot timer of `total_time` milliseconds
    pub fn once(total_time: u32, hooks: impl TimedHooks + 'static) -> Self {
        Self {
            total_time,
            remaining: None,
            curve: Box::new(Linear),
            extra_loops: 0,
            hooks: Box::new(hooks),
        }
    }

    /// A timer that restarts until `loops` full loops have run
    /// (in addition to any restart the hooks grant from `on_end`)
    pub fn looping(total_time: u32, loops: u32, hooks: impl TimedHooks + 'static) -> Self {
        Self {
            extra_loops: loops.saturating_sub(1),
            ..Self::once(total_time, hooks)
        }
    }

    pub fn with_curve(mut self, curve: impl TimeCurve + 'static) -> Self {
        self.curve = Box::new(curve);
        self
    }

    pub fn total_time(&self) -> u32 {
        self.total_time
    }

    pub fn has_started(&self) -> bool {
        self.remaining.is_some()
    }

    fn raw_progress(&self) -> f64 {
        match self.remaining {
            None => 0.0,
            Some(_) if self.total_time == 0 => 1.0,
            Some(rem) => {
                ((self.total_time - rem) as f64 / self.total_time as f64).clamp(0.0, 1.0)
            }
        }
    }

    /// Curve-transformed progress in [0,1]
    pub fn progress(&self) -> f64 {
        self.curve.transform(self.raw_progress()).clamp(0.0, 1.0)
    }

    /// Jump the clock so that [`progress`](Self::progress) reads `p`
    pub fn set_progress(&mut self, p: f64) {
        let raw = self.curve.untransform(p.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        let consumed = (raw * self.total_time as f64).round() as u32;
        self.remaining = Some(self.total_time.saturating_sub(consumed));
    }

    fn restart_granted(&mut self, ctx: &mut EffectContext<'_>) -> bool {
        if self.hooks.on_end(ctx) {
            return true;
        }
        if self.extra_loops > 0 {
            self.extra_loops -= 1;
            return true;
        }
        false
    }
}

impl Effect for TimedEffectDriver {
    /// Frame advance. The first call after (re)creation starts the clock
    /// and absorbs the frame's delta (initialization jitter must not eat
    /// into the first loop). When a loop completes mid-frame, the
    /// remainder carries into the restarted loop. When more than one full
    /// loop elapses within a single frame, exactly one extra full loop is
    /// consumed and further backlog is dropped — a deliberate clamp that
    /// bounds per-frame work, not an accounting bug.
    fn execute(&mut self, ctx: &mut EffectContext<'_>, frame_time: u32) -> bool {
        match self.remaining {
            None => {
                self.remaining = Some(self.total_time);
                self.hooks.on_start(ctx)
            }
            Some(rem) if rem <= frame_time => {
                let rest = frame_time - rem;
                self.remaining = Some(0);
                if !self.hooks.execute_timed(ctx, rem, self.progress()) {
                    return false;
                }
                if !self.restart_granted(ctx) {
                    return false;
                }
                self.remaining = Some(self.total_time);
                if !self.hooks.on_start(ctx) {
                    return false;
                }
                if rest < self.total_time {
                    self.remaining = Some(self.total_time - rest);
                    self.hooks.execute_timed(ctx, rest, self.progress())
                } else {
                    self.remaining = Some(0);
                    if !self.hooks.execute_timed(ctx, self.total_time, self.progress()) {
                        return false;
                    }
                    if !self.restart_granted(ctx) {
                        return false;
                    }
                    self.remaining = Some(self.total_time);
                    true
                }
            }
            Some(rem) => {
                self.remaining = Some(rem - frame_time);
                self.hooks.execute_timed(ctx, frame_time, self.progress())
            }
        }
    }
}
