//! Fade Curve Types
//!
//! Shapes for volume fades. Every curve maps progress `t ∈ [0, 1]` to a
//! blend factor in `[0, 1]`, is monotonic non-decreasing, and hits both
//! endpoints exactly, so any fade is monotonic between its start and end
//! values regardless of the shape chosen.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Fade curve type for volume transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// Constant rate
    #[default]
    Linear,
    /// Slow start, fast end (y = t²)
    EaseIn,
    /// Fast start, slow end (y = 1 - (1 - t)²)
    EaseOut,
    /// Raised cosine, slow at both ends
    SCurve,
}

impl FadeCurve {
    pub fn name(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::EaseIn => "ease_in",
            FadeCurve::EaseOut => "ease_out",
            FadeCurve::SCurve => "s_curve",
        }
    }

    /// Evaluate curve at position t (clamped to 0.0 - 1.0)
    #[inline]
    pub fn evaluate(&self, t: f32) -> f32 {
        if t <= 0.0 || t.is_nan() {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }

        match self {
            FadeCurve::Linear => t,
            FadeCurve::EaseIn => t * t,
            FadeCurve::EaseOut => {
                let inv = 1.0 - t;
                1.0 - inv * inv
            }
            FadeCurve::SCurve => (1.0 - (t * PI).cos()) * 0.5,
        }
    }

    /// Interpolate between `from` and `to` at progress `t`
    #[inline]
    pub fn interpolate(&self, from: f32, to: f32, t: f32) -> f32 {
        let k = self.evaluate(t);
        if k >= 1.0 {
            to
        } else {
            from + (to - from) * k
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [FadeCurve; 4] = [
        FadeCurve::Linear,
        FadeCurve::EaseIn,
        FadeCurve::EaseOut,
        FadeCurve::SCurve,
    ];

    #[test]
    fn test_curve_boundaries() {
        for curve in ALL {
            assert_eq!(curve.evaluate(0.0), 0.0, "{:?} at 0.0", curve);
            assert_eq!(curve.evaluate(1.0), 1.0, "{:?} at 1.0", curve);
            let mid = curve.evaluate(0.5);
            assert!(mid > 0.0 && mid < 1.0, "{:?} at 0.5 = {}", curve, mid);
        }
    }

    #[test]
    fn test_curve_monotonic() {
        for curve in ALL {
            let mut prev = 0.0;
            for i in 0..=100 {
                let t = i as f32 / 100.0;
                let val = curve.evaluate(t);
                assert!(val >= prev - 0.0001, "{:?}: {} < {} at t={}", curve, val, prev, t);
                prev = val;
            }
        }
    }

    #[test]
    fn test_interpolate_hits_target_exactly() {
        for curve in ALL {
            assert_eq!(curve.interpolate(0.3, 0.9, 1.0), 0.9);
            assert_eq!(curve.interpolate(0.3, 0.9, 0.0), 0.3);
            assert_eq!(curve.interpolate(0.8, 0.0, 2.5), 0.0);
        }
    }
}
