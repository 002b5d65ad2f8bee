//! Overflow unwrapping for recorded density altitude.
//!
//! The Kestrel's internal density altitude counter wraps at roughly 10,600 ft and resumes
//! from near zero. A wrap shows up in the recorded series as a single-sample drop of about
//! one threshold; descending back through the overflow point shows up as the mirror rise.
//! Both are folded into a running offset so the corrected series is continuous again, for
//! any number of events.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FixError, FixResult};

/// Empirically observed overflow point (ft).
pub const DEFAULT_WRAP_THRESHOLD_FT: f64 = 10_600.0;
/// Allowed distance between a sample step and the threshold (ft).
pub const DEFAULT_WRAP_TOLERANCE_FT: f64 = 1_000.0;

/// Tunable wrap detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnwrapConfig {
    pub wrap_threshold_ft: f64,
    pub wrap_tolerance_ft: f64,
}

impl Default for UnwrapConfig {
    fn default() -> Self {
        Self {
            wrap_threshold_ft: DEFAULT_WRAP_THRESHOLD_FT,
            wrap_tolerance_ft: DEFAULT_WRAP_TOLERANCE_FT,
        }
    }
}

impl UnwrapConfig {
    /// Check the bands around `-threshold`, `0` and `+threshold` cannot overlap.
    pub fn validate(&self) -> FixResult<()> {
        let UnwrapConfig {
            wrap_threshold_ft: threshold,
            wrap_tolerance_ft: tolerance,
        } = *self;

        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(FixError::InvalidConfig(format!(
                "wrap threshold must be a positive number of feet, got {threshold}"
            )));
        }
        if !tolerance.is_finite() || tolerance < 0.0 || tolerance >= threshold / 2.0 {
            return Err(FixError::InvalidConfig(format!(
                "wrap tolerance must be in [0, {}), got {tolerance}",
                threshold / 2.0
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WrapDirection {
    /// Counter overflowed on the way up.
    Overflow,
    /// Counter came back down through the overflow point.
    Underflow,
}

/// A detected discontinuity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WrapEvent {
    /// Index of the first sample after the discontinuity.
    pub index: usize,
    pub direction: WrapDirection,
    /// Raw step across the discontinuity (ft).
    pub raw_delta_ft: f64,
    /// Number of thresholds added to samples from `index` on.
    pub depth: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unwrapped {
    pub altitudes_ft: Vec<f64>,
    /// Thresholds added to each sample.
    pub depths: Vec<i32>,
    pub events: Vec<WrapEvent>,
}

impl Unwrapped {
    pub fn max_depth(&self) -> i32 {
        self.events.iter().map(|e| e.depth).max().unwrap_or(0)
    }
}

pub struct OverflowUnwrapper {
    config: UnwrapConfig,
}

impl OverflowUnwrapper {
    pub fn new(config: UnwrapConfig) -> FixResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn classify(&self, delta: f64) -> Option<WrapDirection> {
        let threshold = self.config.wrap_threshold_ft;
        let tolerance = self.config.wrap_tolerance_ft;

        if (delta + threshold).abs() <= tolerance {
            Some(WrapDirection::Overflow)
        } else if (delta - threshold).abs() <= tolerance {
            Some(WrapDirection::Underflow)
        } else {
            None
        }
    }

    /// Reconstruct a continuous altitude series from raw recorded values.
    ///
    /// The first finite sample is the baseline. Non-finite samples are passed through with
    /// the current offset and are skipped when computing the next step.
    pub fn unwrap(&self, raw_ft: &[f64]) -> Unwrapped {
        let threshold = self.config.wrap_threshold_ft;

        let mut altitudes_ft = Vec::with_capacity(raw_ft.len());
        let mut depths = Vec::with_capacity(raw_ft.len());
        let mut events = Vec::new();
        let mut depth: i32 = 0;
        let mut prev: Option<f64> = None;

        for (index, &raw) in raw_ft.iter().enumerate() {
            if raw.is_finite() {
                if let Some(prev) = prev {
                    let delta = raw - prev;
                    if let Some(direction) = self.classify(delta) {
                        depth += match direction {
                            WrapDirection::Overflow => 1,
                            WrapDirection::Underflow => -1,
                        };
                        debug!(index, delta, depth, ?direction, "density altitude wrap");
                        if depth > 1 && direction == WrapDirection::Overflow {
                            warn!(index, depth, "stacked overflow beyond the single observed wrap");
                        }
                        events.push(WrapEvent {
                            index,
                            direction,
                            raw_delta_ft: delta,
                            depth,
                        });
                    }
                }
                prev = Some(raw);
            }

            altitudes_ft.push(raw + f64::from(depth) * threshold);
            depths.push(depth);
        }

        Unwrapped {
            altitudes_ft,
            depths,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unwrapper() -> OverflowUnwrapper {
        OverflowUnwrapper::new(UnwrapConfig::default()).unwrap()
    }

    /// What the logger records for a true altitude.
    fn recorded(true_ft: f64) -> f64 {
        true_ft.rem_euclid(DEFAULT_WRAP_THRESHOLD_FT)
    }

    #[test]
    fn continuous_series_is_unchanged() {
        let raw = vec![2863.0, 2863.0, 2860.0, 2871.0, 2902.0];
        let out = unwrapper().unwrap(&raw);
        assert_eq!(out.altitudes_ft, raw);
        assert!(out.events.is_empty());
    }

    #[test]
    fn single_wrap_is_monotonic() {
        let truth: Vec<f64> = (0..120).map(|i| 9_800.0 + 12.5 * i as f64).collect();
        let raw: Vec<f64> = truth.iter().map(|&t| recorded(t)).collect();

        let out = unwrapper().unwrap(&raw);

        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].direction, WrapDirection::Overflow);
        assert!(out.altitudes_ft.windows(2).all(|w| w[1] >= w[0]));
        for (c, t) in out.altitudes_ft.iter().zip(&truth) {
            assert!((c - t).abs() < 1e-6);
        }
    }

    #[test]
    fn two_wraps_accumulate_two_offsets() {
        let truth: Vec<f64> = (0..700).map(|i| 8_000.0 + 25.0 * i as f64).collect();
        let raw: Vec<f64> = truth.iter().map(|&t| recorded(t)).collect();

        let out = unwrapper().unwrap(&raw);

        assert_eq!(out.events.len(), 2);
        assert_eq!(out.max_depth(), 2);
        let last = *out.altitudes_ft.last().unwrap();
        assert!((last - truth.last().unwrap()).abs() < 1e-6);
        assert!(last > 2.0 * DEFAULT_WRAP_THRESHOLD_FT);
    }

    #[test]
    fn descent_back_through_threshold_resumes_normal_range() {
        let mut truth: Vec<f64> = (0..60).map(|i| 10_300.0 + 10.0 * i as f64).collect();
        truth.extend((0..60).map(|i| 10_890.0 - 10.0 * i as f64));
        let raw: Vec<f64> = truth.iter().map(|&t| recorded(t)).collect();

        let out = unwrapper().unwrap(&raw);

        assert_eq!(out.events.len(), 2);
        assert_eq!(out.events[1].direction, WrapDirection::Underflow);
        assert_eq!(out.events[1].depth, 0);
        let last = *out.altitudes_ft.last().unwrap();
        assert_eq!(last, *raw.last().unwrap());
        for (c, t) in out.altitudes_ft.iter().zip(&truth) {
            assert!((c - t).abs() < 1e-6);
        }
    }

    #[test]
    fn first_sample_is_baseline() {
        let out = unwrapper().unwrap(&[40.0]);
        assert_eq!(out.altitudes_ft, vec![40.0]);
        assert!(out.events.is_empty());
        assert!(unwrapper().unwrap(&[]).altitudes_ft.is_empty());
    }

    #[test]
    fn event_index_points_after_the_drop() {
        let out = unwrapper().unwrap(&[10_580.0, 10_595.0, 8.0, 20.0]);
        assert_eq!(out.events[0].index, 2);
        assert_eq!(out.altitudes_ft, vec![10_580.0, 10_595.0, 10_608.0, 10_620.0]);
        assert_eq!(out.depths, vec![0, 0, 1, 1]);
    }

    #[test]
    fn nan_samples_pass_through() {
        let out = unwrapper().unwrap(&[10_590.0, f64::NAN, 5.0]);
        assert!(out.altitudes_ft[1].is_nan());
        assert_eq!(out.altitudes_ft[2], 10_605.0);
        assert_eq!(out.events.len(), 1);
    }

    #[test]
    fn threshold_is_tunable() {
        let config = UnwrapConfig {
            wrap_threshold_ft: 8_192.0,
            wrap_tolerance_ft: 200.0,
        };
        let out = OverflowUnwrapper::new(config)
            .unwrap()
            .unwrap(&[8_150.0, 8_180.0, 20.0]);
        assert_eq!(out.altitudes_ft[2], 8_212.0);

        // A default-sized drop is outside the tuned band.
        let out = unwrapper().unwrap(&[8_150.0, 8_180.0, 20.0]);
        assert!(out.events.is_empty());
    }

    #[test]
    fn overlapping_bands_are_rejected() {
        for (threshold, tolerance) in [
            (10_600.0, 5_300.0),
            (0.0, 0.0),
            (-10.0, 1.0),
            (10_600.0, -1.0),
            (f64::NAN, 1.0),
        ] {
            let config = UnwrapConfig {
                wrap_threshold_ft: threshold,
                wrap_tolerance_ft: tolerance,
            };
            assert!(matches!(
                OverflowUnwrapper::new(config),
                Err(FixError::InvalidConfig(_))
            ));
        }
    }

    proptest! {
        #[test]
        fn small_steps_never_trigger_a_wrap(
            start in 0.0f64..10_600.0,
            steps in prop::collection::vec(-49.9f64..10.0, 1..400),
        ) {
            let mut raw = vec![start];
            for step in steps {
                let next = raw[raw.len() - 1] + step;
                raw.push(next);
            }
            let out = unwrapper().unwrap(&raw);
            prop_assert!(out.events.is_empty());
            prop_assert_eq!(out.altitudes_ft, raw);
        }
    }
}
