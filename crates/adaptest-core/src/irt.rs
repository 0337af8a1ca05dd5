//! 3-parameter-logistic probability model.
//!
//! Pure functions over item parameters and ability: response probability and
//! Fisher information. Everything downstream (estimation, selection) is built
//! from these two.

use crate::model::ItemParameter;

/// Logistic scaling constant that aligns the logistic curve with the normal
/// ogive model.
pub const SCALING_D: f64 = 1.7;

/// Exponent arguments are clamped to this magnitude before `exp`. Saturation
/// behavior is unchanged: p has already flattened to its asymptote here.
const MAX_EXPONENT: f64 = 35.0;

/// Probabilities are kept this far away from exactly 0 and 1 before division.
const MIN_PROBABILITY: f64 = 1e-9;

/// Probability of a correct response under the 3PL model.
///
/// `p = c + (1 - c) / (1 + exp(-D·a·(theta - b)))`, so `p ∈ [c, 1)` with
/// `p → c` as `theta → -∞` and `p → 1` as `theta → +∞`.
pub fn probability_correct(parameter: &ItemParameter, theta: f64) -> f64 {
    let exponent = -SCALING_D * parameter.discrimination * (theta - parameter.difficulty);
    let capped = exponent.clamp(-MAX_EXPONENT, MAX_EXPONENT);
    let logistic = 1.0 / (1.0 + capped.exp());
    parameter.guessing + (1.0 - parameter.guessing) * logistic
}

/// Fisher information the item carries about ability `theta`.
///
/// `I(theta) = (D·a)² · (q/p) · ((p - c) / (1 - c))²` with `q = 1 - p`.
/// Defined as 0 for a degenerate guessing parameter (`1 - c ≤ 0`). For fixed
/// `(a, c)` the information is maximized at `theta == b`.
pub fn fisher_information(parameter: &ItemParameter, theta: f64) -> f64 {
    let one_minus_guessing = 1.0 - parameter.guessing;
    if one_minus_guessing <= 0.0 {
        return 0.0;
    }

    let p = probability_correct(parameter, theta).clamp(MIN_PROBABILITY, 1.0 - MIN_PROBABILITY);
    let q = 1.0 - p;
    let scaled_slope = SCALING_D * parameter.discrimination;
    let normalized_p = (p - parameter.guessing) / one_minus_guessing;
    scaled_slope * scaled_slope * (q / p) * normalized_p * normalized_p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameter(difficulty: f64, discrimination: f64, guessing: f64) -> ItemParameter {
        ItemParameter {
            difficulty,
            discrimination,
            guessing,
        }
    }

    #[test]
    fn probability_at_difficulty_is_midpoint() {
        // p = c + (1-c)·0.5 = 0.2 + 0.8·0.5 = 0.6 exactly.
        let p = probability_correct(&parameter(0.0, 1.0, 0.2), 0.0);
        assert!((p - 0.6).abs() < 1e-9, "expected 0.6, got {p}");
    }

    #[test]
    fn probability_stays_within_bounds() {
        let item = parameter(0.5, 1.3, 0.25);
        for i in -80..=80 {
            let theta = i as f64 / 10.0;
            let p = probability_correct(&item, theta);
            assert!(p >= item.guessing, "p={p} below guessing floor at theta={theta}");
            assert!(p <= 1.0, "p={p} above 1 at theta={theta}");
        }
    }

    #[test]
    fn probability_saturates_at_extremes() {
        let item = parameter(0.0, 2.0, 0.2);
        let low = probability_correct(&item, -1e6);
        let high = probability_correct(&item, 1e6);
        assert!((low - 0.2).abs() < 1e-9, "p → c as theta → -inf, got {low}");
        assert!((high - 1.0).abs() < 1e-9, "p → 1 as theta → +inf, got {high}");
        assert!(low.is_finite() && high.is_finite());
    }

    #[test]
    fn information_peaks_at_difficulty() {
        let item = parameter(0.8, 1.0, 0.0);
        let at_peak = fisher_information(&item, 0.8);
        for offset in [-2.0, -1.0, -0.5, -0.1, 0.1, 0.5, 1.0, 2.0] {
            let off_peak = fisher_information(&item, 0.8 + offset);
            assert!(
                off_peak < at_peak,
                "information at offset {offset} ({off_peak}) not below peak ({at_peak})"
            );
        }
    }

    #[test]
    fn information_is_nonnegative() {
        let item = parameter(-1.0, 0.7, 0.3);
        for i in -60..=60 {
            let info = fisher_information(&item, i as f64 / 10.0);
            assert!(info >= 0.0);
            assert!(info.is_finite());
        }
    }

    #[test]
    fn degenerate_guessing_yields_zero_information() {
        assert_eq!(fisher_information(&parameter(0.0, 1.0, 1.0), 0.0), 0.0);
    }

    #[test]
    fn higher_discrimination_sharpens_information() {
        let flat = fisher_information(&parameter(0.0, 0.8, 0.2), 0.2);
        let sharp = fisher_information(&parameter(0.0, 2.0, 0.2), 0.2);
        assert!(sharp > flat);
    }
}
