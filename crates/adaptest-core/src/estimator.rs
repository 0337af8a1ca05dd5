//! Ability estimation from a response history.
//!
//! The primary path is Newton-Raphson maximum likelihood on the 3PL
//! log-likelihood, using the closed-form gradient and the expected (Fisher)
//! information as the negative Hessian. Degenerate response patterns — all
//! correct or all incorrect — have no interior likelihood maximum, so the
//! estimator falls back to Bayes-modal estimation with a normal prior as
//! regularizer instead of letting the iteration run away.

use serde::{Deserialize, Serialize};

use crate::irt::{fisher_information, probability_correct, SCALING_D};
use crate::model::{AbilityEstimate, EstimationMethod, ItemParameter};

/// Numeric constants for the estimator. These are configuration, not
/// hard-coded values; `Default` gives the values the engine ships with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Newton-Raphson iteration cap.
    pub max_iterations: u32,
    /// Convergence threshold on `|Δtheta|`.
    pub convergence_epsilon: f64,
    /// Lower bound of the plausible theta range.
    pub theta_min: f64,
    /// Upper bound of the plausible theta range.
    pub theta_max: f64,
    /// Variance of the normal prior used by the Bayes-modal fallback.
    pub prior_variance: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            convergence_epsilon: 1e-4,
            theta_min: -4.0,
            theta_max: 4.0,
            prior_variance: 1.0,
        }
    }
}

/// Outcome of an estimation run. Callers and tests can distinguish the
/// normal MLE path from the degenerate-data fallback without string checks.
#[derive(Debug, Clone, PartialEq)]
pub enum Estimation {
    /// Newton-Raphson converged on the unpenalized likelihood.
    Converged(AbilityEstimate),
    /// The Bayes-modal fallback produced the estimate.
    FallbackUsed(AbilityEstimate),
}

impl Estimation {
    /// The estimate, whichever path produced it.
    pub fn into_estimate(self) -> AbilityEstimate {
        match self {
            Estimation::Converged(e) | Estimation::FallbackUsed(e) => e,
        }
    }

    pub fn estimate(&self) -> &AbilityEstimate {
        match self {
            Estimation::Converged(e) | Estimation::FallbackUsed(e) => e,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Estimation::FallbackUsed(_))
    }
}

/// Estimate ability from the full response history.
///
/// `history` pairs each administered item's parameters with the scored
/// correctness of the response. The returned theta is always finite and
/// clamped to `[theta_min, theta_max]`; the standard error falls back to the
/// prior's when the history carries no information.
pub fn estimate_ability(
    history: &[(ItemParameter, bool)],
    prior: &AbilityEstimate,
    config: &EstimatorConfig,
) -> Estimation {
    if history.is_empty() {
        return Estimation::Converged(prior.clone());
    }

    let all_correct = history.iter().all(|(_, correct)| *correct);
    let all_incorrect = history.iter().all(|(_, correct)| !*correct);
    if all_correct || all_incorrect {
        return Estimation::FallbackUsed(bayes_modal(history, prior, config));
    }

    if let Some(theta) = newton_raphson(history, prior.theta, config, None) {
        let total_information: f64 = history
            .iter()
            .map(|(parameter, _)| fisher_information(parameter, theta))
            .sum();
        let standard_error = if total_information > 0.0 {
            1.0 / total_information.sqrt()
        } else {
            prior.standard_error
        };
        return Estimation::Converged(AbilityEstimate::new(
            theta,
            standard_error,
            EstimationMethod::Mle,
        ));
    }

    tracing::debug!("MLE failed to converge, falling back to Bayes-modal");
    Estimation::FallbackUsed(bayes_modal(history, prior, config))
}

/// Bayes-modal estimation: Newton-Raphson on the log-posterior with a
/// `N(prior.theta, prior_variance)` prior. The prior curvature keeps the
/// iteration bounded even when every response is identical.
fn bayes_modal(
    history: &[(ItemParameter, bool)],
    prior: &AbilityEstimate,
    config: &EstimatorConfig,
) -> AbilityEstimate {
    let regularizer = Regularizer {
        mean: prior.theta,
        variance: config.prior_variance,
    };
    let theta = newton_raphson(history, prior.theta, config, Some(regularizer))
        .unwrap_or(prior.theta)
        .clamp(config.theta_min, config.theta_max);

    let total_information: f64 = history
        .iter()
        .map(|(parameter, _)| fisher_information(parameter, theta))
        .sum::<f64>()
        + 1.0 / config.prior_variance;
    let standard_error = if total_information > 0.0 {
        1.0 / total_information.sqrt()
    } else {
        prior.standard_error
    };

    AbilityEstimate::new(theta, standard_error, EstimationMethod::BayesModal)
}

#[derive(Clone, Copy)]
struct Regularizer {
    mean: f64,
    variance: f64,
}

/// Newton-Raphson on the (optionally penalized) 3PL log-likelihood.
/// Returns `None` when the iteration cannot make progress or fails to
/// converge within the cap.
fn newton_raphson(
    history: &[(ItemParameter, bool)],
    start: f64,
    config: &EstimatorConfig,
    regularizer: Option<Regularizer>,
) -> Option<f64> {
    let mut theta = start.clamp(config.theta_min, config.theta_max);

    for _ in 0..config.max_iterations {
        let (mut gradient, mut information) = gradient_and_information(history, theta);
        if let Some(reg) = regularizer {
            gradient -= (theta - reg.mean) / reg.variance;
            information += 1.0 / reg.variance;
        }
        if information <= 0.0 || !gradient.is_finite() {
            return None;
        }

        let next = (theta + gradient / information).clamp(config.theta_min, config.theta_max);
        let delta = next - theta;
        theta = next;
        if delta.abs() < config.convergence_epsilon {
            return Some(theta);
        }
    }

    // The fallback path tolerates hitting the cap: the estimate is bounded
    // and finite, which is all the degenerate case can promise.
    if regularizer.is_some() {
        return Some(theta);
    }
    None
}

/// Closed-form 3PL log-likelihood gradient and total expected information.
///
/// Per item: `∂lnL/∂theta = D·a·(u - p)·(p - c) / (p·(1 - c))`.
fn gradient_and_information(history: &[(ItemParameter, bool)], theta: f64) -> (f64, f64) {
    let mut gradient = 0.0;
    let mut information = 0.0;
    for (parameter, is_correct) in history {
        let p = probability_correct(parameter, theta).clamp(1e-9, 1.0 - 1e-9);
        let u = if *is_correct { 1.0 } else { 0.0 };
        let one_minus_guessing = 1.0 - parameter.guessing;
        if one_minus_guessing <= 0.0 {
            continue;
        }
        gradient += SCALING_D * parameter.discrimination * (u - p) * (p - parameter.guessing)
            / (p * one_minus_guessing);
        information += fisher_information(parameter, theta);
    }
    (gradient, information)
}
