//! Termination policy for adaptive sessions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::AbilityEstimate;

/// When to stop administering items. Immutable configuration supplied at
/// session start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminationCriteria {
    /// Stop once the ability standard error drops to this value.
    pub target_standard_error: f64,
    /// Hard cap on the number of administered items.
    pub max_items: usize,
    /// Stop early once theta reaches this mastery threshold, if set.
    pub mastery_theta: Option<f64>,
    /// Minimum items before the mastery stop is honored, so one lucky early
    /// response cannot end the test instantly.
    pub mastery_min_items: usize,
    /// Stop after this many successive updates that barely move theta.
    pub max_stall_count: u32,
    /// A theta change below this counts as a stall.
    pub stall_epsilon: f64,
}

impl Default for TerminationCriteria {
    fn default() -> Self {
        Self {
            target_standard_error: 0.3,
            max_items: 25,
            mastery_theta: Some(1.2),
            mastery_min_items: 5,
            max_stall_count: 3,
            stall_epsilon: 0.01,
        }
    }
}

/// Why the termination evaluator stopped a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxItemsReached,
    TargetPrecisionReached,
    MasteryDemonstrated,
    Stalled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxItemsReached => write!(f, "max items reached"),
            StopReason::TargetPrecisionReached => write!(f, "target precision reached"),
            StopReason::MasteryDemonstrated => write!(f, "mastery demonstrated"),
            StopReason::Stalled => write!(f, "stalled"),
        }
    }
}

/// Evaluate the stop conditions in priority order and return the first that
/// fires, if any.
pub fn evaluate(
    ability: &AbilityEstimate,
    items_administered: usize,
    stall_count: u32,
    criteria: &TerminationCriteria,
) -> Option<StopReason> {
    if items_administered >= criteria.max_items {
        return Some(StopReason::MaxItemsReached);
    }
    if ability.standard_error <= criteria.target_standard_error {
        return Some(StopReason::TargetPrecisionReached);
    }
    if let Some(mastery_theta) = criteria.mastery_theta {
        if ability.theta >= mastery_theta && items_administered >= criteria.mastery_min_items {
            return Some(StopReason::MasteryDemonstrated);
        }
    }
    if stall_count >= criteria.max_stall_count {
        return Some(StopReason::Stalled);
    }
    None
}

/// Boolean form of [`evaluate`].
pub fn should_stop(
    ability: &AbilityEstimate,
    items_administered: usize,
    stall_count: u32,
    criteria: &TerminationCriteria,
) -> bool {
    evaluate(ability, items_administered, stall_count, criteria).is_some()
}
