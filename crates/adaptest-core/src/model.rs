//! Core data model types for adaptest.
//!
//! These are the fundamental types the entire adaptest system uses to
//! represent items, learners, responses, and ability estimates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::SessionError;

/// 3PL item parameters: difficulty (b), discrimination (a), guessing (c).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemParameter {
    /// Difficulty (b) on the theta scale.
    pub difficulty: f64,
    /// Discrimination (a); must be positive.
    #[serde(default = "default_discrimination")]
    pub discrimination: f64,
    /// Guessing floor (c) in [0, 1).
    #[serde(default = "default_guessing")]
    pub guessing: f64,
}

impl ItemParameter {
    /// An item with the given difficulty and the default discrimination
    /// and guessing values.
    pub fn with_difficulty(difficulty: f64) -> Self {
        Self {
            difficulty,
            discrimination: default_discrimination(),
            guessing: default_guessing(),
        }
    }
}

fn default_discrimination() -> f64 {
    1.0
}

fn default_guessing() -> f64 {
    0.2
}

/// Supported item formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFormat {
    MultipleChoice,
    ShortAnswer,
    CaseScenario,
    MechanisticExplanation,
}

impl fmt::Display for ItemFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemFormat::MultipleChoice => write!(f, "multiple_choice"),
            ItemFormat::ShortAnswer => write!(f, "short_answer"),
            ItemFormat::CaseScenario => write!(f, "case_scenario"),
            ItemFormat::MechanisticExplanation => write!(f, "mechanistic_explanation"),
        }
    }
}

impl FromStr for ItemFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multiple_choice" | "mcq" => Ok(ItemFormat::MultipleChoice),
            "short_answer" => Ok(ItemFormat::ShortAnswer),
            "case_scenario" | "case" => Ok(ItemFormat::CaseScenario),
            "mechanistic_explanation" => Ok(ItemFormat::MechanisticExplanation),
            other => Err(format!("unknown item format: {other}")),
        }
    }
}

/// A single answer choice. Choice text is opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemChoice {
    /// Choice text shown to the learner.
    pub text: String,
    /// Whether this choice is the keyed answer.
    #[serde(default)]
    pub is_correct: bool,
}

/// A calibrated test item. Immutable; owned by the item bank and referenced
/// from sessions by id. Only `id` and `parameter` are read by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    /// Unique identifier within the bank.
    pub id: String,
    /// The question stem shown to the learner.
    pub stem: String,
    /// Answer choices (empty for open formats).
    #[serde(default)]
    pub choices: Vec<ItemChoice>,
    /// Item format.
    pub format: ItemFormat,
    /// Calibrated 3PL parameters.
    pub parameter: ItemParameter,
    /// Topic used for report grouping.
    #[serde(default)]
    pub topic: String,
    /// Finer-grained subtopic.
    #[serde(default)]
    pub subtopic: String,
    /// Explanation shown after answering.
    #[serde(default)]
    pub explanation: String,
    /// Bloom taxonomy level.
    #[serde(default = "default_bloom_level")]
    pub bloom_level: String,
    /// Learning objective this item assesses.
    #[serde(default)]
    pub learning_objective: String,
    /// Tags for filtering items.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_bloom_level() -> String {
    "Apply".to_string()
}

/// The learner a session is administered to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    /// Unique learner identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Stated learning objectives.
    pub objectives: Vec<String>,
}

impl LearnerProfile {
    /// Create a profile with a freshly generated id. Blank objectives are
    /// dropped and surrounding whitespace is trimmed.
    pub fn new(
        name: &str,
        objectives: impl IntoIterator<Item = String>,
    ) -> Result<Self, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyLearnerName);
        }

        let objectives = objectives
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            objectives,
        })
    }
}

/// How an ability estimate was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimationMethod {
    /// The seed estimate a session starts from.
    Prior,
    /// Newton-Raphson maximum likelihood.
    #[serde(rename = "MLE")]
    Mle,
    /// Normal-prior regularized fallback for degenerate response patterns.
    #[serde(rename = "Bayes-Modal")]
    BayesModal,
}

impl fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimationMethod::Prior => write!(f, "Prior"),
            EstimationMethod::Mle => write!(f, "MLE"),
            EstimationMethod::BayesModal => write!(f, "Bayes-Modal"),
        }
    }
}

/// Default prior ability point estimate.
pub const PRIOR_THETA: f64 = -1.5;
/// Default prior standard error.
pub const PRIOR_STANDARD_ERROR: f64 = 1.0;

/// A point-in-time estimate of learner ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityEstimate {
    /// Unique estimate identifier.
    pub id: Uuid,
    /// Latent ability point estimate.
    pub theta: f64,
    /// Uncertainty of the estimate; non-negative.
    pub standard_error: f64,
    /// The estimation path that produced this value.
    pub method: EstimationMethod,
    /// When the estimate was computed.
    pub timestamp: DateTime<Utc>,
}

impl AbilityEstimate {
    pub fn new(theta: f64, standard_error: f64, method: EstimationMethod) -> Self {
        Self {
            id: Uuid::new_v4(),
            theta,
            standard_error,
            method,
            timestamp: Utc::now(),
        }
    }

    /// The seed estimate every session starts from.
    pub fn prior() -> Self {
        Self::new(PRIOR_THETA, PRIOR_STANDARD_ERROR, EstimationMethod::Prior)
    }

    /// Variance of the estimate.
    pub fn variance(&self) -> f64 {
        self.standard_error * self.standard_error
    }

    /// Information carried by the estimate: `1 / SE²`, 0 when SE is 0.
    pub fn information(&self) -> f64 {
        let variance = self.variance();
        if variance <= 0.0 {
            return 0.0;
        }
        1.0 / variance
    }
}

/// A learner's response to one administered item. Append-only; created
/// exactly once per administered item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    /// Unique response identifier.
    pub id: Uuid,
    /// Id of the administered item.
    pub item_id: String,
    /// Whether the response was scored correct.
    pub is_correct: bool,
    /// Partial-credit score in [0, 1].
    pub score: f64,
    /// Time taken to answer, in milliseconds.
    pub response_time_ms: u64,
    /// The learner's raw answer text.
    pub raw_response: String,
    /// The ability estimate computed after this response.
    pub ability_after: AbilityEstimate,
    /// When the response was recorded.
    pub answered_at: DateTime<Utc>,
}
