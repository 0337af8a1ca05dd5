//! The adaptive session state machine.
//!
//! A session walks `NotStarted → InProgress → Completed` and owns the
//! administered-item list, response history, ability history, and stall
//! counter. Every mutating operation validates its inputs before committing,
//! so a failed call leaves the session exactly as it was.

use std::collections::HashSet;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::estimator::{estimate_ability, EstimatorConfig};
use crate::model::{
    AbilityEstimate, ItemParameter, ItemResponse, ItemTemplate, LearnerProfile, PRIOR_THETA,
};
use crate::selector;
use crate::snapshot::{SessionSnapshot, SNAPSHOT_VERSION};
use crate::termination::{self, StopReason, TerminationCriteria};

/// Lifecycle state of a session. No transition skips a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NotStarted => write!(f, "not started"),
            SessionState::InProgress => write!(f, "in progress"),
            SessionState::Completed => write!(f, "completed"),
        }
    }
}

/// Why a session reached `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    MaxItemsReached,
    TargetPrecisionReached,
    MasteryDemonstrated,
    Stalled,
    PoolExhausted,
}

impl From<StopReason> for CompletionReason {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::MaxItemsReached => CompletionReason::MaxItemsReached,
            StopReason::TargetPrecisionReached => CompletionReason::TargetPrecisionReached,
            StopReason::MasteryDemonstrated => CompletionReason::MasteryDemonstrated,
            StopReason::Stalled => CompletionReason::Stalled,
        }
    }
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionReason::MaxItemsReached => write!(f, "max items reached"),
            CompletionReason::TargetPrecisionReached => write!(f, "target precision reached"),
            CompletionReason::MasteryDemonstrated => write!(f, "mastery demonstrated"),
            CompletionReason::Stalled => write!(f, "stalled"),
            CompletionReason::PoolExhausted => write!(f, "item pool exhausted"),
        }
    }
}

/// One adaptive testing session for one learner.
///
/// The item pool is fixed at construction and treated as read-only for the
/// session's lifetime. The session performs no I/O; persistence happens
/// through [`SessionSnapshot`].
#[derive(Debug, Clone)]
pub struct AdaptiveSession {
    id: Uuid,
    learner: LearnerProfile,
    item_pool: Vec<ItemTemplate>,
    criteria: TerminationCriteria,
    estimator: EstimatorConfig,
    state: SessionState,
    administered_item_ids: Vec<String>,
    responses: Vec<ItemResponse>,
    ability_history: Vec<AbilityEstimate>,
    stall_count: u32,
    completion_reason: Option<CompletionReason>,
}

impl AdaptiveSession {
    /// Create a session in the `NotStarted` state. Criteria default to
    /// [`TerminationCriteria::default`] when omitted.
    pub fn new(
        learner: LearnerProfile,
        item_pool: Vec<ItemTemplate>,
        criteria: Option<TerminationCriteria>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            learner,
            item_pool,
            criteria: criteria.unwrap_or_default(),
            estimator: EstimatorConfig::default(),
            state: SessionState::NotStarted,
            administered_item_ids: Vec::new(),
            responses: Vec::new(),
            ability_history: Vec::new(),
            stall_count: 0,
            completion_reason: None,
        }
    }

    /// Override the estimator configuration before starting.
    pub fn with_estimator(mut self, estimator: EstimatorConfig) -> Self {
        self.estimator = estimator;
        self
    }

    /// Begin the session: validates the pool, seeds the ability history with
    /// the prior estimate, and moves to `InProgress`.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.require_state(SessionState::NotStarted, "start")?;
        if self.item_pool.is_empty() {
            return Err(SessionError::ItemPoolEmpty);
        }

        self.ability_history.push(AbilityEstimate::prior());
        self.state = SessionState::InProgress;
        tracing::debug!(session_id = %self.id, learner = %self.learner.name, "session started");
        Ok(())
    }

    /// Peek at the next item to administer.
    ///
    /// Selection is deterministic, so repeated calls return the same item and
    /// the session is not mutated — except when the pool is exhausted, which
    /// completes the session and returns `Ok(None)`.
    pub fn advance_to_next_item(&mut self) -> Result<Option<&ItemTemplate>, SessionError> {
        self.require_state(SessionState::InProgress, "advance_to_next_item")?;

        match self.selected_item_id() {
            None => {
                self.state = SessionState::Completed;
                self.completion_reason = Some(CompletionReason::PoolExhausted);
                tracing::info!(session_id = %self.id, "item pool exhausted, session completed");
                Ok(None)
            }
            Some(id) => Ok(self.item_pool.iter().find(|item| item.id == id)),
        }
    }

    /// Record the learner's response to the currently selected item.
    ///
    /// Re-estimates ability over the full response history, updates the stall
    /// counter, and evaluates termination. Fails without mutating on a score
    /// outside [0, 1], an id unknown to the pool, an id already administered,
    /// or an id that is not the item the selector currently proposes.
    pub fn record_response(
        &mut self,
        item_id: &str,
        is_correct: bool,
        score: f64,
        response_time_ms: u64,
        raw_response: &str,
    ) -> Result<ItemResponse, SessionError> {
        self.require_state(SessionState::InProgress, "record_response")?;
        if !(0.0..=1.0).contains(&score) {
            return Err(SessionError::ScoreOutOfRange(score));
        }

        let parameter = match self.item_pool.iter().find(|item| item.id == item_id) {
            Some(item) => item.parameter,
            None => return Err(SessionError::UnknownOrDuplicateItem(item_id.to_string())),
        };
        if self.administered_item_ids.iter().any(|id| id == item_id) {
            return Err(SessionError::UnknownOrDuplicateItem(item_id.to_string()));
        }
        if self.selected_item_id().as_deref() != Some(item_id) {
            return Err(SessionError::UnknownOrDuplicateItem(item_id.to_string()));
        }

        let mut history = self.parameter_history();
        history.push((parameter, is_correct));
        let prior = self
            .ability_history
            .first()
            .cloned()
            .unwrap_or_else(AbilityEstimate::prior);
        let previous_theta = self.current_theta();
        let estimation = estimate_ability(&history, &prior, &self.estimator);
        if estimation.is_fallback() {
            tracing::debug!(session_id = %self.id, "ability update took the fallback path");
        }
        let new_estimate = estimation.into_estimate();

        let stall_count = if (new_estimate.theta - previous_theta).abs() < self.criteria.stall_epsilon
        {
            self.stall_count + 1
        } else {
            0
        };

        let response = ItemResponse {
            id: Uuid::new_v4(),
            item_id: item_id.to_string(),
            is_correct,
            score,
            response_time_ms,
            raw_response: raw_response.to_string(),
            ability_after: new_estimate.clone(),
            answered_at: Utc::now(),
        };

        // All validation has passed; commit.
        self.administered_item_ids.push(item_id.to_string());
        self.responses.push(response.clone());
        self.ability_history.push(new_estimate);
        self.stall_count = stall_count;

        if let Some(latest) = self.ability_history.last() {
            if let Some(reason) =
                termination::evaluate(latest, self.responses.len(), self.stall_count, &self.criteria)
            {
                self.state = SessionState::Completed;
                self.completion_reason = Some(reason.into());
                tracing::info!(
                    session_id = %self.id,
                    items = self.responses.len(),
                    theta = latest.theta,
                    standard_error = latest.standard_error,
                    %reason,
                    "session completed"
                );
            }
        }

        Ok(response)
    }

    /// Capture a serializable snapshot of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            session_id: self.id,
            learner: self.learner.clone(),
            criteria: self.criteria,
            estimator: self.estimator,
            state: self.state,
            administered_item_ids: self.administered_item_ids.clone(),
            responses: self.responses.clone(),
            ability_history: self.ability_history.clone(),
            stall_count: self.stall_count,
            completion_reason: self.completion_reason,
        }
    }

    /// Reconstruct a session from a snapshot and the item pool it ran
    /// against. Validates every session invariant; a snapshot that fails
    /// validation is rejected rather than patched up.
    pub fn restore(
        snapshot: SessionSnapshot,
        item_pool: Vec<ItemTemplate>,
    ) -> Result<Self, SessionError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SessionError::UnsupportedSnapshotVersion(snapshot.version));
        }
        if snapshot.responses.len() != snapshot.administered_item_ids.len() {
            return Err(SessionError::InvalidSnapshot(format!(
                "{} responses but {} administered items",
                snapshot.responses.len(),
                snapshot.administered_item_ids.len()
            )));
        }

        let mut seen = HashSet::new();
        for id in &snapshot.administered_item_ids {
            if !seen.insert(id.as_str()) {
                return Err(SessionError::InvalidSnapshot(format!(
                    "item {id} administered twice"
                )));
            }
            if !item_pool.iter().any(|item| &item.id == id) {
                return Err(SessionError::InvalidSnapshot(format!(
                    "administered item {id} is not in the supplied pool"
                )));
            }
        }
        for (response, id) in snapshot
            .responses
            .iter()
            .zip(&snapshot.administered_item_ids)
        {
            if &response.item_id != id {
                return Err(SessionError::InvalidSnapshot(format!(
                    "response order does not match administered order at item {id}"
                )));
            }
        }

        match snapshot.state {
            SessionState::NotStarted => {
                if !snapshot.ability_history.is_empty() || !snapshot.responses.is_empty() {
                    return Err(SessionError::InvalidSnapshot(
                        "a not-started session cannot carry history".into(),
                    ));
                }
            }
            SessionState::InProgress | SessionState::Completed => {
                if item_pool.is_empty() {
                    return Err(SessionError::InvalidSnapshot(
                        "a started session requires a non-empty item pool".into(),
                    ));
                }
                if snapshot.ability_history.len() != snapshot.responses.len() + 1 {
                    return Err(SessionError::InvalidSnapshot(format!(
                        "ability history has {} entries for {} responses",
                        snapshot.ability_history.len(),
                        snapshot.responses.len()
                    )));
                }
            }
        }
        match snapshot.state {
            SessionState::Completed if snapshot.completion_reason.is_none() => {
                return Err(SessionError::InvalidSnapshot(
                    "a completed session must carry a completion reason".into(),
                ));
            }
            SessionState::NotStarted | SessionState::InProgress
                if snapshot.completion_reason.is_some() =>
            {
                return Err(SessionError::InvalidSnapshot(
                    "only a completed session may carry a completion reason".into(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            id: snapshot.session_id,
            learner: snapshot.learner,
            item_pool,
            criteria: snapshot.criteria,
            estimator: snapshot.estimator,
            state: snapshot.state,
            administered_item_ids: snapshot.administered_item_ids,
            responses: snapshot.responses,
            ability_history: snapshot.ability_history,
            stall_count: snapshot.stall_count,
            completion_reason: snapshot.completion_reason,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn learner(&self) -> &LearnerProfile {
        &self.learner
    }

    pub fn item_pool(&self) -> &[ItemTemplate] {
        &self.item_pool
    }

    pub fn criteria(&self) -> &TerminationCriteria {
        &self.criteria
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    pub fn completion_reason(&self) -> Option<CompletionReason> {
        self.completion_reason
    }

    pub fn administered_item_ids(&self) -> &[String] {
        &self.administered_item_ids
    }

    pub fn responses(&self) -> &[ItemResponse] {
        &self.responses
    }

    pub fn ability_history(&self) -> &[AbilityEstimate] {
        &self.ability_history
    }

    /// The latest ability estimate; `None` before `start`.
    pub fn current_ability(&self) -> Option<&AbilityEstimate> {
        self.ability_history.last()
    }

    pub fn stall_count(&self) -> u32 {
        self.stall_count
    }

    fn require_state(
        &self,
        expected: SessionState,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.state != expected {
            return Err(SessionError::InvalidSessionState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn current_theta(&self) -> f64 {
        self.ability_history
            .last()
            .map(|estimate| estimate.theta)
            .unwrap_or(PRIOR_THETA)
    }

    fn selected_item_id(&self) -> Option<String> {
        let administered: HashSet<String> = self.administered_item_ids.iter().cloned().collect();
        selector::select_next(&self.item_pool, &administered, self.current_theta())
            .map(|item| item.id.clone())
    }

    fn parameter_history(&self) -> Vec<(ItemParameter, bool)> {
        self.responses
            .iter()
            .filter_map(|response| {
                self.item_pool
                    .iter()
                    .find(|item| item.id == response.item_id)
                    .map(|item| (item.parameter, response.is_correct))
            })
            .collect()
    }
}
