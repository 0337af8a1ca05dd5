//! Versioned session snapshots with JSON persistence.
//!
//! The snapshot is the engine's only persistence contract: everything needed
//! to reconstruct the state machine exactly, and nothing else — the item pool
//! is owned by the item bank and supplied again at restore time.
//! Reconstruction goes through [`crate::session::AdaptiveSession::restore`],
//! which re-validates every invariant.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::estimator::EstimatorConfig;
use crate::model::{AbilityEstimate, ItemResponse, LearnerProfile};
use crate::session::{CompletionReason, SessionState};
use crate::termination::TerminationCriteria;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A serializable form of a session, sufficient for deterministic resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Schema version; bumped on incompatible changes.
    pub version: u32,
    pub session_id: Uuid,
    pub learner: LearnerProfile,
    pub criteria: TerminationCriteria,
    pub estimator: EstimatorConfig,
    pub state: SessionState,
    pub administered_item_ids: Vec<String>,
    pub responses: Vec<ItemResponse>,
    pub ability_history: Vec<AbilityEstimate>,
    pub stall_count: u32,
    pub completion_reason: Option<CompletionReason>,
}

impl SessionSnapshot {
    /// Save the snapshot as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize snapshot")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        Ok(())
    }

    /// Load a snapshot from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot from {}", path.display()))?;
        let snapshot: SessionSnapshot =
            serde_json::from_str(&content).context("failed to parse snapshot JSON")?;
        Ok(snapshot)
    }
}
