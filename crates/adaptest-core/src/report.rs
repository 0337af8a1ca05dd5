//! Session report: the read-only summary a session emits for display.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{EstimationMethod, PRIOR_STANDARD_ERROR, PRIOR_THETA};
use crate::session::{AdaptiveSession, CompletionReason};

/// Key used in `topic_performance` for items without a topic.
const UNCATEGORIZED_TOPIC: &str = "uncategorized";

/// Derived summary of a completed or in-flight session. This is the only
/// data the engine emits for downstream display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub learner_name: String,
    /// When the report was built.
    pub created_at: DateTime<Utc>,
    /// Final ability point estimate.
    pub final_theta: f64,
    /// Final standard error.
    pub standard_error: f64,
    /// Which estimation path produced the final estimate.
    pub method: EstimationMethod,
    pub correct_count: usize,
    pub total_count: usize,
    /// `correct_count / total_count * 100`; 0 when nothing was administered.
    pub accuracy_percent: f64,
    pub is_complete: bool,
    pub completion_reason: Option<CompletionReason>,
    /// Mean response score per item topic.
    pub topic_performance: BTreeMap<String, f64>,
}

impl SessionReport {
    /// Build a report from a session.
    pub fn from_session(session: &AdaptiveSession) -> Self {
        let responses = session.responses();
        let total_count = responses.len();
        let correct_count = responses.iter().filter(|r| r.is_correct).count();
        let accuracy_percent = if total_count == 0 {
            0.0
        } else {
            correct_count as f64 / total_count as f64 * 100.0
        };

        let (final_theta, standard_error, method) = match session.current_ability() {
            Some(ability) => (ability.theta, ability.standard_error, ability.method),
            None => (PRIOR_THETA, PRIOR_STANDARD_ERROR, EstimationMethod::Prior),
        };

        let mut topic_scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for response in responses {
            let topic = session
                .item_pool()
                .iter()
                .find(|item| item.id == response.item_id)
                .map(|item| item.topic.trim())
                .filter(|topic| !topic.is_empty())
                .unwrap_or(UNCATEGORIZED_TOPIC);
            topic_scores
                .entry(topic.to_string())
                .or_default()
                .push(response.score);
        }
        let topic_performance = topic_scores
            .into_iter()
            .map(|(topic, scores)| {
                let mean = scores.iter().sum::<f64>() / scores.len() as f64;
                (topic, mean)
            })
            .collect();

        Self {
            session_id: session.id(),
            learner_name: session.learner().name.clone(),
            created_at: Utc::now(),
            final_theta,
            standard_error,
            method,
            correct_count,
            total_count,
            accuracy_percent,
            is_complete: session.is_complete(),
            completion_reason: session.completion_reason(),
            topic_performance,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## Session report for {}\n\n", self.learner_name));
        md.push_str(&format!(
            "**Ability:** theta {:.3} (SE {:.3}, {})\n\n",
            self.final_theta, self.standard_error, self.method
        ));
        md.push_str(&format!(
            "**Accuracy:** {}/{} correct ({:.1}%)\n\n",
            self.correct_count, self.total_count, self.accuracy_percent
        ));
        let status = if self.is_complete {
            match self.completion_reason {
                Some(reason) => format!("complete ({reason})"),
                None => "complete".to_string(),
            }
        } else {
            "in progress".to_string()
        };
        md.push_str(&format!("**Status:** {status}\n"));

        if !self.topic_performance.is_empty() {
            md.push_str("\n### Topic performance\n\n");
            md.push_str("| Topic | Mean score |\n");
            md.push_str("|-------|------------|\n");
            for (topic, mean) in &self.topic_performance {
                md.push_str(&format!("| {topic} | {mean:.2} |\n"));
            }
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemFormat, ItemParameter, ItemTemplate, LearnerProfile};
    use crate::termination::TerminationCriteria;

    fn topical_pool() -> Vec<ItemTemplate> {
        let topics = ["dosing", "dosing", "interactions", "interactions", "", ""];
        topics
            .iter()
            .enumerate()
            .map(|(i, topic)| ItemTemplate {
                id: format!("q{i}"),
                stem: format!("stem {i}"),
                choices: vec![],
                format: ItemFormat::ShortAnswer,
                parameter: ItemParameter::with_difficulty(-1.5 + 0.5 * i as f64),
                topic: (*topic).into(),
                subtopic: String::new(),
                explanation: String::new(),
                bloom_level: "Apply".into(),
                learning_objective: String::new(),
                tags: vec![],
            })
            .collect()
    }

    fn run_session(max_items: usize) -> AdaptiveSession {
        let learner = LearnerProfile::new("Report Learner", vec![]).unwrap();
        let criteria = TerminationCriteria {
            target_standard_error: 1e-9,
            max_items,
            mastery_theta: None,
            mastery_min_items: 5,
            max_stall_count: u32::MAX,
            stall_epsilon: 1e-12,
        };
        let mut session = AdaptiveSession::new(learner, topical_pool(), Some(criteria));
        session.start().unwrap();
        let mut round = 0usize;
        while !session.is_complete() {
            let Some(next) = session.advance_to_next_item().unwrap() else {
                break;
            };
            let id = next.id.clone();
            let correct = round % 2 == 0;
            session
                .record_response(&id, correct, if correct { 1.0 } else { 0.0 }, 700, "ans")
                .unwrap();
            round += 1;
        }
        session
    }

    #[test]
    fn empty_session_reports_zero_accuracy() {
        let learner = LearnerProfile::new("Empty", vec![]).unwrap();
        let mut session = AdaptiveSession::new(learner, topical_pool(), None);
        session.start().unwrap();

        let report = SessionReport::from_session(&session);
        assert_eq!(report.total_count, 0);
        assert_eq!(report.accuracy_percent, 0.0);
        assert!(!report.is_complete);
        assert!(report.topic_performance.is_empty());
        assert_eq!(report.final_theta, -1.5);
    }

    #[test]
    fn counts_and_accuracy() {
        let session = run_session(4);
        let report = SessionReport::from_session(&session);
        assert_eq!(report.total_count, 4);
        assert_eq!(report.correct_count, 2);
        assert!((report.accuracy_percent - 50.0).abs() < 1e-9);
        assert!(report.is_complete);
        assert_eq!(
            report.completion_reason,
            Some(CompletionReason::MaxItemsReached)
        );
    }

    #[test]
    fn topic_performance_groups_by_topic() {
        let session = run_session(6);
        let report = SessionReport::from_session(&session);

        // Every administered topic shows up; blank topics fold into one key.
        let mut scores_by_topic: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for response in session.responses() {
            let topic = session
                .item_pool()
                .iter()
                .find(|i| i.id == response.item_id)
                .map(|i| {
                    if i.topic.is_empty() {
                        "uncategorized".to_string()
                    } else {
                        i.topic.clone()
                    }
                })
                .unwrap();
            scores_by_topic.entry(topic).or_default().push(response.score);
        }
        assert_eq!(report.topic_performance.len(), scores_by_topic.len());
        for (topic, scores) in scores_by_topic {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            assert!((report.topic_performance[&topic] - mean).abs() < 1e-12);
        }
    }

    #[test]
    fn json_roundtrip() {
        let report = SessionReport::from_session(&run_session(4));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        report.save_json(&path).unwrap();
        let loaded = SessionReport::load_json(&path).unwrap();
        assert_eq!(loaded.session_id, report.session_id);
        assert_eq!(loaded.total_count, report.total_count);
        assert_eq!(loaded.topic_performance, report.topic_performance);
    }

    #[test]
    fn markdown_output() {
        let report = SessionReport::from_session(&run_session(4));
        let md = report.to_markdown();
        assert!(md.contains("Report Learner"));
        assert!(md.contains("Accuracy"));
        assert!(md.contains("max items reached"));
    }
}
