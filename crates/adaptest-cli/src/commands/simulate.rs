//! The `adaptest simulate` command.
//!
//! Drives a full adaptive session against an item bank with a synthetic
//! learner of known true theta: each administered item is answered correctly
//! with probability `probability_correct(item, true_theta)`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use adaptest_core::bank::{filter_by_topic, parse_item_bank};
use adaptest_core::irt::probability_correct;
use adaptest_core::model::LearnerProfile;
use adaptest_core::report::SessionReport;
use adaptest_core::session::AdaptiveSession;
use adaptest_core::termination::TerminationCriteria;
use adaptest_store::SessionStore;

#[allow(clippy::too_many_arguments)]
pub fn execute(
    bank_path: PathBuf,
    true_theta: f64,
    seed: Option<u64>,
    topic: Option<String>,
    learner_name: String,
    max_items: Option<usize>,
    target_se: Option<f64>,
    format: String,
    output: Option<PathBuf>,
    save_snapshot: Option<PathBuf>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let bank = parse_item_bank(&bank_path)?;
    let pool = match &topic {
        Some(topic) => filter_by_topic(&bank, topic),
        None => bank.items.clone(),
    };
    if let Some(topic) = &topic {
        anyhow::ensure!(
            !pool.is_empty(),
            "bank '{}' has no items for topic '{topic}'",
            bank.name
        );
    }

    let mut criteria = TerminationCriteria::default();
    if let Some(max_items) = max_items {
        criteria.max_items = max_items;
    }
    if let Some(target_se) = target_se {
        criteria.target_standard_error = target_se;
    }

    let learner = LearnerProfile::new(&learner_name, vec![])?;
    let mut session = AdaptiveSession::new(learner, pool, Some(criteria));
    session.start()?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    while !session.is_complete() {
        let Some(next) = session.advance_to_next_item()? else {
            break;
        };
        let item_id = next.id.clone();
        let p = probability_correct(&next.parameter, true_theta);

        let is_correct = rng.gen::<f64>() < p;
        let response_time_ms = rng.gen_range(800..6000);
        session.record_response(
            &item_id,
            is_correct,
            if is_correct { 1.0 } else { 0.0 },
            response_time_ms,
            if is_correct { "simulated correct" } else { "simulated incorrect" },
        )?;
    }

    tracing::info!(
        items = session.responses().len(),
        reason = ?session.completion_reason(),
        "simulation finished"
    );

    let report = SessionReport::from_session(&session);
    super::report::render(&report, &format)?;

    if let Some(path) = output {
        report
            .save_json(&path)
            .with_context(|| format!("failed to save report to {}", path.display()))?;
        println!("Report saved to {}", path.display());
    }
    if let Some(path) = save_snapshot {
        session
            .snapshot()
            .save_json(&path)
            .with_context(|| format!("failed to save snapshot to {}", path.display()))?;
        println!("Snapshot saved to {}", path.display());
    }
    if let Some(dir) = data_dir {
        let store = SessionStore::new(dir);
        let path = store.save(&session.snapshot())?;
        println!("Snapshot stored at {}", path.display());
    }

    Ok(())
}
