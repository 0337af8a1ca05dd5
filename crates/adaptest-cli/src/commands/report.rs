//! The `adaptest report` command and shared report rendering.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;

use adaptest_core::bank::parse_item_bank;
use adaptest_core::report::SessionReport;
use adaptest_core::session::AdaptiveSession;
use adaptest_core::snapshot::SessionSnapshot;

pub fn execute(snapshot_path: PathBuf, bank_path: PathBuf, format: String) -> Result<()> {
    let snapshot = SessionSnapshot::load_json(&snapshot_path)?;
    let bank = parse_item_bank(&bank_path)?;
    let session = AdaptiveSession::restore(snapshot, bank.items)?;
    let report = SessionReport::from_session(&session);
    render(&report, &format)
}

/// Render a report in the requested format.
pub fn render(report: &SessionReport, format: &str) -> Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        _ => {
            // table format
            let mut table = Table::new();
            table.set_header(vec!["Metric", "Value"]);
            table.add_row(vec!["Session".to_string(), report.session_id.to_string()]);
            table.add_row(vec!["Learner".to_string(), report.learner_name.clone()]);
            table.add_row(vec![
                "Theta".to_string(),
                format!("{:.3} (SE {:.3}, {})", report.final_theta, report.standard_error, report.method),
            ]);
            table.add_row(vec![
                "Accuracy".to_string(),
                format!(
                    "{}/{} ({:.1}%)",
                    report.correct_count, report.total_count, report.accuracy_percent
                ),
            ]);
            let status = if report.is_complete {
                match report.completion_reason {
                    Some(reason) => format!("complete ({reason})"),
                    None => "complete".to_string(),
                }
            } else {
                "in progress".to_string()
            };
            table.add_row(vec!["Status".to_string(), status]);
            println!("{table}");

            if !report.topic_performance.is_empty() {
                let mut topics = Table::new();
                topics.set_header(vec!["Topic", "Mean score"]);
                for (topic, mean) in &report.topic_performance {
                    topics.add_row(vec![topic.clone(), format!("{mean:.2}")]);
                }
                println!("{topics}");
            }
        }
    }
    Ok(())
}
