//! The `adaptest sessions` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;

use adaptest_store::SessionStore;

pub fn execute(data_dir: Option<PathBuf>, format: String) -> Result<()> {
    let store = match data_dir {
        Some(dir) => SessionStore::new(dir),
        None => SessionStore::open_default()?,
    };

    let sessions = store.list()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No stored sessions in {}", store.data_dir().display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Session", "Learner", "State", "Items", "Updated"]);
    for session in &sessions {
        table.add_row(vec![
            session.session_id.to_string(),
            session.learner_name.clone(),
            session.state.to_string(),
            session.items_administered.to_string(),
            session.updated_at.to_rfc3339(),
        ]);
    }
    println!("{table}");

    Ok(())
}
