//! TOML item bank parser.
//!
//! Loads item banks from TOML files and directories, and validates them.
//! The engine assumes a fixed, pre-validated bank: validation here reports
//! warnings for authors, it does not silently repair items.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{ItemFormat, ItemTemplate};

/// A named collection of calibrated items.
#[derive(Debug, Clone)]
pub struct ItemBank {
    /// Unique identifier for this bank.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description of this bank.
    pub description: String,
    /// The items in this bank, in authored order.
    pub items: Vec<ItemTemplate>,
}

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    item_bank: TomlBankHeader,
    #[serde(default)]
    items: Vec<ItemTemplate>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

/// Parse a single TOML file into an `ItemBank`.
pub fn parse_item_bank(path: &Path) -> Result<ItemBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read item bank file: {}", path.display()))?;

    parse_item_bank_str(&content, path)
}

/// Parse a TOML string into an `ItemBank` (useful for testing).
pub fn parse_item_bank_str(content: &str, source_path: &Path) -> Result<ItemBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    Ok(ItemBank {
        id: parsed.item_bank.id,
        name: parsed.item_bank.name,
        description: parsed.item_bank.description,
        items: parsed.items,
    })
}

/// Recursively load all `.toml` bank files from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<ItemBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_item_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// A warning from item bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The item ID (if applicable).
    pub item_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate an item bank for common authoring issues.
pub fn validate_item_bank(bank: &ItemBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    // Check for duplicate item IDs
    let mut seen_ids = std::collections::HashSet::new();
    for item in &bank.items {
        if !seen_ids.insert(&item.id) {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: format!("duplicate item ID: {}", item.id),
            });
        }
    }

    for item in &bank.items {
        if item.stem.trim().is_empty() {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: "stem is empty".into(),
            });
        }

        if item.parameter.discrimination <= 0.0 {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: format!(
                    "discrimination must be positive, got {}",
                    item.parameter.discrimination
                ),
            });
        }

        if !(0.0..1.0).contains(&item.parameter.guessing) {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: format!(
                    "guessing must be in [0, 1), got {}",
                    item.parameter.guessing
                ),
            });
        }

        if item.format == ItemFormat::MultipleChoice {
            if item.choices.is_empty() {
                warnings.push(ValidationWarning {
                    item_id: Some(item.id.clone()),
                    message: "multiple-choice item has no choices".into(),
                });
            } else if !item.choices.iter().any(|choice| choice.is_correct) {
                warnings.push(ValidationWarning {
                    item_id: Some(item.id.clone()),
                    message: "multiple-choice item has no correct choice".into(),
                });
            }
        }
    }

    if bank.items.is_empty() {
        warnings.push(ValidationWarning {
            item_id: None,
            message: "bank contains no items".into(),
        });
    }

    warnings
}

/// Items matching a topic, for caller-side pool pre-filtering.
/// Matching is case-insensitive on the `topic` field.
pub fn filter_by_topic(bank: &ItemBank, topic: &str) -> Vec<ItemTemplate> {
    bank.items
        .iter()
        .filter(|item| item.topic.eq_ignore_ascii_case(topic))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[item_bank]
id = "pharm-101"
name = "Pharmacology Basics"
description = "Introductory pharmacology item bank"

[[items]]
id = "warfarin-inr"
stem = "Which lab value is used to monitor warfarin therapy?"
format = "multiple_choice"
topic = "anticoagulation"
explanation = "INR reflects the extrinsic clotting pathway."

[items.parameter]
difficulty = -0.5
discrimination = 1.2
guessing = 0.25

[[items.choices]]
text = "INR"
is_correct = true

[[items.choices]]
text = "A1C"

[[items]]
id = "ace-cough"
stem = "Explain the mechanism behind ACE inhibitor cough."
format = "mechanistic_explanation"
topic = "cardiology"

[items.parameter]
difficulty = 0.8
"#;

    #[test]
    fn parse_valid_toml() {
        let bank = parse_item_bank_str(VALID_TOML, &PathBuf::from("bank.toml")).unwrap();
        assert_eq!(bank.id, "pharm-101");
        assert_eq!(bank.name, "Pharmacology Basics");
        assert_eq!(bank.items.len(), 2);
        assert_eq!(bank.items[0].id, "warfarin-inr");
        assert_eq!(bank.items[0].format, ItemFormat::MultipleChoice);
        assert_eq!(bank.items[0].parameter.guessing, 0.25);
        assert_eq!(bank.items[0].choices.len(), 2);
        assert!(bank.items[0].choices[0].is_correct);
        assert!(!bank.items[0].choices[1].is_correct);
    }

    #[test]
    fn parse_applies_parameter_defaults() {
        let bank = parse_item_bank_str(VALID_TOML, &PathBuf::from("bank.toml")).unwrap();
        let ace = &bank.items[1];
        assert_eq!(ace.parameter.difficulty, 0.8);
        assert_eq!(ace.parameter.discrimination, 1.0);
        assert_eq!(ace.parameter.guessing, 0.2);
        assert_eq!(ace.bloom_level, "Apply");
    }

    #[test]
    fn validate_clean_bank_has_no_warnings() {
        let bank = parse_item_bank_str(VALID_TOML, &PathBuf::from("bank.toml")).unwrap();
        assert!(validate_item_bank(&bank).is_empty());
    }

    #[test]
    fn validate_duplicate_ids() {
        let toml = r#"
[item_bank]
id = "dupes"
name = "Dupes"

[[items]]
id = "same"
stem = "First"
format = "short_answer"
[items.parameter]
difficulty = 0.0

[[items]]
id = "same"
stem = "Second"
format = "short_answer"
[items.parameter]
difficulty = 0.5
"#;
        let bank = parse_item_bank_str(toml, &PathBuf::from("bank.toml")).unwrap();
        let warnings = validate_item_bank(&bank);
        assert!(warnings.iter().any(|w| w.message.contains("duplicate")));
    }

    #[test]
    fn validate_bad_parameters_and_choices() {
        let toml = r#"
[item_bank]
id = "bad"
name = "Bad"

[[items]]
id = "negative-a"
stem = "stem"
format = "short_answer"
[items.parameter]
difficulty = 0.0
discrimination = -1.0

[[items]]
id = "guessing-too-high"
stem = "stem"
format = "short_answer"
[items.parameter]
difficulty = 0.0
guessing = 1.0

[[items]]
id = "no-key"
stem = "stem"
format = "multiple_choice"
[items.parameter]
difficulty = 0.0
[[items.choices]]
text = "wrong"
"#;
        let bank = parse_item_bank_str(toml, &PathBuf::from("bank.toml")).unwrap();
        let warnings = validate_item_bank(&bank);
        assert!(warnings.iter().any(|w| w.message.contains("discrimination")));
        assert!(warnings.iter().any(|w| w.message.contains("guessing")));
        assert!(warnings.iter().any(|w| w.message.contains("no correct choice")));
    }

    #[test]
    fn validate_empty_bank() {
        let toml = r#"
[item_bank]
id = "empty"
name = "Empty"
"#;
        let bank = parse_item_bank_str(toml, &PathBuf::from("bank.toml")).unwrap();
        let warnings = validate_item_bank(&bank);
        assert!(warnings.iter().any(|w| w.message.contains("no items")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_item_bank_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn filter_by_topic_is_case_insensitive() {
        let bank = parse_item_bank_str(VALID_TOML, &PathBuf::from("bank.toml")).unwrap();
        let filtered = filter_by_topic(&bank, "Anticoagulation");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "warfarin-inr");
        assert!(filter_by_topic(&bank, "neurology").is_empty());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("bank.toml");
        std::fs::write(&file_path, VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not toml [").unwrap();

        let banks = load_bank_directory(dir.path()).unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].id, "pharm-101");
    }
}
