// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Outcome and cache formatting for CLI output

use super::commands::OutputFormat;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use partloader::{PartitionCache, ReconcileOutcome};

pub struct OutcomeFormatter;

impl OutcomeFormatter {
    /// Format the result of one invocation
    pub fn format(
        outcome: Option<&ReconcileOutcome>,
        status: &str,
        format: OutputFormat,
    ) -> String {
        match format {
            OutputFormat::Text => Self::format_outcome_text(outcome, status),
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "status": status,
                    "outcome": outcome.map(Self::outcome_kind),
                    "detail": outcome.map(|o| o.to_string()),
                });
                serde_json::to_string_pretty(&json)
                    .unwrap_or_else(|_| format!("{{\"status\": \"{}\"}}", status))
            }
        }
    }

    fn format_outcome_text(outcome: Option<&ReconcileOutcome>, status: &str) -> String {
        let detail = match outcome {
            Some(o) if o.submitted_add() => o.to_string().green().to_string(),
            Some(o @ ReconcileOutcome::LeaseHeld { .. }) => o.to_string().yellow().to_string(),
            Some(o) => o.to_string(),
            None => "invocation failed".red().to_string(),
        };
        format!("{}\n{}", detail, status.bold())
    }

    fn outcome_kind(outcome: &ReconcileOutcome) -> &'static str {
        match outcome {
            ReconcileOutcome::NotPartitioned { .. } => "not_partitioned",
            ReconcileOutcome::AlreadyRegistered { .. } => "already_registered",
            ReconcileOutcome::Registered { .. } => "registered",
            ReconcileOutcome::AlreadyExisted { .. } => "already_existed",
            ReconcileOutcome::LeaseHeld { .. } => "lease_held",
        }
    }

    /// Format the cached partition list
    pub fn format_cache(cache: &PartitionCache, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => {
                let partitions: Vec<&str> = cache.iter().collect();
                serde_json::to_string_pretty(&partitions).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Text => {
                if cache.is_empty() {
                    return format!("{}", "Partition cache is empty".yellow());
                }
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec![
                    Cell::new("#").fg(Color::Green),
                    Cell::new("partition").fg(Color::Green),
                ]);
                for (i, partition) in cache.iter().enumerate() {
                    table.add_row(vec![(i + 1).to_string(), partition.to_string()]);
                }
                format!(
                    "{}\n{}\n{} partitions",
                    "Cached Partitions".bold().green(),
                    table,
                    cache.len()
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_outcome() {
        let outcome = ReconcileOutcome::Registered {
            partition: "data/year=2024".to_string(),
        };
        let rendered = OutcomeFormatter::format(Some(&outcome), "Success", OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["status"], "Success");
        assert_eq!(value["outcome"], "registered");
    }

    #[test]
    fn test_json_cache_is_sorted() {
        let cache = PartitionCache::from_partitions(["b/x=2", "a/x=1"]);
        let rendered = OutcomeFormatter::format_cache(&cache, OutputFormat::Json);
        let value: Vec<String> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value, vec!["a/x=1", "b/x=2"]);
    }
}
