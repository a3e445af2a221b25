//! Per-message outcomes and the run summary

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use uuid::Uuid;

use crate::error::GmailError;
use crate::rules::ActionKind;

/// A failure isolated to one rule or one action of one message
#[derive(Debug)]
pub struct ActionFailure {
    pub rule: String,
    /// `None` when the rule's conditions could not be evaluated
    pub action: Option<ActionKind>,
    pub error: GmailError,
}

/// What happened to a single message during processing
#[derive(Debug)]
pub struct MessageOutcome {
    pub message_id: String,
    pub matched: bool,
    /// Names of rules whose own conditions matched
    pub matched_rules: Vec<String>,
    pub actions_attempted: usize,
    pub failures: Vec<ActionFailure>,
}

impl MessageOutcome {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            matched: false,
            matched_rules: Vec::new(),
            actions_attempted: 0,
            failures: Vec::new(),
        }
    }

    pub fn actions_failed(&self) -> usize {
        self.failures.iter().filter(|f| f.action.is_some()).count()
    }
}

/// Summary of one processing run over the store
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub ruleset: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub messages_evaluated: usize,
    pub messages_matched: usize,
    pub actions_attempted: usize,
    pub actions_failed: usize,
    pub outcomes: Vec<MessageOutcome>,
}

impl RunReport {
    /// Build a report from outcomes, ordering them by message ID
    pub fn from_outcomes(
        ruleset: impl Into<String>,
        dry_run: bool,
        started_at: DateTime<Utc>,
        mut outcomes: Vec<MessageOutcome>,
    ) -> Self {
        outcomes.sort_by(|a, b| a.message_id.cmp(&b.message_id));

        Self {
            run_id: Uuid::new_v4(),
            ruleset: ruleset.into(),
            dry_run,
            started_at,
            completed_at: Utc::now(),
            messages_evaluated: outcomes.len(),
            messages_matched: outcomes.iter().filter(|o| o.matched).count(),
            actions_attempted: outcomes.iter().map(|o| o.actions_attempted).sum(),
            actions_failed: outcomes.iter().map(MessageOutcome::actions_failed).sum(),
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ActionFailure)> {
        self.outcomes
            .iter()
            .flat_map(|o| o.failures.iter().map(move |f| (o.message_id.as_str(), f)))
    }

    /// Render the report as Markdown
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let duration = self.completed_at - self.started_at;

        let _ = writeln!(out, "# Rule Run Report\n");
        let _ = writeln!(out, "- **Run ID**: {}", self.run_id);
        let _ = writeln!(out, "- **Ruleset**: {}", self.ruleset);
        if self.dry_run {
            let _ = writeln!(out, "- **Mode**: dry run (no changes sent)");
        }
        let _ = writeln!(out, "- **Started**: {}", self.started_at.to_rfc3339());
        let _ = writeln!(out, "- **Duration**: {}ms\n", duration.num_milliseconds());

        let _ = writeln!(out, "## Summary\n");
        let _ = writeln!(out, "| Metric | Count |");
        let _ = writeln!(out, "|--------|-------|");
        let _ = writeln!(out, "| Messages evaluated | {} |", self.messages_evaluated);
        let _ = writeln!(out, "| Messages matched | {} |", self.messages_matched);
        let _ = writeln!(out, "| Actions attempted | {} |", self.actions_attempted);
        let _ = writeln!(out, "| Actions failed | {} |", self.actions_failed);

        let failures: Vec<_> = self.failures().collect();
        if !failures.is_empty() {
            let _ = writeln!(out, "\n## Failures\n");
            for (message_id, failure) in failures {
                let action = failure
                    .action
                    .map(|a| a.as_str())
                    .unwrap_or("evaluation");
                let _ = writeln!(
                    out,
                    "- `{}` rule '{}' ({}): {}",
                    message_id, failure.rule, action, failure.error
                );
            }
        }

        out
    }
}
