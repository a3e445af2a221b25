//! Rule evaluation and action dispatch
//!
//! Conditions within a rule are ANDed; rule results are combined with the
//! ruleset's ALL/ANY combinator. Evaluation itself is pure: the only input
//! besides the ruleset and the message is `now`, taken from an injectable
//! [`Clock`] once per message.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::actions::ActionApplier;
use crate::error::Result;
use crate::models::MessageRecord;
use crate::predicate::{self, FieldValue};
use crate::report::{ActionFailure, MessageOutcome, RunReport};
use crate::rules::{Combinator, Field, Rule, Ruleset};
use crate::store::MessageStore;

/// Source of the current time for relative-date predicates
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Which rules contribute actions once a message matches the ruleset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPolicy {
    /// Every rule's actions run when the ruleset matches, whether or not that
    /// rule's own conditions held
    #[default]
    AllRules,
    /// Only rules whose own conditions held contribute actions
    MatchedRules,
}

/// Look up the value of `field` on `message`
pub fn resolve_field(message: &MessageRecord, field: Field) -> FieldValue<'_> {
    match field {
        Field::From => FieldValue::Text(&message.from),
        Field::To => FieldValue::Text(&message.to),
        Field::Subject => FieldValue::Text(&message.subject),
        Field::Message => FieldValue::Text(&message.body),
        Field::Received => FieldValue::Timestamp(message.received_date),
    }
}

/// AND over the rule's conditions, stopping at the first false.
/// An empty condition list matches.
pub fn rule_matches(rule: &Rule, message: &MessageRecord, now: DateTime<Utc>) -> Result<bool> {
    for condition in &rule.conditions {
        let value = resolve_field(message, condition.field);
        if !predicate::evaluate(condition.predicate, value, &condition.value, now)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn combine(combinator: Combinator, results: impl IntoIterator<Item = bool>) -> bool {
    let mut results = results.into_iter();
    match combinator {
        Combinator::All => results.all(|matched| matched),
        Combinator::Any => results.any(|matched| matched),
    }
}

/// Evaluate the whole ruleset against one message.
///
/// ALL over zero rules is true; ANY over zero rules is false.
pub fn evaluate(ruleset: &Ruleset, message: &MessageRecord, now: DateTime<Utc>) -> Result<bool> {
    let results = ruleset
        .rules
        .iter()
        .map(|rule| rule_matches(rule, message, now))
        .collect::<Result<Vec<_>>>()?;
    Ok(combine(ruleset.combinator, results))
}

/// Drives evaluation and action application across messages
pub struct RuleEngine {
    applier: ActionApplier,
    clock: Arc<dyn Clock>,
    policy: ActionPolicy,
}

impl RuleEngine {
    pub fn new(applier: ActionApplier, clock: Arc<dyn Clock>) -> Self {
        Self {
            applier,
            clock,
            policy: ActionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ActionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ActionPolicy {
        self.policy
    }

    /// Evaluate `ruleset` against `message` and apply actions if it matches.
    ///
    /// Never fails as a whole: a rule whose conditions cannot be evaluated
    /// counts as not matched, and action failures are recorded while later
    /// actions and rules still run.
    pub async fn process_message(&self, ruleset: &Ruleset, message: &MessageRecord) -> MessageOutcome {
        let now = self.clock.now();
        let mut outcome = MessageOutcome::new(&message.message_id);

        let mut rule_results = Vec::with_capacity(ruleset.rules.len());
        for rule in &ruleset.rules {
            let matched = match rule_matches(rule, message, now) {
                Ok(matched) => matched,
                Err(e) => {
                    warn!(
                        "Rule '{}' could not be evaluated for {}: {}",
                        rule.name, message.message_id, e
                    );
                    outcome.failures.push(ActionFailure {
                        rule: rule.name.clone(),
                        action: None,
                        error: e,
                    });
                    false
                }
            };
            if matched {
                outcome.matched_rules.push(rule.name.clone());
            }
            rule_results.push(matched);
        }

        outcome.matched = combine(ruleset.combinator, rule_results.iter().copied());
        debug!(
            "Message {} {} ruleset '{}'",
            message.message_id,
            if outcome.matched { "matched" } else { "did not match" },
            ruleset.name
        );

        if !outcome.matched {
            return outcome;
        }

        for (rule, matched) in ruleset.rules.iter().zip(rule_results) {
            if self.policy == ActionPolicy::MatchedRules && !matched {
                continue;
            }

            for action in &rule.actions {
                outcome.actions_attempted += 1;
                if let Err(e) = self.applier.apply(action, &message.message_id).await {
                    warn!(
                        "Action {} from rule '{}' failed for {}: {}",
                        action.kind, rule.name, message.message_id, e
                    );
                    outcome.failures.push(ActionFailure {
                        rule: rule.name.clone(),
                        action: Some(action.kind),
                        error: e,
                    });
                }
            }
        }

        outcome
    }

    /// Process every stored message with at most `concurrency` in flight.
    ///
    /// Fails only when the store cannot be read.
    pub async fn process_store(
        &self,
        store: &dyn MessageStore,
        ruleset: Arc<Ruleset>,
        concurrency: usize,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let messages = store.all().await?;

        info!(
            "Evaluating ruleset '{}' ({} rules, {:?}) against {} messages",
            ruleset.name,
            ruleset.rules.len(),
            ruleset.combinator,
            messages.len()
        );

        let outcomes: Vec<MessageOutcome> = stream::iter(messages)
            .map(|message| {
                let ruleset = Arc::clone(&ruleset);
                async move { self.process_message(&ruleset, &message).await }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let report = RunReport::from_outcomes(
            ruleset.name.clone(),
            self.applier.is_dry_run(),
            started_at,
            outcomes,
        );

        info!(
            "Run {} complete: {}/{} messages matched, {} actions attempted, {} failed",
            report.run_id,
            report.messages_matched,
            report.messages_evaluated,
            report.actions_attempted,
            report.actions_failed
        );

        Ok(report)
    }
}
