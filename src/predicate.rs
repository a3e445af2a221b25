//! Predicate evaluation for string and relative-date conditions

use chrono::{DateTime, Utc};

use crate::error::{GmailError, Result};
use crate::rules::{ConditionValue, DatePredicate, Predicate, RelativeDate, StringPredicate};

/// A resolved message field, typed by family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Timestamp(DateTime<Utc>),
}

impl FieldValue<'_> {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Timestamp(_) => "timestamp",
        }
    }
}

/// Case-insensitive string comparison
pub fn string_predicate(predicate: StringPredicate, haystack: &str, needle: &str) -> bool {
    let haystack = haystack.to_lowercase();
    let needle = needle.to_lowercase();

    match predicate {
        StringPredicate::Contains => haystack.contains(&needle),
        StringPredicate::DoesNotContain => !haystack.contains(&needle),
        StringPredicate::Equals => haystack == needle,
        StringPredicate::DoesNotEqual => haystack != needle,
    }
}

/// Compare `message_date` against `now - window`.
///
/// Months count as 30 days each. Both comparisons are strict, so a message
/// received exactly at the reference instant matches neither predicate. A
/// window reaching past the earliest representable instant puts the
/// reference before every message.
pub fn date_predicate(
    predicate: DatePredicate,
    message_date: DateTime<Utc>,
    window: RelativeDate,
    now: DateTime<Utc>,
) -> bool {
    let reference = window
        .to_duration()
        .and_then(|duration| now.checked_sub_signed(duration));

    match (predicate, reference) {
        (DatePredicate::LessThan, Some(reference)) => message_date > reference,
        (DatePredicate::GreaterThan, Some(reference)) => message_date < reference,
        (DatePredicate::LessThan, None) => true,
        (DatePredicate::GreaterThan, None) => false,
    }
}

/// Apply `predicate` to a resolved field value and the condition's target.
///
/// Fails with `TypeMismatch` when the value shape does not fit the predicate
/// family. The loader rejects such conditions, so this only fires for
/// hand-built rulesets.
pub fn evaluate(
    predicate: Predicate,
    value: FieldValue<'_>,
    target: &ConditionValue,
    now: DateTime<Utc>,
) -> Result<bool> {
    match (predicate, value, target) {
        (Predicate::String(p), FieldValue::Text(haystack), ConditionValue::Text(needle)) => {
            Ok(string_predicate(p, haystack, needle))
        }
        (Predicate::Date(p), FieldValue::Timestamp(date), ConditionValue::Relative(window)) => {
            Ok(date_predicate(p, date, *window, now))
        }
        (Predicate::String(_), FieldValue::Text(_), ConditionValue::Relative(_))
        | (Predicate::Date(_), FieldValue::Timestamp(_), ConditionValue::Text(_)) => {
            Err(GmailError::TypeMismatch {
                predicate: predicate.to_string(),
                found: match target {
                    ConditionValue::Text(_) => "text target",
                    ConditionValue::Relative(_) => "relative-date target",
                },
            })
        }
        (_, value, _) => Err(GmailError::TypeMismatch {
            predicate: predicate.to_string(),
            found: value.kind(),
        }),
    }
}
