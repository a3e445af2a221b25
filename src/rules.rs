//! Ruleset model and loader
//!
//! A ruleset document is JSON of the form:
//!
//! ```json
//! {
//!   "name": "Inbox cleanup",
//!   "predicate": "any",
//!   "rules": [
//!     {
//!       "name": "invoices",
//!       "conditions": [
//!         {"field": "subject", "predicate": "contains", "value": "invoice"},
//!         {"field": "received", "predicate": "less_than", "value": {"value": 7, "unit": "days"}}
//!       ],
//!       "actions": [
//!         {"action": "mark_as_read"},
//!         {"action": "move_message", "parameters": {"destination": "Finance"}}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Loading walks the document by hand rather than through `#[derive(Deserialize)]`
//! so every failure carries the path of the offending node
//! (e.g. `rules[0].conditions[1].predicate`).

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{GmailError, Result};

/// Message fields a condition can test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    From,
    To,
    Subject,
    /// Plain-text message body
    Message,
    /// Date the message was received
    Received,
}

/// Which predicate family a field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFamily {
    Text,
    Date,
}

impl Field {
    pub fn family(&self) -> FieldFamily {
        match self {
            Field::From | Field::To | Field::Subject | Field::Message => FieldFamily::Text,
            Field::Received => FieldFamily::Date,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::From => "from",
            Field::To => "to",
            Field::Subject => "subject",
            Field::Message => "message",
            Field::Received => "received",
        }
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "from" => Ok(Field::From),
            "to" => Ok(Field::To),
            "subject" => Ok(Field::Subject),
            "message" | "body" | "message_body" => Ok(Field::Message),
            "received" | "received_date" => Ok(Field::Received),
            other => Err(format!(
                "unknown field '{}'; expected one of from, to, subject, message, received",
                other
            )),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive string comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringPredicate {
    Contains,
    DoesNotContain,
    Equals,
    DoesNotEqual,
}

/// Relative-date comparisons against "now minus N units"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePredicate {
    /// Received more recently than N units ago
    LessThan,
    /// Received longer ago than N units
    GreaterThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    String(StringPredicate),
    Date(DatePredicate),
}

impl Predicate {
    pub fn family(&self) -> FieldFamily {
        match self {
            Predicate::String(_) => FieldFamily::Text,
            Predicate::Date(_) => FieldFamily::Date,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::String(StringPredicate::Contains) => "contains",
            Predicate::String(StringPredicate::DoesNotContain) => "does_not_contain",
            Predicate::String(StringPredicate::Equals) => "equals",
            Predicate::String(StringPredicate::DoesNotEqual) => "does_not_equal",
            Predicate::Date(DatePredicate::LessThan) => "less_than",
            Predicate::Date(DatePredicate::GreaterThan) => "greater_than",
        }
    }
}

impl FromStr for Predicate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "contains" => Ok(Predicate::String(StringPredicate::Contains)),
            "does_not_contain" | "not_contains" => {
                Ok(Predicate::String(StringPredicate::DoesNotContain))
            }
            "equals" => Ok(Predicate::String(StringPredicate::Equals)),
            "does_not_equal" | "not_equals" => Ok(Predicate::String(StringPredicate::DoesNotEqual)),
            "less_than" => Ok(Predicate::Date(DatePredicate::LessThan)),
            "greater_than" => Ok(Predicate::Date(DatePredicate::GreaterThan)),
            other => Err(format!("unknown predicate '{}'", other)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Days,
    /// Approximated as 30 days
    Months,
}

impl TimeUnit {
    /// Number of days one unit spans
    pub fn days(&self) -> i64 {
        match self {
            TimeUnit::Days => 1,
            TimeUnit::Months => 30,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "days" | "day" => Ok(TimeUnit::Days),
            "months" | "month" => Ok(TimeUnit::Months),
            other => Err(format!("unknown unit '{}'; expected days or months", other)),
        }
    }
}

/// Longest relative window a ruleset may declare (roughly 1000 years)
pub const MAX_WINDOW_DAYS: i64 = 365_000;

/// `amount` units before the evaluation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelativeDate {
    pub amount: i64,
    pub unit: TimeUnit,
}

impl RelativeDate {
    pub fn days(amount: i64) -> Self {
        Self {
            amount,
            unit: TimeUnit::Days,
        }
    }

    pub fn months(amount: i64) -> Self {
        Self {
            amount,
            unit: TimeUnit::Months,
        }
    }

    /// Window length in days, or `None` if it overflows `i64`
    pub fn span_days(&self) -> Option<i64> {
        self.amount.checked_mul(self.unit.days())
    }

    /// Window as a duration, or `None` when it is out of range for chrono
    pub fn to_duration(&self) -> Option<chrono::Duration> {
        self.span_days().and_then(chrono::Duration::try_days)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConditionValue {
    Text(String),
    Relative(RelativeDate),
}

impl ConditionValue {
    fn family(&self) -> FieldFamily {
        match self {
            ConditionValue::Text(_) => FieldFamily::Text,
            ConditionValue::Relative(_) => FieldFamily::Date,
        }
    }
}

/// A single predicate test against one message field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub field: Field,
    pub predicate: Predicate,
    pub value: ConditionValue,
}

impl Condition {
    /// Build a condition, rejecting predicate or value families that do not
    /// fit the field.
    pub fn new(field: Field, predicate: Predicate, value: ConditionValue) -> Result<Self> {
        if predicate.family() != field.family() {
            return Err(GmailError::validation(
                "predicate",
                format!("predicate '{}' cannot be used with field '{}'", predicate, field),
            ));
        }
        if value.family() != field.family() {
            let expected = match field.family() {
                FieldFamily::Text => "a string",
                FieldFamily::Date => "an object {\"value\": <integer>, \"unit\": \"days\"|\"months\"}",
            };
            return Err(GmailError::validation(
                "value",
                format!("field '{}' requires {}", field, expected),
            ));
        }
        Ok(Self {
            field,
            predicate,
            value,
        })
    }

    pub fn text(field: Field, predicate: StringPredicate, value: impl Into<String>) -> Result<Self> {
        Self::new(field, Predicate::String(predicate), ConditionValue::Text(value.into()))
    }

    pub fn received(predicate: DatePredicate, value: RelativeDate) -> Result<Self> {
        Self::new(Field::Received, Predicate::Date(predicate), ConditionValue::Relative(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    MarkRead,
    MarkUnread,
    MoveMessage,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::MarkRead => "mark_as_read",
            ActionKind::MarkUnread => "mark_as_unread",
            ActionKind::MoveMessage => "move_message",
        }
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mark_as_read" | "mark_read" => Ok(ActionKind::MarkRead),
            "mark_as_unread" | "mark_unread" => Ok(ActionKind::MarkUnread),
            "move_message" => Ok(ActionKind::MoveMessage),
            other => Err(format!(
                "unknown action '{}'; expected mark_as_read, mark_as_unread or move_message",
                other
            )),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter naming the target label of `move_message`
pub const DESTINATION_PARAM: &str = "destination";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAction {
    pub kind: ActionKind,
    pub parameters: BTreeMap<String, String>,
}

impl RuleAction {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            parameters: BTreeMap::new(),
        }
    }

    pub fn move_to(destination: impl Into<String>) -> Self {
        Self::new(ActionKind::MoveMessage).with_parameter(DESTINATION_PARAM, destination)
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn destination(&self) -> Option<&str> {
        self.parameters.get(DESTINATION_PARAM).map(String::as_str)
    }
}

/// Named AND-group of conditions with the actions it triggers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub actions: Vec<RuleAction>,
}

/// How rule results are combined across a ruleset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    All,
    Any,
}

impl FromStr for Combinator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Combinator::All),
            "any" => Ok(Combinator::Any),
            other => Err(format!("unknown predicate '{}'; expected all or any", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruleset {
    pub name: String,
    pub combinator: Combinator,
    pub rules: Vec<Rule>,
}

impl Ruleset {
    /// Load and validate a ruleset document from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            GmailError::ConfigError(format!("Failed to read ruleset file {:?}: {}", path, e))
        })?;

        let ruleset = Self::from_json(&content)?;
        info!(
            "Loaded ruleset '{}' with {} rules from {:?}",
            ruleset.name,
            ruleset.rules.len(),
            path
        );
        Ok(ruleset)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| GmailError::validation("$", format!("invalid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let ruleset = parse_ruleset(value)?;

        if ruleset.rules.is_empty() {
            warn!("Ruleset '{}' has no rules", ruleset.name);
        }
        for (index, rule) in ruleset.rules.iter().enumerate() {
            for action in &rule.actions {
                if action.kind == ActionKind::MoveMessage && action.destination().is_none() {
                    warn!(
                        "rules[{}] '{}': move_message has no destination and will fail when applied",
                        index, rule.name
                    );
                }
            }
        }

        Ok(ruleset)
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| GmailError::validation(path, format!("expected an object, found {}", kind_of(value))))
}

fn reject_unknown_keys(object: &Map<String, Value>, allowed: &[&str], path: &str) -> Result<()> {
    for key in object.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(GmailError::validation(
                join(path, key),
                "unknown field",
            ));
        }
    }
    Ok(())
}

fn required<'a>(object: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value> {
    match object.get(key) {
        Some(Value::Null) | None => Err(GmailError::validation(join(path, key), "missing required field")),
        Some(value) => Ok(value),
    }
}

fn required_str<'a>(object: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a str> {
    let value = required(object, key, path)?;
    value.as_str().ok_or_else(|| {
        GmailError::validation(join(path, key), format!("expected a string, found {}", kind_of(value)))
    })
}

fn required_array<'a>(object: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Vec<Value>> {
    let value = required(object, key, path)?;
    value.as_array().ok_or_else(|| {
        GmailError::validation(join(path, key), format!("expected an array, found {}", kind_of(value)))
    })
}

fn parse_tag<T: FromStr<Err = String>>(object: &Map<String, Value>, key: &str, path: &str) -> Result<T> {
    required_str(object, key, path)?
        .parse()
        .map_err(|message| GmailError::validation(join(path, key), message))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_ruleset(value: &Value) -> Result<Ruleset> {
    let object = as_object(value, "$")?;
    reject_unknown_keys(object, &["name", "predicate", "rules"], "")?;

    let name = required_str(object, "name", "")?.to_string();
    let combinator = parse_tag(object, "predicate", "")?;
    let rules = required_array(object, "rules", "")?
        .iter()
        .enumerate()
        .map(|(index, rule)| parse_rule(rule, &format!("rules[{}]", index)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Ruleset {
        name,
        combinator,
        rules,
    })
}

fn parse_rule(value: &Value, path: &str) -> Result<Rule> {
    let object = as_object(value, path)?;
    reject_unknown_keys(object, &["name", "conditions", "actions"], path)?;

    let name = required_str(object, "name", path)?.to_string();
    let conditions = required_array(object, "conditions", path)?
        .iter()
        .enumerate()
        .map(|(index, condition)| {
            parse_condition(condition, &format!("{}.conditions[{}]", path, index))
        })
        .collect::<Result<Vec<_>>>()?;
    let actions = required_array(object, "actions", path)?
        .iter()
        .enumerate()
        .map(|(index, action)| parse_action(action, &format!("{}.actions[{}]", path, index)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Rule {
        name,
        conditions,
        actions,
    })
}

fn parse_condition(value: &Value, path: &str) -> Result<Condition> {
    let object = as_object(value, path)?;
    reject_unknown_keys(object, &["field", "predicate", "value"], path)?;

    let field: Field = parse_tag(object, "field", path)?;
    let predicate: Predicate = parse_tag(object, "predicate", path)?;
    if predicate.family() != field.family() {
        return Err(GmailError::validation(
            join(path, "predicate"),
            format!("predicate '{}' cannot be used with field '{}'", predicate, field),
        ));
    }

    let value_path = join(path, "value");
    let raw_value = required(object, "value", path)?;
    let condition_value = match field.family() {
        FieldFamily::Text => match raw_value {
            Value::String(s) => ConditionValue::Text(s.clone()),
            other => {
                return Err(GmailError::validation(
                    value_path,
                    format!("field '{}' requires a string, found {}", field, kind_of(other)),
                ))
            }
        },
        FieldFamily::Date => ConditionValue::Relative(parse_relative_date(raw_value, &value_path)?),
    };

    Condition::new(field, predicate, condition_value).map_err(|e| match e {
        GmailError::ValidationError { path: sub, message } => {
            GmailError::validation(join(path, &sub), message)
        }
        other => other,
    })
}

fn parse_relative_date(value: &Value, path: &str) -> Result<RelativeDate> {
    let object = as_object(value, path)?;
    reject_unknown_keys(object, &["value", "amount", "unit"], path)?;

    let key = if object.contains_key("amount") { "amount" } else { "value" };
    let raw_amount = required(object, key, path)?;
    let amount = raw_amount.as_i64().ok_or_else(|| {
        GmailError::validation(join(path, key), format!("expected an integer, found {}", kind_of(raw_amount)))
    })?;
    if amount < 0 {
        return Err(GmailError::validation(join(path, key), "must not be negative"));
    }

    let unit = parse_tag(object, "unit", path)?;
    let window = RelativeDate { amount, unit };
    match window.span_days() {
        Some(days) if days <= MAX_WINDOW_DAYS => Ok(window),
        _ => Err(GmailError::validation(
            join(path, key),
            format!("window cannot exceed {} days", MAX_WINDOW_DAYS),
        )),
    }
}

fn parse_action(value: &Value, path: &str) -> Result<RuleAction> {
    let object = as_object(value, path)?;
    reject_unknown_keys(object, &["action", "parameters"], path)?;

    let kind = parse_tag(object, "action", path)?;
    let mut parameters = BTreeMap::new();

    match object.get("parameters") {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (key, value) in map {
                let text = value.as_str().ok_or_else(|| {
                    GmailError::validation(
                        format!("{}.parameters.{}", path, key),
                        format!("expected a string, found {}", kind_of(value)),
                    )
                })?;
                parameters.insert(key.clone(), text.to_string());
            }
        }
        Some(other) => {
            return Err(GmailError::validation(
                join(path, "parameters"),
                format!("expected an object, found {}", kind_of(other)),
            ))
        }
    }

    Ok(RuleAction { kind, parameters })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_path(result: Result<Ruleset>) -> String {
        match result {
            Err(GmailError::ValidationError { path, .. }) => path,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_full_document() {
        let json = r#"{
            "name": "Inbox cleanup",
            "predicate": "any",
            "rules": [
                {
                    "name": "invoices",
                    "conditions": [
                        {"field": "subject", "predicate": "contains", "value": "invoice"},
                        {"field": "received", "predicate": "less_than", "value": {"value": 7, "unit": "days"}}
                    ],
                    "actions": [
                        {"action": "mark_as_read"},
                        {"action": "move_message", "parameters": {"destination": "Finance"}}
                    ]
                }
            ]
        }"#;

        let ruleset = Ruleset::from_json(json).unwrap();
        assert_eq!(ruleset.name, "Inbox cleanup");
        assert_eq!(ruleset.combinator, Combinator::Any);
        assert_eq!(ruleset.rules.len(), 1);

        let rule = &ruleset.rules[0];
        assert_eq!(rule.conditions[0].field, Field::Subject);
        assert_eq!(
            rule.conditions[1].value,
            ConditionValue::Relative(RelativeDate::days(7))
        );
        assert_eq!(rule.actions[0].kind, ActionKind::MarkRead);
        assert_eq!(rule.actions[1].destination(), Some("Finance"));
    }

    #[test]
    fn test_aliases_are_accepted() {
        let json = r#"{
            "name": "aliases",
            "predicate": "ALL",
            "rules": [{
                "name": "r",
                "conditions": [
                    {"field": "body", "predicate": "not_contains", "value": "spam"},
                    {"field": "received_date", "predicate": "greater_than", "value": {"amount": 2, "unit": "months"}}
                ],
                "actions": [{"action": "mark_as_unread", "parameters": null}]
            }]
        }"#;

        let ruleset = Ruleset::from_json(json).unwrap();
        let rule = &ruleset.rules[0];
        assert_eq!(ruleset.combinator, Combinator::All);
        assert_eq!(rule.conditions[0].field, Field::Message);
        assert_eq!(
            rule.conditions[0].predicate,
            Predicate::String(StringPredicate::DoesNotContain)
        );
        assert_eq!(
            rule.conditions[1].value,
            ConditionValue::Relative(RelativeDate::months(2))
        );
        assert!(rule.actions[0].parameters.is_empty());
    }

    #[test]
    fn test_unknown_predicate_reports_path() {
        let json = r#"{
            "name": "bad",
            "predicate": "any",
            "rules": [
                {"name": "ok", "conditions": [], "actions": []},
                {"name": "bad", "conditions": [
                    {"field": "from", "predicate": "contains", "value": "a"},
                    {"field": "from", "predicate": "sorta", "value": "b"}
                ], "actions": []}
            ]
        }"#;

        assert_eq!(
            validation_path(Ruleset::from_json(json)),
            "rules[1].conditions[1].predicate"
        );
    }

    #[test]
    fn test_date_predicate_on_string_field_is_rejected() {
        let json = r#"{
            "name": "mismatch",
            "predicate": "all",
            "rules": [{"name": "r", "conditions": [
                {"field": "subject", "predicate": "less_than", "value": {"value": 1, "unit": "days"}}
            ], "actions": []}]
        }"#;

        assert_eq!(
            validation_path(Ruleset::from_json(json)),
            "rules[0].conditions[0].predicate"
        );
    }

    #[test]
    fn test_string_value_on_date_field_is_rejected() {
        let json = r#"{
            "name": "mismatch",
            "predicate": "all",
            "rules": [{"name": "r", "conditions": [
                {"field": "received", "predicate": "less_than", "value": "yesterday"}
            ], "actions": []}]
        }"#;

        assert_eq!(
            validation_path(Ruleset::from_json(json)),
            "rules[0].conditions[0].value"
        );
    }

    #[test]
    fn test_missing_required_fields() {
        assert_eq!(
            validation_path(Ruleset::from_json(r#"{"name": "x", "rules": []}"#)),
            "predicate"
        );
        assert_eq!(
            validation_path(Ruleset::from_json(
                r#"{"name": "x", "predicate": "any", "rules": [{"name": "r", "conditions": []}]}"#
            )),
            "rules[0].actions"
        );
    }

    #[test]
    fn test_unknown_keys_and_actions_are_rejected() {
        assert_eq!(
            validation_path(Ruleset::from_json(
                r#"{"name": "x", "predicate": "any", "rules": [], "extra": 1}"#
            )),
            "extra"
        );
        assert_eq!(
            validation_path(Ruleset::from_json(
                r#"{"name": "x", "predicate": "any", "rules": [
                    {"name": "r", "conditions": [], "actions": [{"action": "delete"}]}
                ]}"#
            )),
            "rules[0].actions[0].action"
        );
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let json = r#"{
            "name": "neg",
            "predicate": "all",
            "rules": [{"name": "r", "conditions": [
                {"field": "received", "predicate": "greater_than", "value": {"value": -3, "unit": "days"}}
            ], "actions": []}]
        }"#;

        assert_eq!(
            validation_path(Ruleset::from_json(json)),
            "rules[0].conditions[0].value.value"
        );
    }

    #[test]
    fn test_huge_amount_is_rejected() {
        for (amount, unit) in [
            ("1000000000", "days"),
            ("9223372036854775807", "days"),
            ("40000000", "months"),
            ("9223372036854775807", "months"),
        ] {
            let json = format!(
                r#"{{"name": "huge", "predicate": "all", "rules": [{{"name": "r", "conditions": [
                    {{"field": "received", "predicate": "less_than", "value": {{"value": {}, "unit": "{}"}}}}
                ], "actions": []}}]}}"#,
                amount, unit
            );

            assert_eq!(
                validation_path(Ruleset::from_json(&json)),
                "rules[0].conditions[0].value.value"
            );
        }
    }

    #[test]
    fn test_window_at_limit_loads() {
        let json = format!(
            r#"{{"name": "edge", "predicate": "all", "rules": [{{"name": "r", "conditions": [
                {{"field": "received", "predicate": "greater_than", "value": {{"value": {}, "unit": "days"}}}}
            ], "actions": []}}]}}"#,
            MAX_WINDOW_DAYS
        );

        assert!(Ruleset::from_json(&json).is_ok());
    }

    #[test]
    fn test_invalid_json_is_a_validation_error() {
        assert_eq!(validation_path(Ruleset::from_json("{not json")), "$");
    }

    #[test]
    fn test_move_without_destination_still_loads() {
        let json = r#"{
            "name": "lenient",
            "predicate": "any",
            "rules": [{"name": "r", "conditions": [], "actions": [{"action": "move_message"}]}]
        }"#;

        let ruleset = Ruleset::from_json(json).unwrap();
        assert_eq!(ruleset.rules[0].actions[0].destination(), None);
    }

    #[test]
    fn test_condition_new_enforces_families() {
        assert!(Condition::text(Field::From, StringPredicate::Equals, "a@b.c").is_ok());
        assert!(Condition::received(DatePredicate::LessThan, RelativeDate::days(1)).is_ok());
        assert!(Condition::new(
            Field::Subject,
            Predicate::Date(DatePredicate::LessThan),
            ConditionValue::Text("x".to_string())
        )
        .is_err());
        assert!(Condition::new(
            Field::Received,
            Predicate::Date(DatePredicate::LessThan),
            ConditionValue::Text("x".to_string())
        )
        .is_err());
    }

    #[test]
    fn test_month_is_thirty_days() {
        assert_eq!(RelativeDate::months(1).to_duration(), Some(chrono::Duration::days(30)));
        assert_eq!(RelativeDate::months(3).to_duration(), Some(chrono::Duration::days(90)));
        assert_eq!(RelativeDate::days(7).to_duration(), Some(chrono::Duration::days(7)));
    }

    #[test]
    fn test_out_of_range_window_has_no_duration() {
        assert_eq!(RelativeDate::days(i64::MAX).to_duration(), None);
        assert_eq!(RelativeDate::months(i64::MAX / 2).to_duration(), None);
        assert_eq!(RelativeDate::days(1_000_000_000_000_000).to_duration(), None);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(
            temp_file.path(),
            r#"{"name": "file", "predicate": "all", "rules": []}"#,
        )
        .await
        .unwrap();

        let ruleset = Ruleset::load(temp_file.path()).await.unwrap();
        assert_eq!(ruleset.name, "file");
        assert!(ruleset.rules.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = Ruleset::load(Path::new("/tmp/nonexistent-ruleset-12345.json")).await;
        assert!(matches!(result, Err(GmailError::ConfigError(_))));
    }
}
