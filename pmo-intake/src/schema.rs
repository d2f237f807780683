//! Field schema for the program status record.
//!
//! Every field the intake agent knows about is a [`Field`] variant with a
//! declared [`FieldKind`]. Collected values live in a [`ProgramRecord`], which
//! only ever stores values that pass the presence predicate, so "empty" and
//! "collected" can never coincide.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder strings that models and users emit in place of a real answer.
pub const SENTINELS: [&str; 5] = ["", "unknown", "null", "none", "n/a"];

/// Returns true when `text` is empty or one of the [`SENTINELS`], ignoring case
/// and surrounding whitespace.
pub fn is_sentinel(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    SENTINELS.contains(&normalized.as_str())
}

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Status,
    Date,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ProgramName,
    ProgramManager,
    ProgramManagerEmail,
    SponsorName,
    UpdateDate,
    UpdateTitle,
    KeyAccomplishments,
    UpcomingMilestones,
    TotalBudget,
    BudgetSpent,
    ScheduleVariance,
    OverallStatus,
    StatusCommentary,
    OpenRisks,
    OpenAssumptions,
    OpenIssues,
    OpenDependencies,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::ProgramName,
        Field::ProgramManager,
        Field::ProgramManagerEmail,
        Field::SponsorName,
        Field::UpdateDate,
        Field::UpdateTitle,
        Field::KeyAccomplishments,
        Field::UpcomingMilestones,
        Field::TotalBudget,
        Field::BudgetSpent,
        Field::ScheduleVariance,
        Field::OverallStatus,
        Field::StatusCommentary,
        Field::OpenRisks,
        Field::OpenAssumptions,
        Field::OpenIssues,
        Field::OpenDependencies,
    ];

    /// Fields that must be present before a record can be submitted, in the
    /// order the fallback checklist asks for them.
    pub const REQUIRED: [Field; 14] = [
        Field::ProgramName,
        Field::ProgramManager,
        Field::ProgramManagerEmail,
        Field::SponsorName,
        Field::OverallStatus,
        Field::StatusCommentary,
        Field::KeyAccomplishments,
        Field::UpcomingMilestones,
        Field::TotalBudget,
        Field::BudgetSpent,
        Field::OpenRisks,
        Field::OpenIssues,
        Field::OpenAssumptions,
        Field::OpenDependencies,
    ];

    /// Wire name used in model prompts and in the webhook payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::ProgramName => "program_name",
            Field::ProgramManager => "program_manager",
            Field::ProgramManagerEmail => "program_manager_email",
            Field::SponsorName => "sponsor_name",
            Field::UpdateDate => "update_date",
            Field::UpdateTitle => "update_title",
            Field::KeyAccomplishments => "key_accomplishments",
            Field::UpcomingMilestones => "upcoming_milestones",
            Field::TotalBudget => "total_budget",
            Field::BudgetSpent => "budget_spent",
            Field::ScheduleVariance => "schedule_variance",
            Field::OverallStatus => "overall_status",
            Field::StatusCommentary => "status_commentary",
            Field::OpenRisks => "open_risks",
            Field::OpenAssumptions => "open_assumptions",
            Field::OpenIssues => "open_issues",
            Field::OpenDependencies => "open_dependencies",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        let name = name.trim();
        Field::ALL.into_iter().find(|field| field.as_str() == name)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::TotalBudget
            | Field::BudgetSpent
            | Field::ScheduleVariance
            | Field::OpenRisks
            | Field::OpenAssumptions
            | Field::OpenIssues
            | Field::OpenDependencies => FieldKind::Integer,
            Field::OverallStatus => FieldKind::Status,
            Field::UpdateDate => FieldKind::Date,
            Field::KeyAccomplishments | Field::UpcomingMilestones => FieldKind::List,
            _ => FieldKind::Text,
        }
    }

    pub fn is_required(&self) -> bool {
        Field::REQUIRED.contains(self)
    }

    /// Description handed to the model so it knows what each key means.
    pub fn description(&self) -> &'static str {
        match self {
            Field::ProgramName => "Name of the program",
            Field::ProgramManager => "Full name of the program manager",
            Field::ProgramManagerEmail => "Email address of the program manager (reports are sent here)",
            Field::SponsorName => "Full name of the executive sponsor",
            Field::UpdateDate => "Date of this status update (YYYY-MM-DD)",
            Field::UpdateTitle => "Short title for this status update",
            Field::KeyAccomplishments => "Key accomplishments since the last update (array of strings)",
            Field::UpcomingMilestones => "Upcoming milestones (array of strings)",
            Field::TotalBudget => "Total program budget (integer, just the number)",
            Field::BudgetSpent => "Budget spent to date (integer, just the number)",
            Field::ScheduleVariance => "Schedule variance in days (integer, 0 if on schedule)",
            Field::OverallStatus => "Overall status: exactly one of \"On Track\", \"At Risk\", \"Off Track\"",
            Field::StatusCommentary => "One or two sentences explaining the overall status",
            Field::OpenRisks => "Number of open risks (integer)",
            Field::OpenAssumptions => "Number of open assumptions (integer)",
            Field::OpenIssues => "Number of open issues (integer)",
            Field::OpenDependencies => "Number of open dependencies (integer)",
        }
    }

    /// Canned question used when the model cannot supply one.
    pub fn fallback_question(&self) -> &'static str {
        match self {
            Field::ProgramName => "What is the name of your program?",
            Field::ProgramManager => "Who is the program manager?",
            Field::ProgramManagerEmail => {
                "What email address should the reports be delivered to?"
            }
            Field::SponsorName => "Who is the executive sponsor for this program?",
            Field::UpdateDate => "What date should this status update carry (YYYY-MM-DD)?",
            Field::UpdateTitle => "What title would you like for this status update?",
            Field::KeyAccomplishments => "What are the key accomplishments since the last update?",
            Field::UpcomingMilestones => "What are the upcoming milestones?",
            Field::TotalBudget => "What is the total budget for the program?",
            Field::BudgetSpent => "How much of the budget has been spent so far?",
            Field::ScheduleVariance => "How many days ahead or behind schedule is the program?",
            Field::OverallStatus => {
                "How is the program tracking overall: On Track, Off Track, or somewhere in between?"
            }
            Field::StatusCommentary => "Can you give me a sentence or two explaining that status?",
            Field::OpenRisks => "How many open risks are there?",
            Field::OpenAssumptions => "How many open assumptions are there?",
            Field::OpenIssues => "How many open issues are there?",
            Field::OpenDependencies => "How many open dependencies are there?",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical overall status labels accepted by the reporting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramStatus {
    #[serde(rename = "On Track")]
    OnTrack,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Off Track")]
    OffTrack,
}

impl ProgramStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProgramStatus::OnTrack => "On Track",
            ProgramStatus::AtRisk => "At Risk",
            ProgramStatus::OffTrack => "Off Track",
        }
    }

    /// Parses a status label, tolerating case, hyphens and underscores.
    pub fn from_label(label: &str) -> Option<ProgramStatus> {
        let normalized = label.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "on track" | "green" => Some(ProgramStatus::OnTrack),
            "at risk" | "amber" | "yellow" => Some(ProgramStatus::AtRisk),
            "off track" | "red" => Some(ProgramStatus::OffTrack),
            _ => None,
        }
    }
}

impl fmt::Display for ProgramStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parses a human-entered number such as `"$500,000"` or `"12.5"`, truncating
/// decimals.
pub fn parse_integer(text: &str) -> Option<i64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<i64>().ok().or_else(|| {
        cleaned
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(|value| value.trunc() as i64)
    })
}

/// A collected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Status(ProgramStatus),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Integer(_) | FieldValue::Status(_) => true,
            FieldValue::Text(text) => !is_sentinel(text),
            FieldValue::List(items) => items.iter().any(|item| !is_sentinel(item)),
        }
    }

    /// Converts a JSON value reported for `field` into a typed value.
    ///
    /// Returns `None` for null and for anything that fails the presence
    /// predicate. Integer fields that do not read as a number are kept as text.
    pub fn from_json(field: Field, value: &Value) -> Option<FieldValue> {
        let converted = match (field.kind(), value) {
            (_, Value::Null) => return None,
            (FieldKind::Integer, Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|f| f.trunc() as i64))
                .map(FieldValue::Integer)?,
            (FieldKind::Integer, Value::String(text)) => parse_integer(text)
                .map(FieldValue::Integer)
                .unwrap_or_else(|| FieldValue::text(text.trim())),
            (FieldKind::Status, Value::String(text)) => ProgramStatus::from_label(text)
                .map(FieldValue::Status)
                .unwrap_or_else(|| FieldValue::text(text.trim())),
            (FieldKind::List, Value::Array(items)) => FieldValue::List(
                items
                    .iter()
                    .map(json_to_text)
                    .filter(|item| !is_sentinel(item))
                    .collect(),
            ),
            (_, Value::Array(items)) => FieldValue::Text(
                items
                    .iter()
                    .map(json_to_text)
                    .filter(|item| !is_sentinel(item))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            (_, other) => FieldValue::Text(json_to_text(other).trim().to_string()),
        };
        converted.is_present().then_some(converted)
    }
}

fn json_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Status(status) => write!(f, "{status}"),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// The fields collected so far for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    values: BTreeMap<Field, FieldValue>,
}

impl ProgramRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.values.get(&field).is_some_and(FieldValue::is_present)
    }

    /// Stores `value`, replacing any previous value. Absent values are ignored.
    pub fn set(&mut self, field: Field, value: FieldValue) -> bool {
        if !value.is_present() {
            return false;
        }
        self.values.insert(field, value);
        true
    }

    /// Stores `value` only when `field` has not been collected yet.
    pub fn set_if_absent(&mut self, field: Field, value: FieldValue) -> bool {
        if self.is_set(field) {
            return false;
        }
        self.set(field, value)
    }

    pub fn remove(&mut self, field: Field) -> Option<FieldValue> {
        self.values.remove(&field)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Required fields not yet collected, in fallback priority order.
    pub fn missing_required(&self) -> Vec<Field> {
        Field::REQUIRED
            .into_iter()
            .filter(|field| !self.is_set(*field))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        Field::REQUIRED.iter().all(|field| self.is_set(*field))
    }

    /// Snapshot keyed by wire name, used as model context.
    pub fn to_json(&self) -> Value {
        let map = self
            .values
            .iter()
            .map(|(field, value)| {
                let json = serde_json::to_value(value).unwrap_or(Value::Null);
                (field.as_str().to_string(), json)
            })
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}
