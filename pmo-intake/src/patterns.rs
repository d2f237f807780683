//! Deterministic field extraction.
//!
//! Runs before every model call and is the only extraction left when the model
//! is unavailable. Rules never fail; a rule that does not match leaves the
//! record untouched.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::schema::{Field, FieldValue, ProgramRecord, ProgramStatus};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("Invalid email regex")
});

static INTEGER_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\b").expect("Invalid integer regex"));

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("Invalid amount regex"));

/// Question keywords that identify which RAID count a bare number answers.
const RAID_KEYWORDS: [(&str, Field); 4] = [
    ("risk", Field::OpenRisks),
    ("assumption", Field::OpenAssumptions),
    ("issue", Field::OpenIssues),
    ("dependenc", Field::OpenDependencies),
];

const NEGATIVE_TOKENS: [&str; 4] = ["none", "zero", "no ", "0"];

const STATUS_PHRASES: [(&str, ProgramStatus); 3] = [
    ("on track", ProgramStatus::OnTrack),
    ("at risk", ProgramStatus::AtRisk),
    ("off track", ProgramStatus::OffTrack),
];

/// Applies the pattern rules for one message and returns the fields it changed.
pub fn extract(
    record: &mut ProgramRecord,
    message: &str,
    last_question: Option<&str>,
) -> Vec<Field> {
    let lowered = message.to_lowercase();
    let question = last_question.map(str::to_lowercase).unwrap_or_default();
    let mut changed = Vec::new();

    if let Some(email) = EMAIL_RE.find(message) {
        if record.set_if_absent(Field::ProgramManagerEmail, FieldValue::text(email.as_str())) {
            changed.push(Field::ProgramManagerEmail);
        }
    }

    if let Some(field) = raid_field_for_question(&question) {
        if let Some(count) = first_integer_token(message) {
            if record.set_if_absent(field, FieldValue::Integer(count)) {
                changed.push(field);
            }
        }
        if !record.is_set(field) && NEGATIVE_TOKENS.iter().any(|token| lowered.contains(token)) {
            record.set(field, FieldValue::Integer(0));
            changed.push(field);
        }
    }

    if question.contains("budget") || lowered.contains("budget") {
        let amounts = amounts(message);
        if let Some(total) = amounts.first() {
            if record.set_if_absent(Field::TotalBudget, FieldValue::Integer(*total)) {
                changed.push(Field::TotalBudget);
            }
        }
        if let Some(spent) = amounts.get(1) {
            if record.set_if_absent(Field::BudgetSpent, FieldValue::Integer(*spent)) {
                changed.push(Field::BudgetSpent);
            }
        }
    }

    if let Some((_, status)) = STATUS_PHRASES
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
    {
        record.set(Field::OverallStatus, FieldValue::Status(*status));
        changed.push(Field::OverallStatus);
    }

    if !changed.is_empty() {
        debug!(fields = ?changed, "Pattern extraction matched");
    }
    changed
}

fn raid_field_for_question(question: &str) -> Option<Field> {
    RAID_KEYWORDS
        .iter()
        .find(|(keyword, _)| question.contains(keyword))
        .map(|(_, field)| *field)
}

fn first_integer_token(message: &str) -> Option<i64> {
    INTEGER_TOKEN_RE
        .find_iter(message)
        .find_map(|token| token.as_str().parse::<i64>().ok())
}

/// All numeric substrings, commas stripped and decimals truncated.
fn amounts(message: &str) -> Vec<i64> {
    AMOUNT_RE
        .find_iter(message)
        .filter_map(|amount| {
            let cleaned = amount.as_str().replace(',', "");
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(|value| value.trunc() as i64)
        })
        .collect()
}
