//! Builds the record sent to the reporting webhook.
//!
//! Coercion never fails: malformed numbers become 0, a bare string becomes a
//! one-element list and missing optional fields get defaults.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{IntakeError, Result},
    schema::{Field, FieldValue, ProgramRecord, ProgramStatus, parse_integer},
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaidCounts {
    pub risks: i64,
    pub assumptions: i64,
    pub issues: i64,
    pub dependencies: i64,
}

/// Finalized, type-coerced program update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub program_name: String,
    pub program_manager: String,
    pub program_manager_email: String,
    pub sponsor_name: String,
    pub update_date: String,
    pub update_title: String,
    pub key_accomplishments: Vec<String>,
    pub upcoming_milestones: Vec<String>,
    pub total_budget: i64,
    pub budget_spent: i64,
    pub schedule_variance: i64,
    pub overall_status: ProgramStatus,
    pub status_commentary: String,
    pub raid_counts: RaidCounts,
    pub open_risks: i64,
    pub open_assumptions: i64,
    pub open_issues: i64,
    pub open_dependencies: i64,
}

impl SubmissionPayload {
    /// Builds the payload from a complete record. `today` is used when no
    /// update date was collected.
    pub fn build(record: &ProgramRecord, today: NaiveDate) -> Result<Self> {
        let missing = record.missing_required();
        if !missing.is_empty() {
            return Err(IntakeError::IncompleteRecord(missing));
        }

        let program_name = text(record, Field::ProgramName);
        let update_title = match record.get(Field::UpdateTitle) {
            Some(value) if value.is_present() => value.to_string(),
            _ => format!("{program_name} Status Update"),
        };

        let raid_counts = RaidCounts {
            risks: integer(record, Field::OpenRisks),
            assumptions: integer(record, Field::OpenAssumptions),
            issues: integer(record, Field::OpenIssues),
            dependencies: integer(record, Field::OpenDependencies),
        };

        Ok(Self {
            program_manager: text(record, Field::ProgramManager),
            program_manager_email: text(record, Field::ProgramManagerEmail),
            sponsor_name: text(record, Field::SponsorName),
            update_date: update_date(record, today),
            update_title,
            key_accomplishments: list(record, Field::KeyAccomplishments),
            upcoming_milestones: list(record, Field::UpcomingMilestones),
            total_budget: integer(record, Field::TotalBudget),
            budget_spent: integer(record, Field::BudgetSpent),
            schedule_variance: integer(record, Field::ScheduleVariance),
            overall_status: status(record),
            status_commentary: text(record, Field::StatusCommentary),
            open_risks: raid_counts.risks,
            open_assumptions: raid_counts.assumptions,
            open_issues: raid_counts.issues,
            open_dependencies: raid_counts.dependencies,
            raid_counts,
            program_name,
        })
    }
}

fn text(record: &ProgramRecord, field: Field) -> String {
    record
        .get(field)
        .map(|value| value.to_string().trim().to_string())
        .unwrap_or_default()
}

fn integer(record: &ProgramRecord, field: Field) -> i64 {
    match record.get(field) {
        Some(FieldValue::Integer(value)) => *value,
        Some(FieldValue::Text(raw)) => parse_integer(raw).unwrap_or_else(|| {
            warn!(field = %field, value = %raw, "Non-numeric value coerced to 0");
            0
        }),
        _ => 0,
    }
}

fn list(record: &ProgramRecord, field: Field) -> Vec<String> {
    match record.get(field) {
        Some(FieldValue::List(items)) => items.clone(),
        Some(value) if value.is_present() => vec![value.to_string()],
        _ => Vec::new(),
    }
}

fn status(record: &ProgramRecord) -> ProgramStatus {
    match record.get(Field::OverallStatus) {
        Some(FieldValue::Status(status)) => *status,
        Some(other) => {
            let raw = other.to_string();
            ProgramStatus::from_label(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unrecognized status label, reporting At Risk");
                ProgramStatus::AtRisk
            })
        }
        None => ProgramStatus::AtRisk,
    }
}

fn update_date(record: &ProgramRecord, today: NaiveDate) -> String {
    let collected = record.get(Field::UpdateDate).map(ToString::to_string);
    match collected {
        Some(raw) => match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
            Ok(date) => date.format(DATE_FORMAT).to_string(),
            Err(_) => {
                warn!(value = %raw, "Update date is not YYYY-MM-DD, using today");
                today.format(DATE_FORMAT).to_string()
            }
        },
        None => today.format(DATE_FORMAT).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::complete_record;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_build_applies_defaults() {
        let payload = SubmissionPayload::build(&complete_record(), today()).unwrap();

        assert_eq!(payload.update_date, "2026-10-19");
        assert_eq!(payload.update_title, "Apollo Status Update");
        assert_eq!(payload.schedule_variance, 0);
        assert_eq!(payload.key_accomplishments, vec!["Kickoff done".to_string()]);
        assert_eq!(payload.upcoming_milestones.len(), 2);
        assert_eq!(payload.overall_status, ProgramStatus::OnTrack);
    }

    #[test]
    fn test_non_numeric_budget_becomes_zero() {
        let mut record = complete_record();
        record.remove(Field::TotalBudget);
        record.set(Field::TotalBudget, FieldValue::text("not a number"));
        record.set(Field::BudgetSpent, FieldValue::text("$1,250"));

        let payload = SubmissionPayload::build(&record, today()).unwrap();
        assert_eq!(payload.total_budget, 0);
        assert_eq!(payload.budget_spent, 1250);
    }

    #[test]
    fn test_collected_date_and_title_are_kept() {
        let mut record = complete_record();
        record.set(Field::UpdateDate, FieldValue::text("2026-09-30"));
        record.set(Field::UpdateTitle, FieldValue::text("Q3 Review"));
        record.set(Field::ScheduleVariance, FieldValue::Integer(-5));

        let payload = SubmissionPayload::build(&record, today()).unwrap();
        assert_eq!(payload.update_date, "2026-09-30");
        assert_eq!(payload.update_title, "Q3 Review");
        assert_eq!(payload.schedule_variance, -5);
    }

    #[test]
    fn test_malformed_date_falls_back_to_today() {
        let mut record = complete_record();
        record.set(Field::UpdateDate, FieldValue::text("next Tuesday"));

        let payload = SubmissionPayload::build(&record, today()).unwrap();
        assert_eq!(payload.update_date, "2026-10-19");
    }

    #[test]
    fn test_incomplete_record_is_rejected() {
        let mut record = complete_record();
        record.remove(Field::SponsorName);

        match SubmissionPayload::build(&record, today()) {
            Err(IntakeError::IncompleteRecord(missing)) => {
                assert_eq!(missing, vec![Field::SponsorName])
            }
            other => panic!("expected IncompleteRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_wire_format() {
        let payload = SubmissionPayload::build(&complete_record(), today()).unwrap();
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["overall_status"], json!("On Track"));
        assert_eq!(
            value["raid_counts"],
            json!({ "risks": 0, "assumptions": 1, "issues": 2, "dependencies": 0 })
        );
        assert_eq!(value["open_issues"], json!(2));
        assert_eq!(value["total_budget"], json!(500_000));
        assert_eq!(value["program_manager_email"], json!("jane@x.com"));
    }
}
