use std::fmt::Write;

use crate::schema::{Field, ProgramRecord};

const EXTRACTION_PREAMBLE: &str = r#"You are a PMO consultant collecting a program status update through conversation.

Your tasks:
1. Extract any new information from the user's message
2. Determine what is still missing
3. Ask ONE natural follow-up question for the most important missing information"#;

const EXTRACTION_RULES: &str = r#"CRITICAL: Respond with ONLY this JSON object (no explanation, no additional text, no code fences):
{
  "extracted_data": {
    "field_name": "extracted value, or null if not found"
  },
  "next_question": "Natural follow-up question asking for missing information"
}

Guidelines:
- Only use the field names listed above as keys in extracted_data
- Do not repeat fields that are already collected
- For budgets and counts: extract just the integer (e.g. 500000 from "$500,000")
- For RAID counts: "no risks" or "none" means 0
- For overall_status: use exactly "On Track", "At Risk" or "Off Track"
- For accomplishments and milestones: return arrays of short strings
- For dates: convert to YYYY-MM-DD
- Be encouraging, professional and brief"#;

/// Builds the system instruction for one extraction call.
pub fn extraction_prompt(record: &ProgramRecord) -> String {
    let mut prompt = String::from(EXTRACTION_PREAMBLE);

    prompt.push_str("\n\nRequired fields:\n");
    for field in Field::REQUIRED {
        let _ = writeln!(prompt, "- {}: {}", field.as_str(), field.description());
    }

    prompt.push_str("\nOptional fields (extract if mentioned, never ask for them):\n");
    for field in Field::ALL.into_iter().filter(|f| !f.is_required()) {
        let _ = writeln!(prompt, "- {}: {}", field.as_str(), field.description());
    }

    let collected = serde_json::to_string_pretty(&record.to_json()).unwrap_or_else(|_| "{}".into());
    let _ = write!(prompt, "\nCurrent data collected:\n{collected}\n");

    let missing = record.missing_required();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(Field::as_str).collect();
        let _ = writeln!(prompt, "\nStill missing: {}", names.join(", "));
    }

    prompt.push('\n');
    prompt.push_str(EXTRACTION_RULES);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldValue;

    #[test]
    fn test_prompt_lists_fields_and_collected_data() {
        let mut record = ProgramRecord::new();
        record.set(Field::ProgramName, FieldValue::text("Apollo"));

        let prompt = extraction_prompt(&record);
        for field in Field::ALL {
            assert!(prompt.contains(field.as_str()), "missing {field}");
        }
        assert!(prompt.contains("\"program_name\": \"Apollo\""));
        assert!(prompt.contains("Still missing: program_manager,"));
        assert!(prompt.contains("\"next_question\""));
    }
}
