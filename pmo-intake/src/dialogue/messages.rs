use crate::submission::SubmissionPayload;

/// Greeting a host can show before the first message arrives.
pub const INTRODUCTION_MESSAGE: &str = "👋 Hi! I'm your AI-powered PMO consultant. Tell me about your program and I'll turn it into a set of status reports delivered to your inbox.";

pub const WELCOME_MESSAGE: &str = "👋 Hi! I'm your AI-powered PMO consultant. I'll collect your program status and deliver 5 professional PowerPoint reports to your inbox.

**You can provide information in any way you like:**
- Answer my questions one by one, OR
- Give me all the details at once, OR
- Just chat naturally - I'll figure it out!

**I need to collect:**
1. Program name
2. Program manager name and email
3. Executive sponsor name
4. Overall status (On Track / At Risk / Off Track) with a short commentary
5. Key accomplishments
6. Upcoming milestones
7. Total budget and budget spent
8. Open RAID counts (Risks, Assumptions, Issues, Dependencies)

**Let's get started! Tell me about your program.** Share as much or as little as you want, and I'll ask follow-up questions for anything missing.";

pub const RECOVERY_MESSAGE: &str =
    "I'm not sure what to do. Let's start over. Type 'hello' to begin.";

pub fn submission_succeeded(payload: &SubmissionPayload) -> String {
    format!(
        "✅ **Perfect! I have everything I need.**

**Submitting your program details now...**

📊 **5 PowerPoint reports are being generated:**
1. Program Charter
2. Status Report
3. Milestone Tracker
4. RAID Log
5. Budget Overview

They'll be delivered to **{email}** within 2-3 minutes.

---

**Program Summary:**
- **Name**: {name}
- **Manager**: {manager}
- **Sponsor**: {sponsor}
- **Status**: {status}
- **Budget**: ${total} (spent ${spent})
- **Milestones**: {milestones}
- **RAID**: {risks} risks, {assumptions} assumptions, {issues} issues, {dependencies} dependencies

Check your inbox! 📧

---

Want to report on another program? Just say \"hello\" to start over.",
        email = payload.program_manager_email,
        name = payload.program_name,
        manager = payload.program_manager,
        sponsor = payload.sponsor_name,
        status = payload.overall_status,
        total = group_thousands(payload.total_budget),
        spent = group_thousands(payload.budget_spent),
        milestones = payload.upcoming_milestones.len(),
        risks = payload.raid_counts.risks,
        assumptions = payload.raid_counts.assumptions,
        issues = payload.raid_counts.issues,
        dependencies = payload.raid_counts.dependencies,
    )
}

pub fn submission_failed(payload: &SubmissionPayload) -> String {
    match serde_json::to_string_pretty(payload) {
        Ok(json) => format!(
            "❌ **Oops! There was an error submitting your program details.**

Please try again or contact support. Here's your data:

```json
{json}
```"
        ),
        Err(_) => "❌ **Oops! There was an error submitting your program details.** Please try again or contact support.".to_string(),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
