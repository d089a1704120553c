use chrono::{DateTime, Utc};
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

/// Hard cap applied to every user-supplied field to bound resource use.
pub const MAX_FIELD_LENGTH: usize = 2000;

/// The consultation form's wire shape. Every field is optional and may arrive
/// as any JSON type; [`ConsultationRequest::new`] coerces them all to strings.
#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationPayload {
    #[serde(default)]
    pub date: Value,
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub email: Value,
    #[serde(default)]
    pub company: Value,
    #[serde(default)]
    pub selected_plan: Value,
    #[serde(default)]
    pub project_type: Value,
    #[serde(default)]
    pub budget_range: Value,
    #[serde(default)]
    pub project_details: Value,
    #[serde(default, rename = "hp_trap")]
    pub hp_trap: Value,
}

impl ConsultationPayload {
    /// The honeypot is a hidden field no human ever fills in. Only a
    /// non-empty string counts: bots paste text, browsers send nothing.
    pub fn is_spam(&self) -> bool {
        matches!(&self.hp_trap, Value::String(s) if !s.trim().is_empty())
    }
}

/// One submission, sanitized and request-scoped. Lives exactly as long as the
/// request that carried it; never stored, queued or retried.
#[derive(Debug)]
pub struct ConsultationRequest {
    pub date: String,
    pub name: String,
    pub email: String,
    pub company: String,
    pub selected_plan: String,
    pub project_type: String,
    pub budget_range: String,
    pub project_details: String,
    pub client_ip: String,
    pub user_agent: String,
    pub submitted_at: DateTime<Utc>,
}

impl ConsultationRequest {
    pub fn new(payload: ConsultationPayload, client_ip: String, user_agent: String) -> Self {
        Self {
            date: sanitize(&payload.date),
            name: sanitize(&payload.name),
            email: sanitize(&payload.email),
            company: sanitize(&payload.company),
            selected_plan: sanitize(&payload.selected_plan),
            project_type: sanitize(&payload.project_type),
            budget_range: sanitize(&payload.budget_range),
            project_details: sanitize(&payload.project_details),
            client_ip: truncate(client_ip),
            user_agent: truncate(user_agent),
            submitted_at: Utc::now(),
        }
    }
}

/// Coerce any JSON value to a string: absent and `null` become empty, strings
/// pass through, everything else keeps its JSON text. No null ever reaches
/// the rendered email.
fn sanitize(value: &Value) -> String {
    let raw = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate(raw)
}

fn truncate(value: String) -> String {
    if value.graphemes(true).count() <= MAX_FIELD_LENGTH {
        value
    } else {
        value.graphemes(true).take(MAX_FIELD_LENGTH).collect()
    }
}
