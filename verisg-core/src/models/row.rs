use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved report as stored in the `reports` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub input_type: String,
    pub input_hash: String,
    pub original_input: Option<String>,
    pub original_language: String,
    pub target_language: String,
    pub report_json: serde_json::Value,
    pub source_urls: Vec<String>,
}

/// Insert payload for a new saved report.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: Uuid,
    pub input_type: String,
    pub input_hash: String,
    pub original_language: String,
    pub target_language: String,
    pub report_json: serde_json::Value,
    pub source_urls: Vec<String>,
}

/// History list entry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub input_type: String,
    pub rating: Option<String>,
}
