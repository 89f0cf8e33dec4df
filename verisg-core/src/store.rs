//! Saved-report persistence
//!
//! Reports are keyed by owner. Reads always filter on `user_id`, so a report
//! is invisible to everyone but the user who saved it.

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{InputType, NewReport, ReportRow, ReportSummary};

/// Default and maximum length of a history listing.
pub const HISTORY_LIMIT: i64 = 50;

/// Hex chars of the SHA-256 digest kept as the input fingerprint.
const INPUT_HASH_CHARS: usize = 32;

/// Fingerprint of the submitted input: URL submissions hash the URL, text
/// submissions hash the text (plus any URL sent alongside it).
pub fn input_hash(input_type: InputType, text: &str, url: Option<&str>) -> String {
    let url = url.unwrap_or("");
    let primary = match input_type {
        InputType::Url => url,
        InputType::Text => text,
    };

    let mut hasher = Sha256::new();
    hasher.update(primary.as_bytes());
    hasher.update(url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..INPUT_HASH_CHARS].to_string()
}

pub async fn save_report(pool: &PgPool, report: &NewReport) -> Result<Uuid, sqlx::Error> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO reports
            (user_id, input_type, input_hash, original_input, original_language,
             target_language, report_json, source_urls)
        VALUES ($1, $2, $3, NULL, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(report.user_id)
    .bind(&report.input_type)
    .bind(&report.input_hash)
    .bind(&report.original_language)
    .bind(&report.target_language)
    .bind(&report.report_json)
    .bind(&report.source_urls)
    .fetch_one(pool)
    .await?;

    tracing::debug!(id = %row.0, user = %report.user_id, "Saved report");
    Ok(row.0)
}

/// Fetch one report if it belongs to `user_id`.
pub async fn get_report(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<ReportRow>, sqlx::Error> {
    sqlx::query_as::<_, ReportRow>(
        r#"
        SELECT id, user_id, created_at, input_type, input_hash, original_input,
               original_language, target_language, report_json, source_urls
        FROM reports
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Newest-first history for `user_id`, at most `HISTORY_LIMIT` entries.
pub async fn list_reports(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<ReportSummary>, sqlx::Error> {
    sqlx::query_as::<_, ReportSummary>(
        r#"
        SELECT id, created_at, input_type, report_json->>'rating' AS rating
        FROM reports
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit.clamp(1, HISTORY_LIMIT))
    .fetch_all(pool)
    .await
}
