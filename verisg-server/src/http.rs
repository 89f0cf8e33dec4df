//! VeriSG HTTP API
//!
//! Axum server exposing the report pipeline, the media stub and saved-report
//! history. Each endpoint has a thin axum handler that extracts what it needs
//! from the request and delegates to an inner function returning
//! `(StatusCode, serde_json::Value)`, so the logic is testable without axum.
//!
//! Endpoints:
//! - GET  /health           — database reachability, LLM configured
//! - GET  /version          — server version info
//! - POST /api/generate     — credibility report for text or a URL
//! - POST /api/analyze      — simulated media risk score (multipart `file`)
//! - GET  /api/reports      — caller's saved reports, newest first
//! - GET  /api/reports/:id  — one saved report owned by the caller

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;

use verisg_core::identity::bearer_token;
use verisg_core::media::analyze_media;
use verisg_core::store::{self, HISTORY_LIMIT};
use verisg_core::{
    generate_report, ChatBackend, ContentExtractor, FixedWindowLimiter, GenerateReportRequest,
    IdentityProvider, Language, NewReport, OpenAiChatClient, PipelineDeps, RateLimitStore,
    ReportSynthesizer, SupabaseIdentity, Translator, TrustedSources, UserId, ValidationError,
    VerisgConfig,
};

pub const RATE_LIMIT_HEADER: &str = "x-ratelimit-remaining";

const ANONYMOUS_KEY: &str = "anonymous";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub pool: PgPool,
    pub config: VerisgConfig,
    pub deps: PipelineDeps,
    pub limiter: Arc<dyn RateLimitStore>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl HttpState {
    /// Wire up the pipeline, limiter and identity provider from config.
    /// Missing LLM or auth credentials leave those parts unconfigured.
    pub fn from_config(pool: PgPool, config: VerisgConfig) -> Result<Self> {
        let chat: Option<Arc<dyn ChatBackend>> = match OpenAiChatClient::from_config(&config.llm)? {
            Some(client) => {
                tracing::info!(model = client.model(), "LLM synthesis enabled");
                Some(Arc::new(client) as Arc<dyn ChatBackend>)
            }
            None => {
                tracing::warn!("LLM_API_KEY not set — reports will use the fallback template");
                None
            }
        };

        let sources = TrustedSources::load(config.references.dataset_path.as_deref())?;
        tracing::info!(count = sources.len(), "Trusted sources loaded");

        let deps = PipelineDeps {
            extractor: ContentExtractor::new(config.extract.clone())?,
            sources,
            synthesizer: ReportSynthesizer::new(chat.clone(), config.llm.prompt_char_limit),
            translator: Translator::new(chat),
            max_refs: config.references.max_refs,
        };

        let identity: Option<Arc<dyn IdentityProvider>> =
            match SupabaseIdentity::from_config(&config.auth)? {
                Some(id) => Some(Arc::new(id) as Arc<dyn IdentityProvider>),
                None => {
                    tracing::warn!("Auth service not configured — saving and history disabled");
                    None
                }
            };

        Ok(Self {
            pool,
            limiter: Arc::new(FixedWindowLimiter::from_config(&config.rate_limit)),
            config,
            deps,
            identity,
        })
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let upload_limit = state.config.http.max_upload_bytes;
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/generate", post(generate_handler))
        .route(
            "/api/analyze",
            post(analyze_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/reports", get(list_reports_handler))
        .route("/api/reports/:id", get(get_report_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("VeriSG HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — the service stays up without a database, so an
/// unreachable database reports `degraded` rather than failing.
pub async fn health_inner(pool: &PgPool, llm_configured: bool) -> (StatusCode, serde_json::Value) {
    let check = tokio::time::timeout(Duration::from_secs(3), verisg_core::db::health_check(pool));
    let (status, database) = match check.await {
        Ok(Ok(version)) => ("healthy", serde_json::json!(version)),
        Ok(Err(e)) => ("degraded", serde_json::json!(format!("unavailable: {}", e))),
        Err(_) => ("degraded", serde_json::json!("unavailable: timed out")),
    };

    (
        StatusCode::OK,
        serde_json::json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "database": database,
            "llmConfigured": llm_configured,
        }),
    )
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    let languages: Vec<_> = Language::ALL
        .iter()
        .map(|l| serde_json::json!({ "code": l.code(), "name": l.display_name() }))
        .collect();
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "service": "verisg",
        "languages": languages,
    })
}

/// Decode and validate a `/api/generate` body; errors are the 400 response.
pub fn parse_generate_body(
    body: &[u8],
) -> std::result::Result<GenerateReportRequest, (StatusCode, serde_json::Value)> {
    serde_json::from_slice::<serde_json::Value>(body)
        .map_err(|e| ValidationError::single("body", e.to_string()))
        .and_then(GenerateReportRequest::parse)
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "success": false,
                    "error": "Invalid request",
                    "details": e.details(),
                }),
            )
        })
}

/// Inner generate — run the pipeline and save when asked by a signed-in caller.
/// Saving failures are logged; the report is still returned, without `reportId`.
pub async fn generate_inner(
    state: &HttpState,
    request: GenerateReportRequest,
    user: Option<UserId>,
) -> (StatusCode, serde_json::Value) {
    let result = match generate_report(&request, &state.deps).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "Generate report error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "success": false, "error": e.to_string() }),
            );
        }
    };

    let report_id = match (request.save_report, user) {
        (true, Some(user_id)) => {
            let row = NewReport {
                user_id,
                input_type: request.input_type.as_str().to_string(),
                input_hash: store::input_hash(
                    request.input_type,
                    &request.text,
                    request.url.as_deref(),
                ),
                original_language: result.original_language.code().to_string(),
                target_language: result.target_language.code().to_string(),
                report_json: serde_json::to_value(&result.report).unwrap_or_default(),
                source_urls: result.source_urls.clone(),
            };
            match store::save_report(&state.pool, &row).await {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to save report — returning it unsaved");
                    None
                }
            }
        }
        _ => None,
    };

    let mut body = serde_json::json!({
        "success": true,
        "report": result.report,
        "originalLanguage": result.original_language,
    });
    if let Some(obj) = body.as_object_mut() {
        if let Some(id) = report_id {
            obj.insert("reportId".to_string(), serde_json::json!(id));
        }
        if let Some(translated) = result.translated {
            obj.insert("translated".to_string(), serde_json::json!(translated));
        }
    }

    (StatusCode::OK, body)
}

/// Inner analyze — `upload` is `(file name, size in bytes)` of the `file` field.
pub fn analyze_inner(upload: Option<(String, u64)>) -> (StatusCode, serde_json::Value) {
    match upload {
        Some((name, size)) => {
            let analysis = analyze_media(&name, size);
            tracing::info!(
                file = %analysis.file_name,
                size,
                score = analysis.risk_score,
                "Simulated media analysis"
            );
            (
                StatusCode::OK,
                serde_json::to_value(analysis).unwrap_or_default(),
            )
        }
        None => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": "No file uploaded" }),
        ),
    }
}

/// Inner history listing for an identified caller.
pub async fn list_reports_inner(pool: &PgPool, user: UserId) -> (StatusCode, serde_json::Value) {
    match store::list_reports(pool, user, HISTORY_LIMIT).await {
        Ok(reports) => (
            StatusCode::OK,
            serde_json::json!({ "reports": reports, "count": reports.len() }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list reports");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "Failed to load reports" }),
            )
        }
    }
}

/// Inner single-report fetch; reports owned by someone else are 404.
pub async fn get_report_inner(
    pool: &PgPool,
    id: &str,
    user: UserId,
) -> (StatusCode, serde_json::Value) {
    let not_found = (
        StatusCode::NOT_FOUND,
        serde_json::json!({ "error": "Report not found" }),
    );

    let id = match Uuid::parse_str(id) {
        Ok(id) => id,
        Err(_) => return not_found,
    };

    match store::get_report(pool, id, user).await {
        Ok(Some(row)) => (
            StatusCode::OK,
            serde_json::json!({
                "id": row.id,
                "createdAt": row.created_at,
                "inputType": row.input_type,
                "originalLanguage": row.original_language,
                "targetLanguage": row.target_language,
                "report": row.report_json,
                "sourceUrls": row.source_urls,
            }),
        ),
        Ok(None) => not_found,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load report");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "Failed to load report" }),
            )
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool, state.deps.synthesizer.is_configured()).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn generate_handler(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Invalid bodies do not count against the limit.
    let request = match parse_generate_body(&body) {
        Ok(r) => r,
        Err((status, body)) => return (status, Json(body)).into_response(),
    };

    let key = rate_limit_key(&headers);
    let decision = state.limiter.check(&key).await;
    if !decision.allowed {
        tracing::info!(key = %key, "Rate limit exceeded");
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "success": false,
                "error": "Too many requests. Try again later.",
            })),
        )
            .into_response();
        response.headers_mut().insert(
            RATE_LIMIT_HEADER,
            HeaderValue::from(decision.remaining),
        );
        return response;
    }

    let user = resolve_user(&state, &headers).await;
    let (status, body) = generate_inner(&state, request, user).await;
    (status, Json(body)).into_response()
}

pub async fn analyze_handler(mut multipart: Multipart) -> impl IntoResponse {
    let upload = match read_file_field(&mut multipart).await {
        Ok(u) => u,
        Err(e) => {
            tracing::error!(error = %e, "Analyze error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to analyze file" })),
            );
        }
    };
    let (status, body) = analyze_inner(upload);
    (status, Json(body))
}

pub async fn list_reports_handler(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let (status, body) = match resolve_user(&state, &headers).await {
        Some(user) => list_reports_inner(&state.pool, user).await,
        None => unauthorized(),
    };
    (status, Json(body))
}

pub async fn get_report_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let (status, body) = match resolve_user(&state, &headers).await {
        Some(user) => get_report_inner(&state.pool, &id, user).await,
        None => unauthorized(),
    };
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

/// Client key for rate limiting: first `X-Forwarded-For` entry, else
/// `X-Real-IP`, else `"anonymous"`.
pub fn rate_limit_key(headers: &HeaderMap) -> String {
    let raw = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or(ANONYMOUS_KEY);

    let first = raw.split(',').next().unwrap_or("").trim();
    if first.is_empty() {
        ANONYMOUS_KEY.to_string()
    } else {
        first.to_string()
    }
}

async fn resolve_user(state: &HttpState, headers: &HeaderMap) -> Option<UserId> {
    let identity = state.identity.as_ref()?;
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)?;
    identity.resolve(token).await
}

fn unauthorized() -> (StatusCode, serde_json::Value) {
    (
        StatusCode::UNAUTHORIZED,
        serde_json::json!({ "error": "Sign in to view saved reports" }),
    )
}

/// Name and size of the multipart `file` field, if present.
async fn read_file_field(
    multipart: &mut Multipart,
) -> std::result::Result<Option<(String, u64)>, axum::extract::multipart::MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("uploaded").to_string();
        let data = field.bytes().await?;
        return Ok(Some((name, data.len() as u64)));
    }
    Ok(None)
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string());
        assert_eq!(v["service"], "verisg");
        let langs = v["languages"].as_array().unwrap();
        assert_eq!(langs.len(), 4);
        assert_eq!(langs[1]["code"], "zh");
        assert_eq!(langs[1]["name"], "中文");
    }

    #[test]
    fn test_rate_limit_key_prefers_forwarded_for_first_entry() {
        let h = headers(&[
            ("x-forwarded-for", " 203.0.113.7 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(rate_limit_key(&h), "203.0.113.7");
    }

    #[test]
    fn test_rate_limit_key_falls_back_to_real_ip_then_anonymous() {
        assert_eq!(
            rate_limit_key(&headers(&[("x-real-ip", "198.51.100.2")])),
            "198.51.100.2"
        );
        assert_eq!(rate_limit_key(&HeaderMap::new()), "anonymous");
        assert_eq!(
            rate_limit_key(&headers(&[("x-forwarded-for", " , 1.1.1.1")])),
            "anonymous"
        );
    }

    #[test]
    fn test_analyze_inner_missing_file() {
        let (status, body) = analyze_inner(None);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
    }

    #[test]
    fn test_analyze_inner_reports_stub_fields() {
        let (status, body) = analyze_inner(Some(("clip.mp4".to_string(), 1_000_000)));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fileName"], "clip.mp4");
        assert_eq!(body["size"], 1_000_000);
        let score = body["riskScore"].as_u64().unwrap();
        assert!(score <= 100);
        assert!(body["note"].as_str().unwrap().contains("demo stub"));
    }

    #[test]
    fn test_parse_generate_body() {
        let (status, body) = parse_generate_body(b"not json").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request");
        assert!(body["details"]["fieldErrors"]["body"].is_array());

        let (_, body) = parse_generate_body(br#"{"inputType":"url"}"#).unwrap_err();
        assert!(body["details"]["fieldErrors"]["url"].is_array());

        let req = parse_generate_body(br#"{"inputType":"text","text":"hello there"}"#).unwrap();
        assert_eq!(req.text, "hello there");
    }
}
