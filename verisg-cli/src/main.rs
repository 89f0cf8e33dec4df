//! verisg-cli — command-line client for a VeriSG server
//!
//! # Subcommands
//! - `check (--text <t> | --url <u>) [--lang <code>] [--save] [--json]` — credibility report
//! - `analyze <file> [--json]`                                        — simulated media risk score
//! - `history [--json]`                                               — saved reports (needs a token)
//! - `status`                                                         — show server health

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";
const LANGUAGES: [&str; 4] = ["en", "zh", "ms", "ta"];

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "verisg-cli",
    version,
    about = "VeriSG — check claims, links and media against trusted Singapore sources"
)]
struct Cli {
    /// VeriSG HTTP server URL (overrides VERISG_HTTP_URL env var)
    #[arg(long, env = "VERISG_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Access token from the auth service; needed for --save and history
    #[arg(long, env = "VERISG_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a credibility report for a claim or a web page
    Check {
        /// Claim text to assess
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        text: Option<String>,

        /// Web page to fetch and assess
        #[arg(long)]
        url: Option<String>,

        /// Language for the translated summary
        #[arg(long, default_value = "en", value_parser = LANGUAGES)]
        lang: String,

        /// Save the report to your history
        #[arg(long)]
        save: bool,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Upload a media file for a (simulated) deepfake risk score
    Analyze {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// List your saved reports
    History {
        #[arg(long)]
        json: bool,
    },

    /// Show VeriSG server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct Reference {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub rating: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
    pub context: String,
    #[serde(default)]
    pub trusted_references: Vec<Reference>,
    pub what_to_do_next: String,
    pub claim_summary: String,
    pub disclaimer: Option<String>,
}

/// Body of POST /api/generate, success and failure alike
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub report: Option<Report>,
    pub report_id: Option<String>,
    pub translated: Option<BTreeMap<String, String>>,
    pub original_language: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub file_name: String,
    pub size: u64,
    pub risk_score: u8,
    pub risk_label: String,
    #[serde(default)]
    pub reasons: Vec<String>,
    pub note: String,
}

// ============================================================================
// Text rendering
// ============================================================================

/// Human-readable report, with translated fields appended when present.
pub fn format_report(resp: &GenerateResponse) -> String {
    let report = match &resp.report {
        Some(r) => r,
        None => return "No report returned.".to_string(),
    };

    let mut out = vec![
        format!("Rating:     {} ({:.0}% confidence)", report.rating, report.confidence),
        format!(
            "Language:   {}",
            resp.original_language.as_deref().unwrap_or("?")
        ),
        String::new(),
        format!("Claim:      {}", report.claim_summary),
        format!("Context:    {}", report.context),
        String::new(),
        "Why:".to_string(),
    ];
    out.extend(report.reasons.iter().map(|r| format!("  - {}", r)));
    out.push(String::new());
    out.push(format!("Next step:  {}", report.what_to_do_next));
    out.push(String::new());
    out.push("Trusted references:".to_string());
    out.extend(
        report
            .trusted_references
            .iter()
            .enumerate()
            .map(|(i, r)| format!("  {}. {} <{}>", i + 1, r.title, r.url)),
    );

    if let Some(translated) = resp.translated.as_ref().filter(|t| !t.is_empty()) {
        out.push(String::new());
        out.push("Translation:".to_string());
        for (key, value) in translated {
            out.push(format!("  {}: {}", key, value.replace('\n', "; ")));
        }
    }

    if let Some(id) = &resp.report_id {
        out.push(String::new());
        out.push(format!("Saved as report {}", id));
    }

    if let Some(d) = &report.disclaimer {
        out.push(String::new());
        out.push(d.clone());
    }

    out.join("\n")
}

pub fn format_media(m: &MediaResponse) -> String {
    let mut out = vec![
        format!("File:   {} ({} bytes)", m.file_name, m.size),
        format!("Risk:   {} ({}/100)", m.risk_label, m.risk_score),
    ];
    out.extend(m.reasons.iter().map(|r| format!("  - {}", r)));
    out.push(String::new());
    out.push(format!("Note: {}", m.note));
    out.join("\n")
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

fn with_token(
    req: reqwest::blocking::RequestBuilder,
    token: Option<&str>,
) -> reqwest::blocking::RequestBuilder {
    match token {
        Some(t) => req.bearer_auth(t),
        None => req,
    }
}

fn do_check(
    server: &str,
    token: Option<&str>,
    text: Option<String>,
    url: Option<String>,
    lang: &str,
    save: bool,
    json_output: bool,
) -> anyhow::Result<()> {
    if save && token.is_none() {
        eprintln!(
            "verisg-cli: --save needs --token (or VERISG_TOKEN); the report will not be saved"
        );
    }

    let body = match url {
        Some(u) => serde_json::json!({
            "inputType": "url",
            "text": "",
            "url": u,
            "targetLanguage": lang,
            "saveReport": save,
        }),
        None => serde_json::json!({
            "inputType": "text",
            "text": text.unwrap_or_default(),
            "targetLanguage": lang,
            "saveReport": save,
        }),
    };

    let endpoint = format!("{}/api/generate", server);
    // LLM call plus translation plus page fetch can take a while
    let resp = match with_token(client(90)?.post(&endpoint).json(&body), token).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("verisg-cli: connection failed to {}: {}", endpoint, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let raw: serde_json::Value = resp.json().unwrap_or_default();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&raw)?);
        if !status.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let parsed: GenerateResponse = serde_json::from_value(raw.clone())?;
    if !status.is_success() || !parsed.success {
        eprintln!(
            "verisg-cli: server returned {}: {}",
            status,
            parsed.error.as_deref().unwrap_or("unknown error")
        );
        if let Some(details) = raw.get("details") {
            eprintln!("{}", details);
        }
        std::process::exit(1);
    }

    println!("{}", format_report(&parsed));
    Ok(())
}

fn do_analyze(server: &str, file: &Path, json_output: bool) -> anyhow::Result<()> {
    let form = reqwest::blocking::multipart::Form::new().file("file", file)?;
    let endpoint = format!("{}/api/analyze", server);

    let resp = match client(120)?.post(&endpoint).multipart(form).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("verisg-cli: connection failed to {}: {}", endpoint, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let raw: serde_json::Value = resp.json().unwrap_or_default();
    if !status.is_success() {
        eprintln!(
            "verisg-cli: server returned {}: {}",
            status,
            raw["error"].as_str().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&raw)?);
    } else {
        let media: MediaResponse = serde_json::from_value(raw)?;
        println!("{}", format_media(&media));
    }
    Ok(())
}

fn do_history(server: &str, token: Option<&str>, json_output: bool) -> anyhow::Result<()> {
    let token = match token {
        Some(t) => t,
        None => {
            eprintln!("verisg-cli: history needs --token (or VERISG_TOKEN)");
            std::process::exit(1);
        }
    };

    let endpoint = format!("{}/api/reports", server);
    let resp = match client(10)?.get(&endpoint).bearer_auth(token).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("verisg-cli: connection failed to {}: {}", endpoint, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let body: serde_json::Value = resp.json().unwrap_or_default();
    if !status.is_success() {
        eprintln!(
            "verisg-cli: server returned {}: {}",
            status,
            body["error"].as_str().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let reports = body["reports"].as_array().cloned().unwrap_or_default();
    if reports.is_empty() {
        eprintln!("No saved reports.");
        return Ok(());
    }
    for r in &reports {
        println!(
            "{}  {:<4}  {:<18}  {}",
            r["createdAt"].as_str().unwrap_or("?"),
            r["inputType"].as_str().unwrap_or("?"),
            r["rating"].as_str().unwrap_or("?"),
            r["id"].as_str().unwrap_or("?"),
        );
    }
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client(10)?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("VeriSG server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
            println!("Database:      {}", body["database"].as_str().unwrap_or("?"));
            println!(
                "LLM:           {}",
                if body["llmConfigured"].as_bool().unwrap_or(false) {
                    "configured"
                } else {
                    "not configured (fallback reports)"
                }
            );
        }
        Ok(r) => {
            eprintln!("verisg-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("verisg-cli: cannot reach {} — {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();
    let token = cli.token.as_deref().filter(|t| !t.trim().is_empty());

    let result = match cli.command {
        Commands::Check {
            text,
            url,
            lang,
            save,
            json,
        } => do_check(&server, token, text, url, &lang, save, json),
        Commands::Analyze { file, json } => do_analyze(&server, &file, json),
        Commands::History { json } => do_history(&server, token, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("verisg-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
