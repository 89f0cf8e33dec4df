pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod identity;
pub mod language;
pub mod llm;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod rate_limit;
pub mod references;
pub mod store;
pub mod synthesis;
pub mod translate;

pub use config::VerisgConfig;
pub use error::{FieldIssue, ValidationError, VerisgError};
pub use extract::{ContentExtractor, FetchError};
pub use identity::{IdentityProvider, SupabaseIdentity, UserId};
pub use language::{detect_language, Language};
pub use llm::{ChatBackend, LlmError, OpenAiChatClient};
pub use models::{
    CredibilityRating, CredibilityReport, GenerateReportRequest, InputType, NewReport, ReportRow,
    ReportSummary, TrustedReference,
};
pub use pipeline::{generate_report, GenerateReportResult, PipelineDeps};
pub use rate_limit::{FixedWindowLimiter, RateLimitDecision, RateLimitStore};
pub use references::{relevant_references, TrustedSourceEntry, TrustedSources};
pub use synthesis::{ReportSynthesizer, Synthesis};
pub use translate::Translator;
