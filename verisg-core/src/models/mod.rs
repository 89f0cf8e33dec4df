pub mod report;
pub mod request;
pub mod row;

pub use report::{CredibilityRating, CredibilityReport, TrustedReference, DISCLAIMER};
pub use request::{GenerateReportRequest, InputType};
pub use row::{NewReport, ReportRow, ReportSummary};
