pub mod orchestrator;
pub mod populate;
pub mod prompt;
pub mod schema;
pub mod summarize;

pub use orchestrator::{ReportEnvelope, process_lab_report};
pub use summarize::SummarySettings;
