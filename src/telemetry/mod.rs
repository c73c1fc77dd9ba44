pub mod errors;
pub mod init;
pub mod metrics;

pub use errors::classify_error;
pub use init::init_telemetry;
pub use metrics::{HTTP_REQUEST_DURATION, HTTP_REQUESTS_TOTAL};
