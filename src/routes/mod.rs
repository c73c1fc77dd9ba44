pub mod health;
pub mod lab_reports;
