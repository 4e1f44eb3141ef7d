pub mod args;
pub mod entities;
pub mod error;
pub mod filter;
pub mod insights;
pub mod keywords;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod records;
pub mod report;
pub mod sentiment;
pub mod stats;
pub mod text;
pub mod utils;

pub use args::Args;
pub use error::{Error, LoadError, Result};
pub use filter::FilterSpec;
pub use keywords::init_default_keywords;
pub use normalize::BodyCleaner;
pub use records::{EmailRecord, EmailTable};
pub use report::{build_report, DashboardReport, ReportOptions};
pub use text::StopwordSet;
