pub mod driver;
pub mod error;
pub mod pages;
pub mod parser;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use error::FlowError;
pub use report::generate_report;
pub use runner::run_suite;
pub use utils::price::normalize_price;
