//! Domain module - catalog entities, extraction records, and scrape job types

pub mod catalog;
pub mod scrape_job;

// Re-export commonly used items
pub use catalog::*;
pub use scrape_job::*;
