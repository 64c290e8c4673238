//! Infrastructure layer: persistence, browser automation, extraction

pub mod browser;
pub mod catalog_repository;
pub mod config;
pub mod crawler;
pub mod database_connection;
pub mod logging;
pub mod parsing;
pub mod scrape_job_repository;

pub use browser::{ChromiumFetcher, PageFetcher};
pub use catalog_repository::CatalogRepository;
pub use config::{AppConfig, CrawlerConfig, ReviewInsertPolicy};
pub use crawler::{CrawlOrchestrator, CrawlSummary};
pub use database_connection::DatabaseConnection;
pub use scrape_job_repository::ScrapeJobRepository;
