//! Scrape job tracking types
//!
//! One `ScrapeJob` row is created per orchestrator invocation and forms an
//! append-only audit trail. Status moves strictly forward:
//! `pending -> running -> {completed, failed}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a scrape job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScrapeJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeJobStatus::Pending => "pending",
            ScrapeJobStatus::Running => "running",
            ScrapeJobStatus::Completed => "completed",
            ScrapeJobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ScrapeJobStatus::Pending),
            "running" => Some(ScrapeJobStatus::Running),
            "completed" => Some(ScrapeJobStatus::Completed),
            "failed" => Some(ScrapeJobStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScrapeJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which extraction handler and persistence shape a job applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeTargetType {
    Navigation,
    Category,
    Product,
    ProductDetail,
}

impl ScrapeTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeTargetType::Navigation => "navigation",
            ScrapeTargetType::Category => "category",
            ScrapeTargetType::Product => "product",
            ScrapeTargetType::ProductDetail => "product_detail",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "navigation" => Some(ScrapeTargetType::Navigation),
            "category" => Some(ScrapeTargetType::Category),
            "product" => Some(ScrapeTargetType::Product),
            "product_detail" => Some(ScrapeTargetType::ProductDetail),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScrapeTargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted scrape job row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: i64,
    pub target_url: String,
    pub target_type: ScrapeTargetType,
    pub status: ScrapeJobStatus,
    /// Optional identity of the record the job targets (e.g. product id)
    pub target_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_log: Option<String>,
    /// Arbitrary outcome payload set on completion
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
