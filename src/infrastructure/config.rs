//! Application configuration
//!
//! A small serde-backed config with environment overrides. Crawl bounds are
//! per target type, mirroring how differently sized the page sets are: a
//! navigation run touches the landing page, a category run may walk a
//! sub-tree, a detail run touches exactly one page.

use serde::{Deserialize, Serialize};

use crate::domain::ScrapeTargetType;

/// How extracted reviews are written on re-scrape.
///
/// The source system always appends newly scraped reviews, duplicating them
/// when a product is re-scraped. Whether that is intended is unresolved, so
/// the policy is configurable instead of silently deduplicating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewInsertPolicy {
    /// Always insert; re-scrapes duplicate existing reviews (source behavior)
    #[default]
    AppendAlways,
    /// Skip inserts whose author and text match an existing review of the product
    SkipDuplicateText,
}

/// Crawl execution bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Base origin used for resolving relative links
    pub base_url: String,
    /// Hard ceiling on pages visited per navigation run
    pub max_pages_navigation: u32,
    /// Hard ceiling on pages visited per category run
    pub max_pages_category: u32,
    /// Hard ceiling on pages visited per product-listing run
    pub max_pages_product: u32,
    /// Hard ceiling on pages visited per detail run
    pub max_pages_product_detail: u32,
    /// Per-page load/extraction timeout in seconds
    pub page_timeout_secs: u64,
    /// Settle delay after navigation before extraction, in milliseconds.
    /// Extraction before the page quiesces yields empty results.
    pub settle_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.worldofbooks.com".to_string(),
            max_pages_navigation: 10,
            max_pages_category: 50,
            max_pages_product: 10,
            max_pages_product_detail: 1,
            page_timeout_secs: 60,
            settle_delay_ms: 500,
        }
    }
}

impl CrawlerConfig {
    /// Page bound for one run of the given target type
    pub fn max_pages(&self, target: ScrapeTargetType) -> u32 {
        match target {
            ScrapeTargetType::Navigation => self.max_pages_navigation,
            ScrapeTargetType::Category => self.max_pages_category,
            ScrapeTargetType::Product => self.max_pages_product,
            ScrapeTargetType::ProductDetail => self.max_pages_product_detail,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database URL
    pub database_url: String,
    pub crawler: CrawlerConfig,
    pub review_insert_policy: ReviewInsertPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/catalog.db".to_string(),
            crawler: CrawlerConfig::default(),
            review_insert_policy: ReviewInsertPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `CATALOG_DATABASE_URL` / `CATALOG_BASE_URL`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("CATALOG_DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(url) = std::env::var("CATALOG_BASE_URL") {
            config.crawler.base_url = url;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_target_page_bounds() {
        let config = CrawlerConfig::default();
        assert_eq!(config.max_pages(ScrapeTargetType::Category), 50);
        assert_eq!(config.max_pages(ScrapeTargetType::ProductDetail), 1);
    }
}
