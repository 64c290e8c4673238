//! Catalog entities and extraction records
//!
//! Persisted entities mirror the SQLite schema; `*Record` types carry the
//! fields an extraction handler can harvest from a rendered page, before any
//! storage identity exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level department in the site's navigation taxonomy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Navigation {
    pub id: i64,
    pub title: String,
    /// Globally unique, derived from the title
    pub slug: String,
    pub url: Option<String>,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Node in a category tree rooted at a Navigation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub navigation_id: i64,
    /// Self-referential; forms a forest within one navigation
    pub parent_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub url: Option<String>,
    /// Cached count, recomputed after listing runs
    pub product_count: i64,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog item from a listing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    /// Natural key, stable across re-scrapes
    pub source_id: String,
    pub category_id: Option<i64>,
    pub title: String,
    pub author: Option<String>,
    pub price: Option<f64>,
    /// 3-letter code, GBP when unrecognized
    pub currency: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One-to-one extension of Product with detail-page fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: i64,
    pub product_id: i64,
    pub description: Option<String>,
    /// Arbitrary key/value spec mapping (page count, format, ...)
    pub specs: Option<serde_json::Value>,
    pub ratings_avg: Option<f64>,
    pub reviews_count: i64,
    pub publisher: Option<String>,
    /// Free text, not strictly parsed
    pub publication_date: Option<String>,
    pub isbn: Option<String>,
    /// Related items harvested from the detail page itself
    pub recommendations: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single customer review belonging to a Product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub product_id: i64,
    pub author: Option<String>,
    pub rating: Option<i64>,
    pub text: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Navigation entry extracted from a rendered page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRecord {
    pub title: String,
    pub slug: String,
    pub url: String,
}

/// Category link extracted from a rendered page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub title: String,
    pub slug: String,
    pub url: String,
    pub navigation_id: i64,
    pub parent_id: Option<i64>,
    pub product_count: i64,
}

/// Product card extracted from a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub source_id: String,
    pub title: String,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub category_id: Option<i64>,
}

/// Related-item pair harvested from a detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedItem {
    pub title: String,
    pub url: String,
}

/// Detail-page fields extracted for one product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDetailRecord {
    pub description: Option<String>,
    pub specs: Option<serde_json::Value>,
    pub ratings_avg: Option<f64>,
    pub reviews_count: i64,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub isbn: Option<String>,
    pub recommendations: Vec<RelatedItem>,
}

/// Individual review extracted from a detail page
///
/// Handlers skip review elements without text content, so `text` is
/// always present here even though the stored column is nullable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub author: Option<String>,
    pub rating: Option<i64>,
    pub text: String,
}
