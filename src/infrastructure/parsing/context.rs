//! Per-run context handed to extraction handlers
//!
//! Carries the identifiers a page cannot tell us about itself (owning
//! navigation, parent category, target product) plus the base URL used to
//! resolve relative links. Built fresh for every orchestrator run; never
//! shared across runs.

/// Target-type-specific parameters for one scrape run
#[derive(Debug, Clone, Default)]
pub struct ScrapeContext {
    /// Base origin for resolving relative hrefs
    pub base_url: String,
    /// Owning navigation for category extraction
    pub navigation_id: Option<i64>,
    /// Parent category for sub-category extraction
    pub parent_id: Option<i64>,
    /// Owning category for product-listing extraction
    pub category_id: Option<i64>,
    /// Target product for detail/review extraction
    pub product_id: Option<i64>,
    /// Page size for paginated listing crawls
    pub limit: Option<i64>,
    /// Starting offset for paginated listing crawls
    pub offset: Option<i64>,
}

impl ScrapeContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_navigation(mut self, navigation_id: i64, parent_id: Option<i64>) -> Self {
        self.navigation_id = Some(navigation_id);
        self.parent_id = parent_id;
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_pagination(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}
