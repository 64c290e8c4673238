//! Bounded crawl orchestration
//!
//! One `run` call visits the pages belonging to a single scrape target,
//! dispatches each rendered page to the extraction handler for the target
//! type, and forwards every extracted record to the upsert layer one at a
//! time. Page-count bounds and the fetcher's per-page timeout are the only
//! things standing between a misbehaving site and an unbounded run, so both
//! are enforced here unconditionally.
//!
//! Failures propagate to the caller after whatever was already upserted has
//! committed. The pipeline is at-least-once per record, not atomic per run.

use anyhow::{Context, Result};
use scraper::Html;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::domain::ScrapeTargetType;
use crate::infrastructure::browser::PageFetcher;
use crate::infrastructure::catalog_repository::CatalogRepository;
use crate::infrastructure::config::CrawlerConfig;
use crate::infrastructure::parsing::{
    CategoryParser, ExtractionHandler, NavigationParser, ProductDetailParser, ProductListParser,
    ScrapeContext,
};

const DEFAULT_PAGE_SIZE: i64 = 20;

/// Outcome counters for one orchestrator run
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CrawlSummary {
    pub pages_visited: u32,
    pub records_upserted: u64,
}

pub struct CrawlOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    catalog: CatalogRepository,
    config: CrawlerConfig,
    navigation_parser: NavigationParser,
    category_parser: CategoryParser,
    product_list_parser: ProductListParser,
    product_detail_parser: ProductDetailParser,
}

impl CrawlOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        catalog: CatalogRepository,
        config: CrawlerConfig,
    ) -> Result<Self> {
        Ok(Self {
            fetcher,
            catalog,
            config,
            navigation_parser: NavigationParser::new()?,
            category_parser: CategoryParser::new()?,
            product_list_parser: ProductListParser::new()?,
            product_detail_parser: ProductDetailParser::new()?,
        })
    }

    /// Visit the target's page(s) and persist everything extracted.
    /// Already-upserted records stay committed when a later page fails.
    pub async fn run(
        &self,
        seed_url: &str,
        target_type: ScrapeTargetType,
        ctx: &ScrapeContext,
    ) -> Result<CrawlSummary> {
        info!(%seed_url, target_type = %target_type, "starting crawl run");
        let summary = match target_type {
            ScrapeTargetType::Navigation => self.run_navigation(seed_url, ctx).await?,
            ScrapeTargetType::Category => self.run_category(seed_url, ctx).await?,
            ScrapeTargetType::Product => self.run_product_listing(seed_url, ctx).await?,
            ScrapeTargetType::ProductDetail => self.run_product_detail(seed_url, ctx).await?,
        };
        info!(
            pages_visited = summary.pages_visited,
            records_upserted = summary.records_upserted,
            "crawl run finished"
        );
        Ok(summary)
    }

    /// Single-page runs still honor their configured page bound: a zero
    /// bound means no page may be visited, so the run ends before fetching.
    fn exhausted_bound(&self, target_type: ScrapeTargetType) -> Option<CrawlSummary> {
        if self.config.max_pages(target_type) == 0 {
            debug!(target_type = %target_type, "page bound is zero, skipping fetch");
            return Some(CrawlSummary {
                pages_visited: 0,
                records_upserted: 0,
            });
        }
        None
    }

    async fn fetch_page(&self, url: &str) -> Result<Html> {
        let html = self
            .fetcher
            .fetch(url)
            .await
            .with_context(|| format!("failed to load page: {url}"))?;
        Ok(Html::parse_document(&html))
    }

    async fn run_navigation(&self, seed_url: &str, ctx: &ScrapeContext) -> Result<CrawlSummary> {
        if let Some(summary) = self.exhausted_bound(ScrapeTargetType::Navigation) {
            return Ok(summary);
        }
        let page = self.fetch_page(seed_url).await?;
        let records = self.navigation_parser.extract(&page, ctx)?;
        debug!(count = records.len(), "extracted navigation records");

        let mut upserted = 0;
        for record in &records {
            self.catalog.upsert_navigation(record).await?;
            upserted += 1;
        }
        Ok(CrawlSummary {
            pages_visited: 1,
            records_upserted: upserted,
        })
    }

    async fn run_category(&self, seed_url: &str, ctx: &ScrapeContext) -> Result<CrawlSummary> {
        if let Some(summary) = self.exhausted_bound(ScrapeTargetType::Category) {
            return Ok(summary);
        }
        let page = self.fetch_page(seed_url).await?;
        let records = self.category_parser.extract(&page, ctx)?;
        debug!(count = records.len(), "extracted category records");

        let mut upserted = 0;
        for record in &records {
            self.catalog.upsert_category(record).await?;
            upserted += 1;
        }
        Ok(CrawlSummary {
            pages_visited: 1,
            records_upserted: upserted,
        })
    }

    /// Walks listing pages via `limit`/`offset` query parameters until a page
    /// yields no cards or the page bound is hit, then refreshes the owning
    /// category's cached product count from committed rows.
    async fn run_product_listing(
        &self,
        seed_url: &str,
        ctx: &ScrapeContext,
    ) -> Result<CrawlSummary> {
        let max_pages = self.config.max_pages(ScrapeTargetType::Product);
        let limit = ctx.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let mut offset = ctx.offset.unwrap_or(0);

        let mut pages_visited = 0;
        let mut upserted = 0;
        while pages_visited < max_pages {
            let page_url = paginated_url(seed_url, limit, offset)?;
            let page = self.fetch_page(&page_url).await?;
            pages_visited += 1;

            let records = self.product_list_parser.extract(&page, ctx)?;
            debug!(page_url = %page_url, count = records.len(), "extracted product records");
            if records.is_empty() {
                break;
            }
            for record in &records {
                self.catalog.upsert_product(record).await?;
                upserted += 1;
            }
            offset += limit;
        }

        if let Some(category_id) = ctx.category_id {
            let count = self.catalog.refresh_product_count(category_id).await?;
            debug!(category_id, count, "refreshed category product count");
        }
        Ok(CrawlSummary {
            pages_visited,
            records_upserted: upserted,
        })
    }

    async fn run_product_detail(
        &self,
        seed_url: &str,
        ctx: &ScrapeContext,
    ) -> Result<CrawlSummary> {
        let product_id = ctx
            .product_id
            .context("product detail crawl requires a target product id")?;
        if let Some(summary) = self.exhausted_bound(ScrapeTargetType::ProductDetail) {
            return Ok(summary);
        }

        let page = self.fetch_page(seed_url).await?;
        let (detail, reviews) = self.product_detail_parser.extract(&page, ctx)?;
        debug!(product_id, reviews = reviews.len(), "extracted product detail");

        self.catalog.upsert_product_detail(product_id, &detail).await?;
        let mut upserted = 1;
        for review in &reviews {
            if self.catalog.insert_review(product_id, review).await?.is_some() {
                upserted += 1;
            }
        }
        Ok(CrawlSummary {
            pages_visited: 1,
            records_upserted: upserted,
        })
    }
}

fn paginated_url(seed_url: &str, limit: i64, offset: i64) -> Result<String> {
    let mut url =
        Url::parse(seed_url).with_context(|| format!("invalid listing url: {seed_url}"))?;
    url.query_pairs_mut()
        .append_pair("limit", &limit.to_string())
        .append_pair("offset", &offset.to_string());
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::ReviewInsertPolicy;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serves canned HTML per URL; URLs without an entry fail like a
    /// navigation timeout would.
    struct StubFetcher {
        pages: HashMap<String, String>,
        visited: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn new(pages: Vec<(&str, &str)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
                visited: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.visited.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("page load timed out: {url}"))
        }
    }

    async fn test_harness(
        fetcher: StubFetcher,
    ) -> (TempDir, CatalogRepository, CrawlOrchestrator) {
        let temp_dir = TempDir::new().unwrap();
        let database_url = format!("sqlite:{}", temp_dir.path().join("test.db").display());
        let db = DatabaseConnection::new(&database_url).await.unwrap();
        db.initialize_schema().await.unwrap();
        let catalog =
            CatalogRepository::new(db.pool().clone(), ReviewInsertPolicy::AppendAlways);
        let orchestrator = CrawlOrchestrator::new(
            Arc::new(fetcher),
            catalog.clone(),
            CrawlerConfig::default(),
        )
        .unwrap();
        (temp_dir, catalog, orchestrator)
    }

    fn listing_page(cards: &[(&str, &str)]) -> String {
        let body: String = cards
            .iter()
            .map(|(id, title)| {
                format!(
                    r#"<div class="product-card"><a href="/p/{id}"><h3 class="title">{title}</h3></a><span class="price">£5.00</span></div>"#
                )
            })
            .collect();
        format!("<html><body>{body}</body></html>")
    }

    #[tokio::test]
    async fn navigation_run_upserts_extracted_links() {
        let fetcher = StubFetcher::new(vec![(
            "https://shop.test/",
            r#"<html><body><nav>
                <a href="/fiction">Fiction</a>
                <a href="/non-fiction">Non-Fiction Books</a>
            </nav></body></html>"#,
        )]);
        let (_dir, catalog, orchestrator) = test_harness(fetcher).await;

        let ctx = ScrapeContext::new("https://shop.test");
        let summary = orchestrator
            .run("https://shop.test/", ScrapeTargetType::Navigation, &ctx)
            .await
            .unwrap();

        assert_eq!(summary.pages_visited, 1);
        assert_eq!(summary.records_upserted, 2);
        let navigations = catalog.list_navigations().await.unwrap();
        assert_eq!(navigations.len(), 2);
        assert!(navigations.iter().any(|n| n.slug == "non-fiction-books"));
    }

    #[tokio::test]
    async fn empty_page_is_a_successful_zero_record_run() {
        let fetcher = StubFetcher::new(vec![(
            "https://shop.test/",
            "<html><body><p>maintenance</p></body></html>",
        )]);
        let (_dir, catalog, orchestrator) = test_harness(fetcher).await;

        let ctx = ScrapeContext::new("https://shop.test");
        let summary = orchestrator
            .run("https://shop.test/", ScrapeTargetType::Navigation, &ctx)
            .await
            .unwrap();

        assert_eq!(summary.records_upserted, 0);
        assert!(catalog.list_navigations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_run_paginates_until_an_empty_page() {
        let fetcher = StubFetcher::new(vec![
            (
                "https://shop.test/crime?limit=2&offset=0",
                &listing_page(&[("a", "Book A"), ("b", "Book B")]),
            ),
            (
                "https://shop.test/crime?limit=2&offset=2",
                &listing_page(&[("c", "Book C")]),
            ),
            ("https://shop.test/crime?limit=2&offset=4", &listing_page(&[])),
        ]);
        let (_dir, catalog, orchestrator) = test_harness(fetcher).await;

        let navigation = catalog
            .upsert_navigation(&crate::domain::NavigationRecord {
                title: "Books".to_string(),
                slug: "books".to_string(),
                url: "https://shop.test/books".to_string(),
            })
            .await
            .unwrap();
        let category = catalog
            .upsert_category(&crate::domain::CategoryRecord {
                title: "Crime".to_string(),
                slug: "crime".to_string(),
                url: "https://shop.test/crime".to_string(),
                navigation_id: navigation.id,
                parent_id: None,
                product_count: 0,
            })
            .await
            .unwrap();

        let ctx = ScrapeContext::new("https://shop.test")
            .with_category(category.id)
            .with_pagination(2, 0);
        let summary = orchestrator
            .run("https://shop.test/crime", ScrapeTargetType::Product, &ctx)
            .await
            .unwrap();

        assert_eq!(summary.pages_visited, 3);
        assert_eq!(summary.records_upserted, 3);
        let reloaded = catalog.get_category(category.id).await.unwrap().unwrap();
        assert_eq!(reloaded.product_count, 3);
    }

    #[tokio::test]
    async fn listing_failure_keeps_earlier_pages_committed() {
        // Second page has no stub entry, so its fetch fails.
        let fetcher = StubFetcher::new(vec![(
            "https://shop.test/crime?limit=2&offset=0",
            &listing_page(&[("a", "Book A"), ("b", "Book B")]),
        )]);
        let (_dir, catalog, orchestrator) = test_harness(fetcher).await;

        let ctx = ScrapeContext::new("https://shop.test").with_pagination(2, 0);
        let err = orchestrator
            .run("https://shop.test/crime", ScrapeTargetType::Product, &ctx)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("offset=2"));
        assert!(catalog
            .find_product_by_source_id("a")
            .await
            .unwrap()
            .is_some());
        assert!(catalog
            .find_product_by_source_id("b")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn detail_run_upserts_detail_and_reviews() {
        let fetcher = StubFetcher::new(vec![(
            "https://shop.test/p/abc",
            r#"<html><body>
                <div class="description">A gripping tale.</div>
                <div class="rating">4.5 out of 5</div>
                <div class="review">
                    <span class="review-author">Ann</span>
                    <span class="review-rating">5</span>
                    <p class="review-text">Loved it</p>
                </div>
            </body></html>"#,
        )]);
        let (_dir, catalog, orchestrator) = test_harness(fetcher).await;

        let product = catalog
            .upsert_product(&crate::domain::ProductRecord {
                source_id: "abc".to_string(),
                title: "Book".to_string(),
                author: None,
                price: None,
                currency: "GBP".to_string(),
                image_url: None,
                source_url: "https://shop.test/p/abc".to_string(),
                category_id: None,
            })
            .await
            .unwrap();

        let ctx = ScrapeContext::new("https://shop.test").with_product(product.id);
        let summary = orchestrator
            .run(
                "https://shop.test/p/abc",
                ScrapeTargetType::ProductDetail,
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(summary.records_upserted, 2);
        let detail = catalog.get_product_detail(product.id).await.unwrap().unwrap();
        assert_eq!(detail.description.as_deref(), Some("A gripping tale."));
        assert_eq!(detail.ratings_avg, Some(4.5));
        assert_eq!(catalog.reviews_for_product(product.id).await.unwrap().len(), 1);
    }

    async fn harness_with_config(
        fetcher: Arc<StubFetcher>,
        config: CrawlerConfig,
    ) -> (TempDir, CatalogRepository, CrawlOrchestrator) {
        let temp_dir = TempDir::new().unwrap();
        let database_url = format!("sqlite:{}", temp_dir.path().join("test.db").display());
        let db = DatabaseConnection::new(&database_url).await.unwrap();
        db.initialize_schema().await.unwrap();
        let catalog =
            CatalogRepository::new(db.pool().clone(), ReviewInsertPolicy::AppendAlways);
        let orchestrator = CrawlOrchestrator::new(fetcher, catalog.clone(), config).unwrap();
        (temp_dir, catalog, orchestrator)
    }

    #[tokio::test]
    async fn zero_page_bound_ends_the_run_before_any_fetch() {
        let fetcher = Arc::new(StubFetcher::new(vec![]));
        let mut config = CrawlerConfig::default();
        config.max_pages_navigation = 0;
        let (_dir, _catalog, orchestrator) =
            harness_with_config(fetcher.clone(), config).await;

        let ctx = ScrapeContext::new("https://shop.test");
        let summary = orchestrator
            .run("https://shop.test/", ScrapeTargetType::Navigation, &ctx)
            .await
            .unwrap();

        assert_eq!(summary.pages_visited, 0);
        assert_eq!(summary.records_upserted, 0);
        assert!(fetcher.visited.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_page_bound_caps_pagination() {
        // Both pages carry cards; the bound, not an empty page, ends the run.
        let fetcher = Arc::new(StubFetcher::new(vec![
            (
                "https://shop.test/crime?limit=1&offset=0",
                &listing_page(&[("a", "Book A")]),
            ),
            (
                "https://shop.test/crime?limit=1&offset=1",
                &listing_page(&[("b", "Book B")]),
            ),
        ]));
        let mut config = CrawlerConfig::default();
        config.max_pages_product = 2;
        let (_dir, catalog, orchestrator) =
            harness_with_config(fetcher.clone(), config).await;

        let ctx = ScrapeContext::new("https://shop.test").with_pagination(1, 0);
        let summary = orchestrator
            .run("https://shop.test/crime", ScrapeTargetType::Product, &ctx)
            .await
            .unwrap();

        assert_eq!(summary.pages_visited, 2);
        assert_eq!(summary.records_upserted, 2);
        assert_eq!(fetcher.visited.lock().unwrap().len(), 2);
        assert!(catalog.find_product_by_source_id("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn detail_run_without_product_id_is_rejected() {
        let fetcher = StubFetcher::new(vec![]);
        let (_dir, _catalog, orchestrator) = test_harness(fetcher).await;

        let ctx = ScrapeContext::new("https://shop.test");
        let err = orchestrator
            .run(
                "https://shop.test/p/abc",
                ScrapeTargetType::ProductDetail,
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("product id"));
    }
}
