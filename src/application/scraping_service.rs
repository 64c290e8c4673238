//! Job lifecycle management around the crawl orchestrator
//!
//! Every public scrape method follows the same shape: create a pending job,
//! move it to running, hand the target to the orchestrator, then settle the
//! job as completed (with an outcome payload) or failed (with the error text
//! captured verbatim). A failed run is still a successfully-handled request:
//! the failure lives in the returned job, not in the `Result`.

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{error, info};

use crate::domain::{ScrapeJob, ScrapeTargetType};
use crate::infrastructure::catalog_repository::CatalogRepository;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::crawler::CrawlOrchestrator;
use crate::infrastructure::parsing::ScrapeContext;
use crate::infrastructure::scrape_job_repository::ScrapeJobRepository;

pub struct ScrapingService {
    orchestrator: CrawlOrchestrator,
    jobs: ScrapeJobRepository,
    catalog: CatalogRepository,
    config: AppConfig,
}

impl ScrapingService {
    pub fn new(
        orchestrator: CrawlOrchestrator,
        jobs: ScrapeJobRepository,
        catalog: CatalogRepository,
        config: AppConfig,
    ) -> Self {
        Self {
            orchestrator,
            jobs,
            catalog,
            config,
        }
    }

    /// Scrape top-level navigations from the site root (or an explicit seed)
    pub async fn scrape_navigation(&self, seed_url: Option<&str>) -> Result<ScrapeJob> {
        let url = seed_url
            .unwrap_or(&self.config.crawler.base_url)
            .to_string();
        let ctx = ScrapeContext::new(&self.config.crawler.base_url);
        self.execute(&url, ScrapeTargetType::Navigation, None, ctx)
            .await
    }

    /// Scrape categories under a navigation, optionally nested under a parent
    /// category
    pub async fn scrape_categories(
        &self,
        url: &str,
        navigation_id: i64,
        parent_id: Option<i64>,
    ) -> Result<ScrapeJob> {
        let ctx = ScrapeContext::new(&self.config.crawler.base_url)
            .with_navigation(navigation_id, parent_id);
        self.execute(
            url,
            ScrapeTargetType::Category,
            Some(&navigation_id.to_string()),
            ctx,
        )
        .await
    }

    /// Scrape a category's product listing, paginating from `offset` in steps
    /// of `limit`
    pub async fn scrape_products(
        &self,
        url: &str,
        category_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<ScrapeJob> {
        let ctx = ScrapeContext::new(&self.config.crawler.base_url)
            .with_category(category_id)
            .with_pagination(limit, offset);
        self.execute(
            url,
            ScrapeTargetType::Product,
            Some(&category_id.to_string()),
            ctx,
        )
        .await
    }

    /// Scrape the detail page (and reviews) of an already-persisted product.
    /// The target URL defaults to the product's stored source URL.
    pub async fn scrape_product_detail(
        &self,
        product_id: i64,
        url: Option<&str>,
    ) -> Result<ScrapeJob> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .with_context(|| format!("product not found: {product_id}"))?;
        let url = url.unwrap_or(&product.source_url).to_string();
        let ctx = ScrapeContext::new(&self.config.crawler.base_url).with_product(product_id);
        self.execute(
            &url,
            ScrapeTargetType::ProductDetail,
            Some(&product_id.to_string()),
            ctx,
        )
        .await
    }

    pub async fn get_job(&self, job_id: i64) -> Result<Option<ScrapeJob>> {
        self.jobs.get_job(job_id).await
    }

    pub async fn list_jobs(
        &self,
        status: Option<crate::domain::ScrapeJobStatus>,
        limit: i64,
    ) -> Result<Vec<ScrapeJob>> {
        self.jobs.list_jobs(status, limit).await
    }

    async fn execute(
        &self,
        url: &str,
        target_type: ScrapeTargetType,
        target_id: Option<&str>,
        ctx: ScrapeContext,
    ) -> Result<ScrapeJob> {
        let job = self.jobs.create_job(url, target_type, target_id).await?;
        // Transitions on a vanished row are no-ops; fall back to the last
        // view of the job rather than failing the request.
        let job = self.jobs.mark_running(job.id).await?.unwrap_or(job);
        info!(job_id = job.id, %url, target_type = %target_type, "scrape job running");

        match self.orchestrator.run(url, target_type, &ctx).await {
            Ok(summary) => {
                let payload = json!({
                    "pages_visited": summary.pages_visited,
                    "records_upserted": summary.records_upserted,
                });
                let job = self.jobs.mark_completed(job.id, &payload).await?.unwrap_or(job);
                info!(job_id = job.id, "scrape job completed");
                Ok(job)
            }
            Err(err) => {
                // Records upserted before the failure stay committed; only
                // the job as a whole is marked failed.
                let message = format!("{err:#}");
                error!(job_id = job.id, error = %message, "scrape job failed");
                let job = self.jobs.mark_failed(job.id, &message).await?.unwrap_or(job);
                Ok(job)
            }
        }
    }
}
