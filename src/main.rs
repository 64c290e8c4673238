//! Command-line entry point for the catalog scraper

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use catalog_scraper::application::{RecommendationService, ScrapingService};
use catalog_scraper::domain::ScrapeJobStatus;
use catalog_scraper::infrastructure::{
    logging, AppConfig, CatalogRepository, ChromiumFetcher, CrawlOrchestrator, DatabaseConnection,
    ReviewInsertPolicy, ScrapeJobRepository,
};

#[derive(Parser)]
#[command(name = "catalog-scraper", version, about = "Scrape a retail catalog into SQLite")]
struct Cli {
    /// SQLite database URL (defaults to sqlite:data/catalog.db)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Base origin for resolving relative links
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Skip re-inserting reviews whose author and text already exist
    #[arg(long, global = true)]
    dedup_reviews: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape top-level navigations from the site root
    Navigation {
        /// Seed URL; defaults to the configured base origin
        #[arg(long)]
        url: Option<String>,
    },
    /// Scrape categories under a navigation
    Categories {
        #[arg(long)]
        url: String,
        #[arg(long)]
        navigation_id: i64,
        /// Parent category for sub-category scrapes
        #[arg(long)]
        parent_id: Option<i64>,
    },
    /// Scrape a category's product listing
    Products {
        #[arg(long)]
        url: String,
        #[arg(long)]
        category_id: i64,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Scrape the detail page and reviews of a persisted product
    Detail {
        #[arg(long)]
        product_id: i64,
        /// Override the product's stored source URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Show one scrape job
    Job {
        #[arg(long)]
        id: i64,
    },
    /// List recent scrape jobs
    Jobs {
        /// Filter by status: pending, running, completed, failed
        #[arg(long, value_parser = parse_status)]
        status: Option<ScrapeJobStatus>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Recommend related products for a persisted product
    Recommend {
        #[arg(long)]
        product_id: i64,
    },
}

#[derive(Args)]
struct PageArgs {
    /// Listing page size
    #[arg(long, default_value_t = 20)]
    limit: i64,
    /// Listing start offset
    #[arg(long, default_value_t = 0)]
    offset: i64,
}

fn parse_status(s: &str) -> Result<ScrapeJobStatus, String> {
    ScrapeJobStatus::parse(s).ok_or_else(|| format!("unknown job status: {s}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn try_main() -> Result<()> {
    logging::init_logging()?;
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(url) = &cli.database_url {
        config.database_url = url.clone();
    }
    if let Some(url) = &cli.base_url {
        config.crawler.base_url = url.clone();
    }
    if cli.dedup_reviews {
        config.review_insert_policy = ReviewInsertPolicy::SkipDuplicateText;
    }

    let db = DatabaseConnection::new(&config.database_url).await?;
    db.initialize_schema().await?;
    let catalog = CatalogRepository::new(db.pool().clone(), config.review_insert_policy);
    let jobs = ScrapeJobRepository::new(db.pool().clone());

    match cli.command {
        Command::Job { id } => {
            let job = jobs
                .get_job(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("scrape job not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Command::Jobs { status, limit } => {
            let listed = jobs.list_jobs(status, limit).await?;
            println!("{}", serde_json::to_string_pretty(&listed)?);
        }
        Command::Recommend { product_id } => {
            let service = RecommendationService::new(catalog);
            let related = service.recommend(product_id).await?;
            println!("{}", serde_json::to_string_pretty(&related)?);
        }
        command => {
            let fetcher = Arc::new(
                ChromiumFetcher::launch(
                    config.crawler.page_timeout_secs,
                    config.crawler.settle_delay_ms,
                )
                .await?,
            );
            let result = run_scrape(command, Arc::clone(&fetcher), catalog, jobs, config).await;
            match Arc::try_unwrap(fetcher) {
                Ok(fetcher) => fetcher.shutdown().await?,
                Err(_) => warn!("browser still referenced at shutdown; leaving it to the OS"),
            }
            result?;
        }
    }
    Ok(())
}

async fn run_scrape(
    command: Command,
    fetcher: Arc<ChromiumFetcher>,
    catalog: CatalogRepository,
    jobs: ScrapeJobRepository,
    config: AppConfig,
) -> Result<()> {
    let orchestrator =
        CrawlOrchestrator::new(fetcher, catalog.clone(), config.crawler.clone())?;
    let service = ScrapingService::new(orchestrator, jobs, catalog, config);

    let job = match command {
        Command::Navigation { url } => service.scrape_navigation(url.as_deref()).await?,
        Command::Categories {
            url,
            navigation_id,
            parent_id,
        } => {
            service
                .scrape_categories(&url, navigation_id, parent_id)
                .await?
        }
        Command::Products {
            url,
            category_id,
            page,
        } => {
            service
                .scrape_products(&url, category_id, page.limit, page.offset)
                .await?
        }
        Command::Detail { product_id, url } => {
            service.scrape_product_detail(product_id, url.as_deref()).await?
        }
        Command::Job { .. } | Command::Jobs { .. } | Command::Recommend { .. } => {
            unreachable!("handled before browser launch")
        }
    };

    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}
