//! Product listing extraction
//!
//! Scans product-card elements on a listing page. The natural key is the
//! last URL path segment; when that cannot be determined a random identifier
//! is derived instead, which keeps the record but forfeits dedup against
//! future scrapes of the same item.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::context::ScrapeContext;
use super::error::ParsingResult;
use super::text::parse_price;
use super::{compile_selector, resolve_url, select_text, ExtractionHandler};
use crate::domain::ProductRecord;

pub struct ProductListParser {
    cards: Selector,
    link: Selector,
    title: Selector,
    author: Selector,
    price: Selector,
    image: Selector,
}

impl ProductListParser {
    pub fn new() -> ParsingResult<Self> {
        Ok(Self {
            cards: compile_selector(".product-card, .product-item, .book-item")?,
            link: compile_selector("a")?,
            title: compile_selector(".title, .product-title, .book-title")?,
            author: compile_selector(".author, .product-author")?,
            price: compile_selector(".price, .product-price")?,
            image: compile_selector("img")?,
        })
    }

    fn extract_card(&self, card: &ElementRef<'_>, ctx: &ScrapeContext) -> Option<ProductRecord> {
        let href = card
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))?;
        let title = select_text(card, &self.title)?;

        let source_url = match resolve_url(href, &ctx.base_url) {
            Ok(url) => url,
            Err(err) => {
                debug!(href, %err, "skipping product card with unresolvable href");
                return None;
            }
        };

        let parsed_price = select_text(card, &self.price).and_then(|label| parse_price(&label));
        let image_url = card.select(&self.image).next().and_then(|img| {
            img.value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))
                .map(|s| s.to_string())
        });

        Some(ProductRecord {
            source_id: source_id_from_url(&source_url),
            title,
            author: select_text(card, &self.author),
            price: parsed_price.as_ref().map(|p| p.amount),
            currency: parsed_price
                .map(|p| p.currency)
                .unwrap_or_else(|| "GBP".to_string()),
            image_url,
            source_url,
            category_id: ctx.category_id,
        })
    }
}

impl ExtractionHandler for ProductListParser {
    type Output = Vec<ProductRecord>;

    fn extract(&self, html: &Html, ctx: &ScrapeContext) -> ParsingResult<Self::Output> {
        let records: Vec<ProductRecord> = html
            .select(&self.cards)
            .filter_map(|card| self.extract_card(&card, ctx))
            .collect();

        debug!(count = records.len(), category_id = ?ctx.category_id, "extracted product records");
        Ok(records)
    }
}

/// Natural key from the last non-empty URL path segment.
///
/// Falls back to a random identifier when the URL has no usable segment;
/// such records cannot be deduplicated across runs (known limitation).
fn source_id_from_url(source_url: &str) -> String {
    url::Url::parse(source_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                .map(|s| s.to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string())
}
