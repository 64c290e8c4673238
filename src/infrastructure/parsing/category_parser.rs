//! Category tree extraction
//!
//! Scans category and sub-category link elements. The owning navigation id
//! and optional parent id are not inferable from the page, so they come from
//! the caller via [`ScrapeContext`] and are attached to every record.

use scraper::{Html, Selector};
use tracing::debug;

use super::context::ScrapeContext;
use super::error::{ParsingError, ParsingResult};
use super::text::{parse_count, slugify};
use super::{compile_selector, resolve_url, select_text, ExtractionHandler};
use crate::domain::CategoryRecord;

pub struct CategoryParser {
    links: Selector,
    count_label: Selector,
}

impl CategoryParser {
    pub fn new() -> ParsingResult<Self> {
        Ok(Self {
            links: compile_selector(".category-link, .subcategory a, .category-list a")?,
            count_label: compile_selector(".count, .product-count")?,
        })
    }
}

impl ExtractionHandler for CategoryParser {
    type Output = Vec<CategoryRecord>;

    fn extract(&self, html: &Html, ctx: &ScrapeContext) -> ParsingResult<Self::Output> {
        let navigation_id = ctx
            .navigation_id
            .ok_or_else(|| ParsingError::required_field_missing("navigation_id", "scrape context"))?;

        let mut records = Vec::new();

        for link in html.select(&self.links) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            // Count label is nested inside the anchor; take the title from the
            // anchor's own text nodes so the digits don't leak into it.
            let title = link
                .text()
                .collect::<String>()
                .trim()
                .to_string();
            if title.is_empty() || href.is_empty() {
                continue;
            }

            let product_count = select_text(&link, &self.count_label)
                .map(|label| parse_count(&label))
                .unwrap_or(0);

            let title = strip_count_suffix(&title, product_count);
            let slug = slugify(&title);
            if slug.is_empty() {
                continue;
            }

            let url = match resolve_url(href, &ctx.base_url) {
                Ok(url) => url,
                Err(err) => {
                    debug!(href, %err, "skipping category anchor with unresolvable href");
                    continue;
                }
            };

            records.push(CategoryRecord {
                title,
                slug,
                url,
                navigation_id,
                parent_id: ctx.parent_id,
                product_count,
            });
        }

        debug!(count = records.len(), navigation_id, "extracted category records");
        Ok(records)
    }
}

/// Drop a trailing count label ("Crime (120)" -> "Crime") when present
fn strip_count_suffix(title: &str, count: i64) -> String {
    if count == 0 {
        return title.to_string();
    }
    title
        .trim_end_matches(|c: char| c.is_ascii_digit() || "(),. ".contains(c))
        .trim()
        .to_string()
}
