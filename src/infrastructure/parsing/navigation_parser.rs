//! Navigation taxonomy extraction
//!
//! Scans anchor elements in the primary navigation regions of the landing
//! page and turns them into slug-keyed navigation records.

use scraper::Html;
use tracing::debug;

use super::context::ScrapeContext;
use super::error::ParsingResult;
use super::text::slugify;
use super::{compile_selector, resolve_url, ExtractionHandler};
use crate::domain::NavigationRecord;

pub struct NavigationParser {
    links: scraper::Selector,
}

impl NavigationParser {
    pub fn new() -> ParsingResult<Self> {
        Ok(Self {
            links: compile_selector("nav a, .navigation a, .main-nav a")?,
        })
    }
}

impl ExtractionHandler for NavigationParser {
    type Output = Vec<NavigationRecord>;

    fn extract(&self, html: &Html, ctx: &ScrapeContext) -> ParsingResult<Self::Output> {
        let mut records = Vec::new();

        for link in html.select(&self.links) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let title = link.text().collect::<String>().trim().to_string();

            if title.is_empty()
                || href.is_empty()
                || href.starts_with('#')
                || href.contains("mailto")
            {
                continue;
            }

            let slug = slugify(&title);
            if slug.is_empty() {
                continue;
            }

            let url = match resolve_url(href, &ctx.base_url) {
                Ok(url) => url,
                Err(err) => {
                    debug!(href, %err, "skipping navigation anchor with unresolvable href");
                    continue;
                }
            };

            records.push(NavigationRecord { title, slug, url });
        }

        debug!(count = records.len(), "extracted navigation records");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ScrapeContext {
        ScrapeContext::new("https://example.com")
    }

    #[test]
    fn extracts_anchors_from_navigation_regions() {
        let html = Html::parse_document(
            r#"<nav>
                <a href="/fiction">Fiction</a>
                <a href="https://example.com/non-fiction">Non-Fiction Books</a>
            </nav>"#,
        );
        let parser = NavigationParser::new().unwrap();
        let records = parser.extract(&html, &ctx()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].slug, "fiction");
        assert_eq!(records[0].url, "https://example.com/fiction");
        assert_eq!(records[1].slug, "non-fiction-books");
    }

    #[test]
    fn discards_fragment_and_mail_anchors() {
        let html = Html::parse_document(
            r##"<nav>
                <a href="#top">Back to top</a>
                <a href="mailto:help@example.com">Contact</a>
                <a href="">Empty</a>
                <a href="/kids">Children's Books</a>
            </nav>"##,
        );
        let parser = NavigationParser::new().unwrap();
        let records = parser.extract(&html, &ctx()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].slug, "children-s-books");
    }

    #[test]
    fn page_without_navigation_yields_no_records() {
        let html = Html::parse_document("<main><p>nothing here</p></main>");
        let parser = NavigationParser::new().unwrap();
        assert!(parser.extract(&html, &ctx()).unwrap().is_empty());
    }
}
