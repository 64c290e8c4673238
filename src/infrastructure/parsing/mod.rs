//! HTML extraction handlers for the catalog pipeline
//!
//! One handler per scrape target type, each a pure mapping from a rendered
//! page plus a [`ScrapeContext`] to zero-or-more records. Selector sets are a
//! fixed best-effort contract against the source site, compiled once at
//! handler construction so drift shows up as a loud constructor error rather
//! than a silent empty result.

pub mod context;
pub mod error;
pub mod text;

pub mod category_parser;
pub mod navigation_parser;
pub mod product_detail_parser;
pub mod product_list_parser;

pub use category_parser::CategoryParser;
pub use context::ScrapeContext;
pub use error::{ParsingError, ParsingResult};
pub use navigation_parser::NavigationParser;
pub use product_detail_parser::ProductDetailParser;
pub use product_list_parser::ProductListParser;

use scraper::{ElementRef, Html, Selector};

/// A typed extraction handler over a rendered page
pub trait ExtractionHandler {
    type Output;

    /// Extract records from the page. A page matching no elements is a valid
    /// empty extraction, not an error.
    fn extract(&self, html: &Html, ctx: &ScrapeContext) -> ParsingResult<Self::Output>;
}

/// Compile a selector list, failing loudly on any invalid selector
pub(crate) fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, e))
}

/// Trimmed text content of the first descendant matching `selector`
pub(crate) fn select_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Trimmed text content of the first document element matching `selector`
pub(crate) fn select_document_text(html: &Html, selector: &Selector) -> Option<String> {
    html.select(selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Resolve an href against the site's base origin.
///
/// Already-absolute URLs pass through untouched; anything else is joined
/// onto the base. Only the base URL being unparseable is an error — a bad
/// href is the page's fault and surfaces as a skipped record at the caller.
pub(crate) fn resolve_url(href: &str, base_url: &str) -> ParsingResult<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_string());
    }

    let base = url::Url::parse(base_url)
        .map_err(|e| ParsingError::url_resolution_failed(base_url, e, None))?;
    let resolved = base
        .join(href)
        .map_err(|e| ParsingError::url_resolution_failed(href, e, Some(base_url)))?;
    Ok(resolved.to_string())
}
