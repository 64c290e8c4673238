//! Product detail and review extraction
//!
//! Extracts the one-to-one detail record for a product (description,
//! publication data, aggregate rating, related items, spec table) plus the
//! individual reviews present on the page. Review elements without text
//! content are skipped.

use scraper::{Html, Selector};
use tracing::debug;

use super::context::ScrapeContext;
use super::error::ParsingResult;
use super::text::{first_decimal_token, first_integer_token};
use super::{compile_selector, select_document_text, select_text, ExtractionHandler};
use crate::domain::{ProductDetailRecord, RelatedItem, ReviewRecord};

pub struct ProductDetailParser {
    description: Selector,
    publisher: Selector,
    publication_date: Selector,
    isbn: Selector,
    rating: Selector,
    review_count: Selector,
    related_items: Selector,
    related_link: Selector,
    related_title: Selector,
    spec_rows: Selector,
    spec_key: Selector,
    spec_value: Selector,
    reviews: Selector,
    review_author: Selector,
    review_text: Selector,
    review_rating: Selector,
}

impl ProductDetailParser {
    pub fn new() -> ParsingResult<Self> {
        Ok(Self {
            description: compile_selector(".description, .product-description, .book-description")?,
            publisher: compile_selector(".publisher")?,
            publication_date: compile_selector(".publication-date, .publish-date")?,
            isbn: compile_selector(".isbn")?,
            rating: compile_selector(".rating, .stars, .review-rating")?,
            review_count: compile_selector(".review-count, .reviews-count")?,
            related_items: compile_selector(".recommended-item, .related-product")?,
            related_link: compile_selector("a")?,
            related_title: compile_selector(".title")?,
            spec_rows: compile_selector(".product-specs tr, .specs tr")?,
            spec_key: compile_selector("th")?,
            spec_value: compile_selector("td")?,
            reviews: compile_selector(".review, .review-item")?,
            review_author: compile_selector(".review-author, .reviewer-name")?,
            review_text: compile_selector(".review-text, .review-content")?,
            review_rating: compile_selector(".review-rating, .stars")?,
        })
    }

    fn extract_related(&self, html: &Html) -> Vec<RelatedItem> {
        html.select(&self.related_items)
            .filter_map(|item| {
                let url = item
                    .select(&self.related_link)
                    .next()
                    .and_then(|a| a.value().attr("href"))?
                    .to_string();
                let title = select_text(&item, &self.related_title)?;
                Some(RelatedItem { title, url })
            })
            .collect()
    }

    fn extract_specs(&self, html: &Html) -> Option<serde_json::Value> {
        let mut specs = serde_json::Map::new();
        for row in html.select(&self.spec_rows) {
            let Some(key) = select_text(&row, &self.spec_key) else {
                continue;
            };
            let Some(value) = select_text(&row, &self.spec_value) else {
                continue;
            };
            specs.insert(key, serde_json::Value::String(value));
        }
        if specs.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(specs))
        }
    }

    fn extract_reviews(&self, html: &Html) -> Vec<ReviewRecord> {
        html.select(&self.reviews)
            .filter_map(|review| {
                // Reviews without text content carry no signal; skip them.
                let text = select_text(&review, &self.review_text)?;
                let rating = select_text(&review, &self.review_rating)
                    .and_then(|label| first_decimal_token(&label))
                    .map(|value| value as i64);
                Some(ReviewRecord {
                    author: select_text(&review, &self.review_author),
                    rating,
                    text,
                })
            })
            .collect()
    }
}

impl ExtractionHandler for ProductDetailParser {
    type Output = (ProductDetailRecord, Vec<ReviewRecord>);

    fn extract(&self, html: &Html, _ctx: &ScrapeContext) -> ParsingResult<Self::Output> {
        let ratings_avg = select_document_text(html, &self.rating)
            .and_then(|label| first_decimal_token(&label))
            .map(|value| (value * 10.0).round() / 10.0);
        let reviews_count = select_document_text(html, &self.review_count)
            .and_then(|label| first_integer_token(&label))
            .unwrap_or(0);

        let detail = ProductDetailRecord {
            description: select_document_text(html, &self.description),
            specs: self.extract_specs(html),
            ratings_avg,
            reviews_count,
            publisher: select_document_text(html, &self.publisher),
            publication_date: select_document_text(html, &self.publication_date),
            isbn: select_document_text(html, &self.isbn),
            recommendations: self.extract_related(html),
        };
        let reviews = self.extract_reviews(html);

        debug!(
            reviews = reviews.len(),
            related = detail.recommendations.len(),
            "extracted product detail"
        );
        Ok((detail, reviews))
    }
}
