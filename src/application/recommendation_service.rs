//! Related-product recommendations over persisted catalog data
//!
//! Recommends up to six products sharing the source product's category or
//! author. Ordering is deliberately random; the contract is a plausible
//! assortment, not a relevance ranking.

use anyhow::{Context, Result};
use tracing::debug;

use crate::domain::Product;
use crate::infrastructure::catalog_repository::CatalogRepository;

const RECOMMENDATION_LIMIT: i64 = 6;

pub struct RecommendationService {
    catalog: CatalogRepository,
}

impl RecommendationService {
    pub fn new(catalog: CatalogRepository) -> Self {
        Self { catalog }
    }

    /// Up to six products related to `product_id` by category or author,
    /// never including the source product. A product with neither category
    /// nor author yields an empty list.
    pub async fn recommend(&self, product_id: i64) -> Result<Vec<Product>> {
        // Distinguish "unknown product" from "no candidates".
        self.catalog
            .get_product(product_id)
            .await?
            .with_context(|| format!("product not found: {product_id}"))?;

        let related = self
            .catalog
            .related_products(product_id, RECOMMENDATION_LIMIT)
            .await?;
        debug!(product_id, count = related.len(), "computed recommendations");
        Ok(related)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductRecord;
    use crate::infrastructure::config::ReviewInsertPolicy;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use tempfile::TempDir;

    async fn test_service() -> (TempDir, CatalogRepository, RecommendationService) {
        let temp_dir = TempDir::new().unwrap();
        let database_url = format!("sqlite:{}", temp_dir.path().join("test.db").display());
        let db = DatabaseConnection::new(&database_url).await.unwrap();
        db.initialize_schema().await.unwrap();
        let catalog =
            CatalogRepository::new(db.pool().clone(), ReviewInsertPolicy::AppendAlways);
        (temp_dir, catalog.clone(), RecommendationService::new(catalog))
    }

    fn by_author(source_id: &str, author: &str) -> ProductRecord {
        ProductRecord {
            source_id: source_id.to_string(),
            title: source_id.to_string(),
            author: Some(author.to_string()),
            price: None,
            currency: "GBP".to_string(),
            image_url: None,
            source_url: format!("https://example.com/p/{source_id}"),
            category_id: None,
        }
    }

    #[tokio::test]
    async fn recommendations_are_bounded_and_exclude_source() {
        let (_dir, catalog, service) = test_service().await;

        let source = catalog.upsert_product(&by_author("src", "Herbert")).await.unwrap();
        for i in 0..10 {
            catalog
                .upsert_product(&by_author(&format!("p{i}"), "Herbert"))
                .await
                .unwrap();
        }

        let related = service.recommend(source.id).await.unwrap();
        assert_eq!(related.len(), 6);
        assert!(related.iter().all(|p| p.id != source.id));
    }

    #[tokio::test]
    async fn unknown_product_is_an_error() {
        let (_dir, _catalog, service) = test_service().await;
        assert!(service.recommend(999).await.is_err());
    }
}
