//! Record upsert layer for scraped catalog data
//!
//! The sole writer of navigation/category/product/detail/review rows from
//! scraped input. Every upsert is a single atomic
//! `INSERT .. ON CONFLICT(<natural key>) DO UPDATE` statement: concurrent
//! jobs hitting the same natural key cannot lose updates at the statement
//! level, and the row's identity and creation timestamp survive re-scrapes.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::debug;

use crate::domain::{
    Category, CategoryRecord, Navigation, NavigationRecord, Product, ProductDetail,
    ProductDetailRecord, ProductRecord, Review, ReviewRecord,
};
use crate::infrastructure::config::ReviewInsertPolicy;

#[derive(Clone)]
pub struct CatalogRepository {
    pool: Arc<SqlitePool>,
    review_policy: ReviewInsertPolicy,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool, review_policy: ReviewInsertPolicy) -> Self {
        Self {
            pool: Arc::new(pool),
            review_policy,
        }
    }

    // ===============================
    // NAVIGATION
    // ===============================

    /// Create or update a navigation keyed by slug
    pub async fn upsert_navigation(&self, record: &NavigationRecord) -> Result<Navigation> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO navigation (title, slug, url, last_scraped_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                title = excluded.title,
                url = excluded.url,
                last_scraped_at = excluded.last_scraped_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.url)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        let navigation = self
            .find_navigation_by_slug(&record.slug)
            .await?
            .ok_or_else(|| anyhow::anyhow!("navigation missing after upsert: {}", record.slug))?;
        debug!(slug = %record.slug, id = navigation.id, "upserted navigation");
        Ok(navigation)
    }

    pub async fn find_navigation_by_slug(&self, slug: &str) -> Result<Option<Navigation>> {
        let row = sqlx::query("SELECT * FROM navigation WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|row| map_navigation(&row)))
    }

    pub async fn list_navigations(&self) -> Result<Vec<Navigation>> {
        let rows = sqlx::query("SELECT * FROM navigation ORDER BY id")
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.iter().map(map_navigation).collect())
    }

    // ===============================
    // CATEGORY
    // ===============================

    /// Create or update a category keyed by slug; refreshes the cached
    /// product count alongside the scrape timestamp
    pub async fn upsert_category(&self, record: &CategoryRecord) -> Result<Category> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO category
                (navigation_id, parent_id, title, slug, url, product_count,
                 last_scraped_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                navigation_id = excluded.navigation_id,
                parent_id = excluded.parent_id,
                title = excluded.title,
                url = excluded.url,
                product_count = excluded.product_count,
                last_scraped_at = excluded.last_scraped_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.navigation_id)
        .bind(record.parent_id)
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.url)
        .bind(record.product_count)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        let category = self
            .find_category_by_slug(&record.slug)
            .await?
            .ok_or_else(|| anyhow::anyhow!("category missing after upsert: {}", record.slug))?;
        debug!(slug = %record.slug, id = category.id, "upserted category");
        Ok(category)
    }

    pub async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM category WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|row| map_category(&row)))
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM category WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|row| map_category(&row)))
    }

    /// Recompute a category's cached product count from committed rows
    pub async fn refresh_product_count(&self, category_id: i64) -> Result<i64> {
        sqlx::query(
            r#"
            UPDATE category
            SET product_count = (SELECT COUNT(*) FROM product WHERE category_id = ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(category_id)
        .bind(Utc::now())
        .bind(category_id)
        .execute(&*self.pool)
        .await?;

        let count: i64 = sqlx::query("SELECT product_count FROM category WHERE id = ?")
            .bind(category_id)
            .fetch_one(&*self.pool)
            .await?
            .get("product_count");
        Ok(count)
    }

    // ===============================
    // PRODUCT
    // ===============================

    /// Create or update a product keyed by its source identifier. A clash on
    /// the separately-unique source URL surfaces as a persistence error.
    pub async fn upsert_product(&self, record: &ProductRecord) -> Result<Product> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO product
                (source_id, category_id, title, author, price, currency, image_url,
                 source_url, last_scraped_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_id) DO UPDATE SET
                category_id = excluded.category_id,
                title = excluded.title,
                author = excluded.author,
                price = excluded.price,
                currency = excluded.currency,
                image_url = excluded.image_url,
                source_url = excluded.source_url,
                last_scraped_at = excluded.last_scraped_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.source_id)
        .bind(record.category_id)
        .bind(&record.title)
        .bind(&record.author)
        .bind(record.price)
        .bind(&record.currency)
        .bind(&record.image_url)
        .bind(&record.source_url)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        let product = self
            .find_product_by_source_id(&record.source_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("product missing after upsert: {}", record.source_id))?;
        debug!(source_id = %record.source_id, id = product.id, "upserted product");
        Ok(product)
    }

    pub async fn find_product_by_source_id(&self, source_id: &str) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM product WHERE source_id = ?")
            .bind(source_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|row| map_product(&row)))
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM product WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|row| map_product(&row)))
    }

    pub async fn products_in_category(
        &self,
        category_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT * FROM product WHERE category_id = ? ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.iter().map(map_product).collect())
    }

    /// Random assortment of up to `limit` products sharing the source
    /// product's category or author, the source itself excluded. A product
    /// with neither category nor author has no candidates.
    pub async fn related_products(&self, product_id: i64, limit: i64) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT p.* FROM product p
            JOIN product src ON src.id = ?
            WHERE p.id != src.id
              AND ((src.category_id IS NOT NULL AND p.category_id = src.category_id)
                   OR (src.author IS NOT NULL AND p.author = src.author))
            ORDER BY RANDOM()
            LIMIT ?
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.iter().map(map_product).collect())
    }

    // ===============================
    // PRODUCT DETAIL
    // ===============================

    /// Create or update the one-to-one detail extension keyed by product id
    pub async fn upsert_product_detail(
        &self,
        product_id: i64,
        record: &ProductDetailRecord,
    ) -> Result<ProductDetail> {
        let now = Utc::now();
        let specs = record
            .specs
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let recommendations = if record.recommendations.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&record.recommendations)?)
        };

        sqlx::query(
            r#"
            INSERT INTO product_detail
                (product_id, description, specs, ratings_avg, reviews_count,
                 publisher, publication_date, isbn, recommendations, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(product_id) DO UPDATE SET
                description = excluded.description,
                specs = excluded.specs,
                ratings_avg = excluded.ratings_avg,
                reviews_count = excluded.reviews_count,
                publisher = excluded.publisher,
                publication_date = excluded.publication_date,
                isbn = excluded.isbn,
                recommendations = excluded.recommendations,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(&record.description)
        .bind(specs)
        .bind(record.ratings_avg)
        .bind(record.reviews_count)
        .bind(&record.publisher)
        .bind(&record.publication_date)
        .bind(&record.isbn)
        .bind(recommendations)
        .bind(now)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        let detail = self
            .get_product_detail(product_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("product detail missing after upsert: {product_id}"))?;
        debug!(product_id, "upserted product detail");
        Ok(detail)
    }

    pub async fn get_product_detail(&self, product_id: i64) -> Result<Option<ProductDetail>> {
        let row = sqlx::query("SELECT * FROM product_detail WHERE product_id = ?")
            .bind(product_id)
            .fetch_optional(&*self.pool)
            .await?;
        row.map(|row| map_product_detail(&row)).transpose()
    }

    // ===============================
    // REVIEW
    // ===============================

    /// Insert an extracted review. Reviews have no natural key; the insert
    /// policy decides whether an identical author+text pair is re-inserted
    /// on re-scrape.
    pub async fn insert_review(&self, product_id: i64, record: &ReviewRecord) -> Result<Option<Review>> {
        if self.review_policy == ReviewInsertPolicy::SkipDuplicateText {
            let existing = sqlx::query(
                r#"
                SELECT 1 FROM review
                WHERE product_id = ? AND text = ?
                  AND (author = ? OR (author IS NULL AND ? IS NULL))
                "#,
            )
            .bind(product_id)
            .bind(&record.text)
            .bind(&record.author)
            .bind(&record.author)
            .fetch_optional(&*self.pool)
            .await?;
            if existing.is_some() {
                debug!(product_id, "skipping duplicate review");
                return Ok(None);
            }
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO review (product_id, author, rating, text, review_date, created_at)
            VALUES (?, ?, ?, ?, NULL, ?)
            "#,
        )
        .bind(product_id)
        .bind(&record.author)
        .bind(record.rating)
        .bind(&record.text)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM review WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&*self.pool)
            .await?;
        Ok(Some(map_review(&row)))
    }

    pub async fn reviews_for_product(&self, product_id: i64) -> Result<Vec<Review>> {
        let rows = sqlx::query("SELECT * FROM review WHERE product_id = ? ORDER BY id")
            .bind(product_id)
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.iter().map(map_review).collect())
    }
}

fn map_navigation(row: &SqliteRow) -> Navigation {
    Navigation {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        url: row.get("url"),
        last_scraped_at: row.get("last_scraped_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn map_category(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        navigation_id: row.get("navigation_id"),
        parent_id: row.get("parent_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        url: row.get("url"),
        product_count: row.get("product_count"),
        last_scraped_at: row.get("last_scraped_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn map_product(row: &SqliteRow) -> Product {
    Product {
        id: row.get("id"),
        source_id: row.get("source_id"),
        category_id: row.get("category_id"),
        title: row.get("title"),
        author: row.get("author"),
        price: row.get("price"),
        currency: row.get("currency"),
        image_url: row.get("image_url"),
        source_url: row.get("source_url"),
        last_scraped_at: row.get("last_scraped_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn map_product_detail(row: &SqliteRow) -> Result<ProductDetail> {
    let specs: Option<String> = row.get("specs");
    let recommendations: Option<String> = row.get("recommendations");
    Ok(ProductDetail {
        id: row.get("id"),
        product_id: row.get("product_id"),
        description: row.get("description"),
        specs: specs.map(|s| serde_json::from_str(&s)).transpose()?,
        ratings_avg: row.get("ratings_avg"),
        reviews_count: row.get("reviews_count"),
        publisher: row.get("publisher"),
        publication_date: row.get("publication_date"),
        isbn: row.get("isbn"),
        recommendations: recommendations
            .map(|s| serde_json::from_str(&s))
            .transpose()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn map_review(row: &SqliteRow) -> Review {
    Review {
        id: row.get("id"),
        product_id: row.get("product_id"),
        author: row.get("author"),
        rating: row.get("rating"),
        text: row.get("text"),
        review_date: row.get("review_date"),
        created_at: row.get("created_at"),
    }
}
