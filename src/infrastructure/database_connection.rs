//! SQLite connection pool and schema bootstrap

use std::path::Path;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");

        // sqlx does not create the database file itself.
        if !db_path.is_empty() && db_path != ":memory:" && !Path::new(db_path).exists() {
            if let Some(parent) = Path::new(db_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            std::fs::File::create(db_path)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Idempotent schema bootstrap. Natural keys carry UNIQUE constraints so
    /// the upsert layer can rely on `ON CONFLICT` instead of lookup-then-write.
    pub async fn initialize_schema(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS navigation (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                url TEXT,
                last_scraped_at DATETIME,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                navigation_id INTEGER NOT NULL,
                parent_id INTEGER,
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                url TEXT,
                product_count INTEGER NOT NULL DEFAULT 0,
                last_scraped_at DATETIME,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (navigation_id) REFERENCES navigation (id),
                FOREIGN KEY (parent_id) REFERENCES category (id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS product (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id TEXT NOT NULL UNIQUE,
                category_id INTEGER,
                title TEXT NOT NULL,
                author TEXT,
                price REAL,
                currency TEXT NOT NULL DEFAULT 'GBP',
                image_url TEXT,
                source_url TEXT NOT NULL UNIQUE,
                last_scraped_at DATETIME,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES category (id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS product_detail (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL UNIQUE,
                description TEXT,
                specs TEXT,
                ratings_avg REAL,
                reviews_count INTEGER NOT NULL DEFAULT 0,
                publisher TEXT,
                publication_date TEXT,
                isbn TEXT,
                recommendations TEXT,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (product_id) REFERENCES product (id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS review (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL,
                author TEXT,
                rating INTEGER,
                text TEXT,
                review_date DATETIME,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (product_id) REFERENCES product (id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS scrape_job (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                target_url TEXT NOT NULL,
                target_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                target_id TEXT,
                started_at DATETIME,
                finished_at DATETIME,
                error_log TEXT,
                result TEXT,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_category_navigation_id ON category (navigation_id)",
            "CREATE INDEX IF NOT EXISTS idx_product_category_id ON product (category_id)",
            "CREATE INDEX IF NOT EXISTS idx_product_last_scraped_at ON product (last_scraped_at)",
            "CREATE INDEX IF NOT EXISTS idx_review_product_id ON review (product_id)",
            "CREATE INDEX IF NOT EXISTS idx_scrape_job_status ON scrape_job (status)",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn schema_bootstrap_is_idempotent() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test.db");
        let database_url = format!("sqlite:{}", db_path.display());

        let db = DatabaseConnection::new(&database_url).await?;
        db.initialize_schema().await?;
        db.initialize_schema().await?;

        let row = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='scrape_job'",
        )
        .fetch_optional(db.pool())
        .await?;
        assert!(row.is_some());
        Ok(())
    }
}
