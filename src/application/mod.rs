//! Application layer: scrape job use cases and recommendations

pub mod recommendation_service;
pub mod scraping_service;

pub use recommendation_service::RecommendationService;
pub use scraping_service::ScrapingService;
