//! Catalog scraping pipeline for a third-party retail site
//!
//! Drives a headless browser over navigation, category, product-listing, and
//! product-detail pages, extracts structured records with fixed selector
//! sets, and persists them idempotently keyed by natural identifiers. Every
//! scrape runs under a tracked job whose status moves strictly forward:
//! `pending -> running -> {completed, failed}`.

pub mod application;
pub mod domain;
pub mod infrastructure;
