//! # Awful Game News
//!
//! Polls a gaming news feed, pulls the full text of each new story, rewrites
//! it (remote language model first, deterministic local rewrite as fallback),
//! files it under a fixed gaming taxonomy and keeps the result as an
//! in-memory corpus that is republished as JSON, RSS and a sitemap.
//!
//! ## Architecture
//!
//! 1. **Polling**: [`feed::FeedSource`] yields [`models::FeedItem`]s
//! 2. **Extraction**: [`extract::ContentExtractor`] follows each link and
//!    scores the page for the article body
//! 3. **Rewriting**: [`rewrite::RewriteEngine`] asks a
//!    [`rewrite::RewriteBackend`] and guards the answer against near copies
//! 4. **Categorizing**: [`categorize`] maps declared and detected topics onto
//!    the taxonomy
//! 5. **Publishing**: [`ingest::FeedService`] swaps in a new
//!    [`models::FeedSnapshot`]; [`outputs`] writes it to disk

pub mod categorize;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod feed;
pub mod ingest;
pub mod models;
pub mod outputs;
pub mod rewrite;
pub mod text;
pub mod utils;

pub use error::{NewsError, Result};
