//! Two-tier article rewriting.
//!
//! # Architecture
//!
//! - [`RewriteBackend`]: async trait for anything that can reword an article
//! - [`remote::RemoteRewriter`]: HTTP client for the text-generation service
//! - [`retry::RetryRewrite`]: decorator adding exponential backoff to any backend
//! - [`local`]: deterministic lexical rewrite used as the fallback
//! - [`RewriteEngine`]: runs a backend, then validates its output and falls
//!   back to the local rewrite when the result is empty or too close to the source
//!
//! # Validation
//!
//! Similarity is the Jaccard index over the token sets of both bodies (tokens
//! longer than three characters). At or above the threshold, 0.80 by default,
//! the remote result is discarded.

pub mod local;
pub mod remote;
pub mod retry;

use crate::error::Result;
use crate::text::{condense_whitespace, is_body_too_similar, is_title_similar, split_into_paragraphs};
use tracing::{debug, instrument, warn};

/// Default rejection threshold for body similarity.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.80;

/// Raw output of a [`RewriteBackend`]. Either field may come back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRewrite {
    pub title: String,
    pub body: String,
}

/// A validated rewrite. `paragraphs` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenArticle {
    pub title: String,
    pub body: String,
    pub paragraphs: Vec<String>,
}

/// Something that can reword an article.
///
/// Implementors return an error for transport or protocol failures; the
/// [`RewriteEngine`] turns those into the unchanged input.
pub trait RewriteBackend {
    /// Reword `title` and `body`.
    ///
    /// # Arguments
    ///
    /// * `title` - The source headline
    /// * `body` - The source body, paragraphs separated by blank lines
    ///
    /// # Returns
    ///
    /// The backend's title and body, or an error if the call failed.
    async fn rewrite(&self, title: &str, body: &str) -> Result<RemoteRewrite>;
}

/// Runs a [`RewriteBackend`] and guarantees a usable, sufficiently different result.
#[derive(Debug)]
pub struct RewriteEngine<B> {
    backend: B,
    similarity_threshold: f64,
}

impl<B> RewriteEngine<B>
where
    B: RewriteBackend,
{
    pub fn new(backend: B, similarity_threshold: f64) -> Self {
        Self {
            backend,
            similarity_threshold,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn too_similar(&self, original: &str, candidate: &str) -> bool {
        is_body_too_similar(
            &condense_whitespace(original),
            &condense_whitespace(candidate),
            self.similarity_threshold,
        )
    }

    fn local_fallback(&self, title: &str, original_body: &str) -> RewrittenArticle {
        local::distinct_rewrite_article(
            title,
            original_body,
            &split_into_paragraphs(original_body),
            self.similarity_threshold,
        )
    }

    /// Rewrite an article, falling back to the local rewrite when needed.
    ///
    /// 1. Ask the backend; a failure counts as an echo of the input.
    /// 2. No paragraphs, or a body too similar to the original: local rewrite.
    /// 3. A headline that normalizes to the original is regenerated locally.
    /// 4. The body is re-joined from its paragraphs.
    #[instrument(level = "info", skip_all, fields(title = %title))]
    pub async fn ensure_unique_rewrite(&self, title: &str, original_body: &str) -> RewrittenArticle {
        let remote = match self.backend.rewrite(title, original_body).await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(error = %e, "Remote rewrite failed; keeping original text");
                RemoteRewrite {
                    title: title.to_string(),
                    body: original_body.to_string(),
                }
            }
        };

        let candidate_title = if remote.title.trim().is_empty() {
            title.to_string()
        } else {
            remote.title
        };
        let candidate_body = if remote.body.trim().is_empty() {
            original_body.to_string()
        } else {
            remote.body
        };
        let candidate_paragraphs = split_into_paragraphs(&candidate_body);

        if candidate_paragraphs.is_empty() || self.too_similar(original_body, &candidate_body) {
            debug!("Rewrite empty or too similar to the source; using local rewrite");
            return self.local_fallback(title, original_body);
        }

        let final_title = if is_title_similar(title, &candidate_title) {
            debug!("Rewritten headline matches the source; regenerating locally");
            local::generate_unique_title(title, &candidate_paragraphs)
        } else {
            candidate_title
        };

        let final_body = candidate_paragraphs.join("\n\n");
        if self.too_similar(original_body, &final_body) {
            return self.local_fallback(title, original_body);
        }

        RewrittenArticle {
            title: final_title,
            body: final_body,
            paragraphs: candidate_paragraphs,
        }
    }
}
