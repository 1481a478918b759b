//! JSON output of the published corpus.
//!
//! The whole [`FeedSnapshot`] is written to `{output_dir}/articles.json`,
//! camelCase keys, the same shape readers get from the service.

use crate::error::Result;
use crate::models::FeedSnapshot;
use crate::utils::ensure_writable_dir;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const SNAPSHOT_FILE: &str = "articles.json";

/// Serialize `snapshot` to `{output_dir}/articles.json`.
///
/// # Returns
///
/// The path written.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_snapshot(snapshot: &FeedSnapshot, output_dir: &str) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(snapshot)?;
    ensure_writable_dir(output_dir).await?;

    let path = Path::new(output_dir).join(SNAPSHOT_FILE);
    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = snapshot.articles.len(), "Wrote JSON snapshot");
    Ok(path)
}
