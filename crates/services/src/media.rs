//! Fetching generated media (image and video results live behind short-lived
//! provider URLs, so they are downloaded as soon as a job finishes).

use anyhow::{bail, Context, Result};
use std::path::Path;

pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let resp = reqwest::get(url).await.context("media download failed")?;
    if !resp.status().is_success() {
        bail!("media download failed: HTTP {}", resp.status());
    }
    let bytes = resp.bytes().await.context("media body read failed")?;
    Ok(bytes.to_vec())
}

pub async fn download_to(url: &str, path: &Path) -> Result<()> {
    let bytes = fetch_bytes(url).await?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create download dir")?;
    }
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
