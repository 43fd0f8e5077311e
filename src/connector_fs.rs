//! Filesystem connector.
//!
//! Walks a local directory, filters files with include/exclude globs, and
//! splits each file into paragraph chunks with the core chunker.
//!
//! # Configuration
//!
//! ```toml
//! [connectors.filesystem.notes]
//! root = "./content"
//! include_globs = ["**/*.md", "**/*.txt"]
//! exclude_globs = ["drafts/**"]
//! source = "Community notes"
//! max_tokens = 512
//! ```
//!
//! `.git`, `target` and `node_modules` are always excluded. Files are
//! visited in sorted relative-path order so the store order is stable
//! across refreshes. Each chunk's date is the file's modification time.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use mandate_kb_core::chunk::chunk_document;
use mandate_kb_core::models::ChunkInput;

use crate::config::FilesystemConnectorConfig;
use crate::traits::Connector;

pub struct FilesystemConnector {
    name: String,
    config: FilesystemConnectorConfig,
}

impl FilesystemConnector {
    pub fn new(name: String, config: FilesystemConnectorConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Connector for FilesystemConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Paragraph chunks from local text files"
    }

    fn connector_type(&self) -> &str {
        "filesystem"
    }

    async fn fetch_all(&self) -> Result<Vec<ChunkInput>> {
        let config = self.config.clone();
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || scan_filesystem(&name, &config))
            .await
            .context("filesystem scan task panicked")?
    }
}

/// Walk `config.root` and chunk every matching file.
pub fn scan_filesystem(name: &str, config: &FilesystemConnectorConfig) -> Result<Vec<ChunkInput>> {
    let root = &config.root;
    if !root.exists() {
        bail!(
            "Filesystem connector root does not exist: {}",
            root.display()
        );
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push((rel_str, path.to_path_buf()));
    }
    files.sort();

    let mut items = Vec::new();
    for (rel, path) in files {
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(connector = name, file = %rel, error = %e, "skipping unreadable file");
                continue;
            }
        };
        let source = config.source.clone().unwrap_or_else(|| rel.clone());
        let date = modified_iso(&path);
        items.extend(chunk_document(
            &format!("{}:{}", name, rel),
            &text,
            &source,
            date.as_deref(),
            config.max_tokens,
        ));
    }

    Ok(items)
}

fn modified_iso(path: &Path) -> Option<String> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let dt: DateTime<Utc> = modified.into();
    Some(dt.to_rfc3339())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
