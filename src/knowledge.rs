//! Free-text knowledge blob folded into the system instruction at connect.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Externally persisted context text. The session reads it exactly once,
/// at connect time.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn get(&self) -> String;

    async fn set(&self, text: &str) -> Result<()>;
}

/// Knowledge persisted as a plain text file. A missing or unreadable file
/// reads as empty context.
pub struct FileKnowledgeStore {
    path: PathBuf,
}

impl FileKnowledgeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KnowledgeStore for FileKnowledgeStore {
    async fn get(&self) -> String {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) => {
                debug!("Knowledge file not readable ({e}); using empty context");
                String::new()
            }
        }
    }

    async fn set(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }
        tokio::fs::write(&self.path, text)
            .await
            .with_context(|| format!("Failed to write knowledge file: {:?}", self.path))
    }
}
