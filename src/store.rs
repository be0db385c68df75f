use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use crate::state::SchemaState;

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<SchemaState>;
    async fn save(&self, state: &SchemaState) -> Result<()>;
}

/// Keeps the schema state in a JSON file.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStateStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<SchemaState> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(
                    "No state file at {}, starting from an empty schema",
                    self.path.display()
                );
                return Ok(SchemaState::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        let state: SchemaState = serde_json::from_str(&content)
            .with_context(|| format!("Invalid state file {}", self.path.display()))?;

        debug!(
            "Loaded schema version {} with {} tables",
            state.version,
            state.tables.len()
        );

        Ok(state)
    }

    async fn save(&self, state: &SchemaState) -> Result<()> {
        let content = serde_json::to_string_pretty(state)?;

        // Write next to the target, then swap it in.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, content)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!("Saved schema version {} to {}", state.version, self.path.display());

        Ok(())
    }
}
