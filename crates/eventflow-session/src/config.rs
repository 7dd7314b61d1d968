use anyhow::{Context, Result};
use eventflow_core::NodeParams;
use eventflow_graph::{Canvas, ExplorerConfig, SpringLayoutConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Column names of the JSON log rows. The event column lives in
/// [`ExplorerConfig::event_col`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogColumns {
    pub case_col: String,
    pub timestamp_col: String,
}

impl Default for LogColumns {
    fn default() -> Self {
        Self {
            case_col: "user_id".to_string(),
            timestamp_col: "timestamp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetEvents {
    pub positive_target_event: Option<String>,
    pub negative_target_event: Option<String>,
    pub source_event: Option<String>,
}

impl TargetEvents {
    pub fn node_params(&self) -> NodeParams {
        NodeParams::from_events(
            self.positive_target_event.as_deref(),
            self.negative_target_event.as_deref(),
            self.source_event.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub explorer: ExplorerConfig,
    pub log: LogColumns,
    pub targets: TargetEvents,
    /// Directory that receives graph snapshots.
    pub experiments_folder: PathBuf,
    pub spring: SpringLayoutConfig,
    pub canvas: Canvas,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            explorer: ExplorerConfig::default(),
            log: LogColumns::default(),
            targets: TargetEvents::default(),
            experiments_folder: PathBuf::from("experiments"),
            spring: SpringLayoutConfig::default(),
            canvas: Canvas::default(),
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: SessionConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}
