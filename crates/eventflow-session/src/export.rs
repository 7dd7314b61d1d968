use crate::RenderPayload;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// `graph_<date>_<time>.json` with the time separators replaced by `_`.
pub fn snapshot_file_name(at: DateTime<Utc>) -> String {
    format!("graph_{}.json", at.format("%Y-%m-%d_%H_%M_%S_%6f"))
}

/// Writes a rendered graph to `dir`, creating the directory when needed.
pub fn export_snapshot(dir: &Path, payload: &RenderPayload) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let path = dir.join(snapshot_file_name(Utc::now()));
    let content = serde_json::to_string_pretty(payload)?;
    fs::write(&path, content)
        .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    tracing::info!("Exported graph snapshot to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_file_name_has_no_colons_or_dots() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 5, 9).unwrap()
            + chrono::Duration::microseconds(42);
        let name = snapshot_file_name(at);

        assert_eq!(name, "graph_2024-03-01_10_05_09_000042.json");
        assert!(!name.trim_end_matches(".json").contains(['.', ':']));
    }
}
