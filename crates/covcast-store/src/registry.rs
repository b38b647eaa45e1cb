use crate::error::StoreResult;
use crate::record::ModelRecord;
use chrono::{DateTime, NaiveDate, Utc};
use covcast_abstraction::ModelIdentity;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A discovered persisted model.
#[derive(Debug, Clone, Serialize)]
pub struct PersistedModelEntry {
    pub identity: ModelIdentity,
    pub last_true_date: NaiveDate,
    pub saved_at: DateTime<Utc>,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Discover persisted models by scanning `<root>/*.json`.
///
/// Unreadable records are logged and skipped so one bad file does not hide
/// the rest of the store. A missing root means an empty store.
pub fn discover_persisted_models(root: &Path) -> StoreResult<Vec<PersistedModelEntry>> {
    let mut out = Vec::new();

    let dir = match std::fs::read_dir(root) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e.into()),
    };

    for entry in dir {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }

        let record = match std::fs::read(&path)
            .map_err(crate::StoreError::from)
            .and_then(|bytes| serde_json::from_slice::<ModelRecord>(&bytes).map_err(Into::into))
        {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable model record");
                continue;
            }
        };

        out.push(PersistedModelEntry {
            identity: record.identity,
            last_true_date: record.last_true_date,
            saved_at: record.saved_at,
            path,
        });
    }

    out.sort_by(|a, b| a.identity.cmp(&b.identity));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let entries = discover_persisted_models(&temp.path().join("absent")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_skips_foreign_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(temp.path().join("broken.json"), "{").unwrap();

        let entries = discover_persisted_models(temp.path()).unwrap();
        assert!(entries.is_empty());
    }
}
