use crate::error::StoreResult;
use covcast_abstraction::ModelIdentity;
use std::path::{Path, PathBuf};

/// Filesystem layout for persisted models.
///
/// Default layout is `<data_dir>/models/<kind>_<region>.json`
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create a layout rooted in a covcast data directory.
    #[must_use]
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("models"))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn record_path(&self, identity: &ModelIdentity) -> PathBuf {
        self.root.join(format!("{}.json", identity.key()))
    }

    pub fn ensure_root(&self) -> StoreResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let temp = TempDir::new().unwrap();
        let layout = StoreLayout::for_data_dir(temp.path());
        let id = ModelIdentity::new("SARIMAX", "59");

        assert!(layout.root().ends_with("models"));
        assert!(layout.record_path(&id).ends_with("models/SARIMAX_59.json"));
    }

    #[test]
    fn test_ensure_root_creates_directory() {
        let temp = TempDir::new().unwrap();
        let layout = StoreLayout::for_data_dir(&temp.path().join("nested"));
        layout.ensure_root().unwrap();
        assert!(layout.root().is_dir());
    }
}
