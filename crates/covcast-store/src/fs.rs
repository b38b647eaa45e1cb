//! Filesystem-backed model store.

use crate::error::{StoreError, StoreResult};
use crate::layout::StoreLayout;
use crate::record::ModelRecord;
use crate::registry::discover_persisted_models;
use covcast_abstraction::{ModelError, ModelIdentity, ModelStore, PersistedModel};
use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Stores each model as a single JSON record under a [`StoreLayout`].
///
/// Records are written to a temporary file in the store root and renamed into
/// place, so readers see either the previous record or the new one. Durability
/// across a crash mid-write is not guaranteed beyond what the filesystem gives.
#[derive(Debug, Clone)]
pub struct FsModelStore {
    layout: StoreLayout,
}

impl FsModelStore {
    #[must_use]
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    #[must_use]
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    fn write_record(&self, record: &ModelRecord) -> StoreResult<()> {
        self.layout.ensure_root()?;
        let path = self.layout.record_path(&record.identity);

        let tmp = NamedTempFile::new_in(self.layout.root())?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, record)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(path = %path.display(), "Model record written");
        Ok(())
    }

    fn read_record(&self, identity: &ModelIdentity) -> StoreResult<PersistedModel> {
        let path = self.layout.record_path(identity);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(identity.key()));
            }
            Err(e) => return Err(e.into()),
        };

        let record: ModelRecord = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::Corrupt { key: identity.key(), reason: e.to_string() }
        })?;
        if &record.identity != identity {
            return Err(StoreError::Corrupt {
                key: identity.key(),
                reason: format!("record belongs to {}", record.identity),
            });
        }
        record.into_persisted()
    }
}

impl ModelStore for FsModelStore {
    fn write(&self, record: &PersistedModel) -> Result<(), ModelError> {
        self.write_record(&ModelRecord::from_persisted(record))?;
        info!(
            model = %record.identity,
            last_true_date = %record.last_true_date,
            "Persisted model"
        );
        Ok(())
    }

    fn read(&self, identity: &ModelIdentity) -> Result<PersistedModel, ModelError> {
        Ok(self.read_record(identity)?)
    }

    fn list(&self) -> Result<Vec<ModelIdentity>, ModelError> {
        let entries = discover_persisted_models(self.layout.root())?;
        Ok(entries.into_iter().map(|e| e.identity).collect())
    }

    fn delete(&self, identity: &ModelIdentity) -> Result<(), ModelError> {
        let path = self.layout.record_path(identity);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(model = %identity, "Deleted persisted model");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ModelError::ModelNotFound(identity.key()))
            }
            Err(e) => Err(StoreError::Io(e).into()),
        }
    }
}
