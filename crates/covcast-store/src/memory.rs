//! In-memory model store.

use covcast_abstraction::{ModelError, ModelIdentity, ModelStore, PersistedModel};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A [`ModelStore`] that keeps records in process memory.
///
/// Records are cloned in and out, so a stored record is never aliased by a
/// live model.
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    records: RwLock<HashMap<ModelIdentity, PersistedModel>>,
}

impl MemoryModelStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModelStore for MemoryModelStore {
    fn write(&self, record: &PersistedModel) -> Result<(), ModelError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.identity.clone(), record.clone());
        Ok(())
    }

    fn read(&self, identity: &ModelIdentity) -> Result<PersistedModel, ModelError> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .cloned()
            .ok_or_else(|| ModelError::ModelNotFound(identity.key()))
    }

    fn list(&self) -> Result<Vec<ModelIdentity>, ModelError> {
        let mut ids: Vec<_> =
            self.records.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn delete(&self, identity: &ModelIdentity) -> Result<(), ModelError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity)
            .map(|_| ())
            .ok_or_else(|| ModelError::ModelNotFound(identity.key()))
    }
}
