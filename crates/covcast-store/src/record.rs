use crate::error::{StoreError, StoreResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, Utc};
use covcast_abstraction::{ModelIdentity, PersistedModel};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const RECORD_VERSION: u32 = 1;

/// On-disk representation of a [`PersistedModel`].
///
/// The fitted state is stored base64-encoded next to its SHA-256 so a torn or
/// edited record is detected on read instead of restoring garbage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub version: u32,
    pub identity: ModelIdentity,
    pub last_true_date: NaiveDate,
    pub saved_at: DateTime<Utc>,
    pub state: String,
    pub sha256: String,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

impl ModelRecord {
    #[must_use]
    pub fn from_persisted(model: &PersistedModel) -> Self {
        Self {
            version: RECORD_VERSION,
            identity: model.identity.clone(),
            last_true_date: model.last_true_date,
            saved_at: model.saved_at,
            state: STANDARD.encode(&model.state),
            sha256: sha256_hex(&model.state),
        }
    }

    pub fn into_persisted(self) -> StoreResult<PersistedModel> {
        let key = self.identity.key();
        if self.version != RECORD_VERSION {
            return Err(StoreError::Corrupt {
                key,
                reason: format!("unsupported record version {}", self.version),
            });
        }

        let state = STANDARD
            .decode(self.state.as_bytes())
            .map_err(|e| StoreError::Corrupt { key: key.clone(), reason: e.to_string() })?;

        if sha256_hex(&state) != self.sha256 {
            return Err(StoreError::Corrupt { key, reason: "checksum mismatch".to_string() });
        }

        Ok(PersistedModel {
            identity: self.identity,
            last_true_date: self.last_true_date,
            saved_at: self.saved_at,
            state,
        })
    }
}
