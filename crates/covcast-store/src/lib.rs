//! covcast Store
//!
//! Persistence primitives for fitted models:
//! - One JSON record per model identity (fitted state + last true date)
//! - Atomic record replacement on the filesystem
//! - In-memory store for tests and ephemeral deployments
//! - Discovery of every persisted model under a store root

pub mod error;
pub mod fs;
pub mod layout;
pub mod memory;
pub mod record;
pub mod registry;

pub use error::{StoreError, StoreResult};
pub use fs::FsModelStore;
pub use layout::StoreLayout;
pub use memory::MemoryModelStore;
pub use record::ModelRecord;
pub use registry::{PersistedModelEntry, discover_persisted_models};
