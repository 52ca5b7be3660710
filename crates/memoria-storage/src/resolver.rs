//! Storage target resolution.
//!
//! Maps a [`StorageTarget`] descriptor to a concrete backend. Resolved
//! backends are cached per target id for the lifetime of the resolver (one
//! batch run); the cache is never persisted because target credentials and
//! configuration can change between runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use memoria_core::models::{StorageDriver, StorageTarget};
use uuid::Uuid;

use crate::local::LocalStorage;
use crate::object::ObjectStorage;
use crate::traits::{Storage, StorageResult};

#[derive(Default)]
pub struct StorageResolver {
    cache: Mutex<HashMap<Uuid, Arc<dyn Storage>>>,
}

impl StorageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a target to a backend, constructing it on first use.
    pub async fn resolve(&self, target: &StorageTarget) -> StorageResult<Arc<dyn Storage>> {
        if let Some(backend) = self
            .cache
            .lock()
            .expect("resolver cache poisoned")
            .get(&target.id)
        {
            return Ok(backend.clone());
        }

        let backend: Arc<dyn Storage> = match target.driver {
            StorageDriver::Local => Arc::new(LocalStorage::for_target(target).await?),
            StorageDriver::ObjectStore => Arc::new(ObjectStorage::from_config(&target.config)?),
        };

        tracing::debug!(
            target_id = %target.id,
            driver = %target.driver,
            "Resolved storage backend"
        );

        self.cache
            .lock()
            .expect("resolver cache poisoned")
            .insert(target.id, backend.clone());

        Ok(backend)
    }
}
