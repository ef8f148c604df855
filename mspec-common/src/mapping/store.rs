//! Mapping configuration store
//!
//! Holds the active configuration as an immutable [`MappingSnapshot`] behind
//! an [`ArcSwap`]. Readers take a snapshot reference without locking; a load
//! builds and validates a complete new snapshot before swapping it in, so a
//! reader sees either the old version or the new one, never a mix. Loads are
//! serialized among themselves but never wait for readers.

use super::error::ConfigError;
use super::loader::{parse_document, MappingSource};
use super::model::MappingConfig;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// One immutable, internally consistent version of the mapping configuration
#[derive(Debug, Clone)]
pub struct MappingSnapshot {
    version: u64,
    loaded_at: DateTime<Utc>,
    origin: String,
    sources: BTreeMap<String, Arc<MappingConfig>>,
}

impl MappingSnapshot {
    fn empty(origin: String) -> Self {
        Self {
            version: 0,
            loaded_at: Utc::now(),
            origin,
            sources: BTreeMap::new(),
        }
    }

    /// Version 0 is the empty snapshot before any successful load
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Mapping for a source, or `UnknownSource` listing the configured ones
    pub fn get(&self, source_id: &str) -> Result<Arc<MappingConfig>, ConfigError> {
        self.sources
            .get(source_id)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownSource {
                source_id: source_id.to_string(),
                known: self.sources.keys().cloned().collect(),
            })
    }

    pub fn source_ids(&self) -> BTreeSet<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Process-wide holder of the active mapping snapshot
pub struct MappingStore {
    source: Box<dyn MappingSource>,
    active: ArcSwap<MappingSnapshot>,
    load_lock: Mutex<()>,
    initialized: AtomicBool,
}

impl MappingStore {
    /// Create a store; nothing is read until `load` or the first read
    pub fn new(source: impl MappingSource + 'static) -> Self {
        let origin = source.origin();
        Self {
            source: Box::new(source),
            active: ArcSwap::from_pointee(MappingSnapshot::empty(origin)),
            load_lock: Mutex::new(()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Read, validate and atomically activate the configuration
    ///
    /// On failure the previously active snapshot stays in place.
    pub fn load(&self) -> Result<Arc<MappingSnapshot>, ConfigError> {
        let _guard = self.load_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load_locked()
    }

    /// Operator-triggered reload, same guarantees as [`MappingStore::load`]
    pub fn reload(&self) -> Result<Arc<MappingSnapshot>, ConfigError> {
        info!("Reloading mapping configuration from {}", self.source.origin());
        self.load()
    }

    /// Current snapshot, loading lazily if nothing was ever loaded
    pub fn snapshot(&self) -> Arc<MappingSnapshot> {
        if !self.initialized.load(Ordering::Acquire) {
            let _guard = self.load_lock.lock().unwrap_or_else(|e| e.into_inner());
            if !self.initialized.load(Ordering::Acquire) {
                // Failure is already logged; readers fall back to the empty snapshot
                let _ = self.load_locked();
            }
        }
        self.active.load_full()
    }

    pub fn get(&self, source_id: &str) -> Result<Arc<MappingConfig>, ConfigError> {
        self.snapshot().get(source_id)
    }

    pub fn list_sources(&self) -> BTreeSet<String> {
        self.snapshot().source_ids()
    }

    pub fn origin(&self) -> String {
        self.source.origin()
    }

    fn load_locked(&self) -> Result<Arc<MappingSnapshot>, ConfigError> {
        let result = self.read_and_activate();
        // Set only after the attempt settles; earlier readers block on the lock
        self.initialized.store(true, Ordering::Release);
        result
    }

    fn read_and_activate(&self) -> Result<Arc<MappingSnapshot>, ConfigError> {
        let origin = self.source.origin();

        let parsed = self.source.read().and_then(|document| {
            parse_document(&document).map_err(|issues| ConfigError::Invalid {
                origin: origin.clone(),
                issues,
            })
        });

        let mappings = match parsed {
            Ok(mappings) => mappings,
            Err(e) => {
                error!("Mapping configuration rejected: {}", e);
                for issue in e.issues() {
                    error!("  {}", issue);
                }
                return Err(e);
            }
        };

        let snapshot = Arc::new(MappingSnapshot {
            version: self.active.load().version + 1,
            loaded_at: Utc::now(),
            origin,
            sources: mappings
                .into_iter()
                .map(|(id, mapping)| (id, Arc::new(mapping)))
                .collect(),
        });
        self.active.store(Arc::clone(&snapshot));

        info!(
            "Loaded mapping configuration v{} from {} ({} sources: {})",
            snapshot.version,
            snapshot.origin,
            snapshot.len(),
            snapshot.sources.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(snapshot)
    }
}
