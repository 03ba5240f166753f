//! Schema introspection cache
//!
//! Column names and declared types of every collection are needed on each
//! request (row formatting, `$expand` join lists, metadata). They are fetched
//! from the engine once and kept for a fixed TTL in a [`SchemaCache`].
//!
//! The cache is a plain value: the service owns one and shares it through an
//! `Arc`. Reads go through a lock-free [`scc::HashMap`]; a refresh replaces
//! the whole snapshot of one key, so concurrent refreshes of the same key
//! simply race and the last writer wins.

pub mod introspect;

pub use introspect::introspect;

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::engine::{ColumnDescriptor, SqlEngine, SqlSession};
use crate::model::{Collection, CollectionRegistry};
use crate::Result;

type CacheKey = (String, String);

/// Columns of one collection at the time they were fetched
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    pub columns: Vec<ColumnDescriptor>,
    inserted_at: Instant,
}

impl SchemaSnapshot {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns, inserted_at: Instant::now() }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Declared type of a column, matched case-insensitively
    pub fn column_type(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.data_type.as_str())
    }

    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }
}

/// Outcome of a warm-up pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmUpReport {
    pub loaded: usize,
    pub failed: usize,
}

pub struct SchemaCache {
    entries: scc::HashMap<CacheKey, Arc<SchemaSnapshot>>,
    ttl: Duration,
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache").field("entries", &self.len()).field("ttl", &self.ttl).finish()
    }
}

impl SchemaCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: scc::HashMap::new(), ttl }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Snapshot of a collection, fetched through `session` when absent or expired
    pub fn get(&self, session: &dyn SqlSession, collection: &Collection) -> Result<Arc<SchemaSnapshot>> {
        if let Some(snapshot) = self.cached(&collection.group, &collection.name) {
            log::trace!("schema cache hit for {}/{}", collection.group, collection.name);
            return Ok(snapshot);
        }

        log::debug!("schema cache miss for {}/{}", collection.group, collection.name);
        let snapshot = Arc::new(SchemaSnapshot::new(introspect(session, collection)?));
        let key = (collection.group.clone(), collection.name.clone());
        let _ = self.entries.upsert_sync(key, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Fresh snapshot if one is cached, never touching the engine
    pub fn cached(&self, group: &str, name: &str) -> Option<Arc<SchemaSnapshot>> {
        let key = (group.to_string(), name.to_string());
        self.entries
            .read_sync(&key, |_, snapshot| Arc::clone(snapshot))
            .filter(|snapshot| !snapshot.is_expired(self.ttl))
    }

    /// Drop one entry; returns whether it was present
    pub fn invalidate(&self, group: &str, name: &str) -> bool {
        let key = (group.to_string(), name.to_string());
        let removed = self.entries.remove_sync(&key).is_some();
        if removed {
            log::debug!("schema cache invalidated {}/{}", group, name);
        }
        removed
    }

    pub fn invalidate_all(&self) {
        self.entries.retain_sync(|_, _| false);
        log::debug!("schema cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Populate the cache for every collection of every group
    ///
    /// Individual failures are logged and skipped; one session serves the
    /// whole pass.
    pub fn warm_up(&self, engine: &dyn SqlEngine, registry: &dyn CollectionRegistry) -> WarmUpReport {
        let start = Instant::now();
        let mut report = WarmUpReport::default();

        let session = match engine.connect() {
            Ok(session) => session,
            Err(e) => {
                log::warn!("schema warm-up could not connect: {}", e);
                return report;
            }
        };

        for group in registry.groups() {
            for collection in registry.collections(&group) {
                match self.get(session.as_ref(), &collection) {
                    Ok(_) => report.loaded += 1,
                    Err(e) => {
                        report.failed += 1;
                        log::warn!(
                            "schema warm-up skipped {}/{}: {}",
                            collection.group,
                            collection.name,
                            e
                        );
                    }
                }
            }
        }

        log::info!(
            "schema warm-up loaded {} collections ({} failed) in {:?}",
            report.loaded,
            report.failed,
            start.elapsed()
        );
        report
    }

    /// Run [`SchemaCache::warm_up`] on a background thread
    pub fn spawn_warm_up(
        self: &Arc<Self>,
        engine: Arc<dyn SqlEngine>,
        registry: Arc<dyn CollectionRegistry>,
    ) -> JoinHandle<WarmUpReport> {
        let cache = Arc::clone(self);
        std::thread::spawn(move || cache.warm_up(engine.as_ref(), registry.as_ref()))
    }
}
