//! Replica classes and the per-class healthy endpoint directory.

use crate::config::BasicAuth;
use crate::endpoint::Endpoint;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Chain stats path served by miners and sharders.
pub const CHAIN_STATS_PATH: &str = "/v1/chain/get/stats";
/// Privileged stats path served by storage providers.
pub const STORAGE_STATS_PATH: &str = "/_stats";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReplicaClass {
    Miner,
    Sharder,
    StorageProvider,
}

impl ReplicaClass {
    pub const ALL: [ReplicaClass; 3] = [
        ReplicaClass::Miner,
        ReplicaClass::Sharder,
        ReplicaClass::StorageProvider,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicaClass::Miner => "miner",
            ReplicaClass::Sharder => "sharder",
            ReplicaClass::StorageProvider => "storage_provider",
        }
    }
}

impl fmt::Display for ReplicaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How replicas of one class are probed for health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeStrategy {
    pub class: ReplicaClass,
    pub path: String,
    pub auth: Option<BasicAuth>,
}

impl ProbeStrategy {
    /// Default strategy for a class. Storage providers only accept
    /// authenticated probes, so `storage_auth` is attached to that class alone.
    pub fn for_class(class: ReplicaClass, storage_auth: Option<&BasicAuth>) -> Self {
        match class {
            ReplicaClass::Miner | ReplicaClass::Sharder => Self {
                class,
                path: CHAIN_STATS_PATH.to_string(),
                auth: None,
            },
            ReplicaClass::StorageProvider => Self {
                class,
                path: STORAGE_STATS_PATH.to_string(),
                auth: storage_auth.cloned(),
            },
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// Healthy endpoints per replica class.
///
/// Lists are only ever replaced whole: readers get an `Arc` snapshot and never
/// observe a partially updated list.
#[derive(Debug, Default)]
pub struct ReplicaDirectory {
    classes: RwLock<HashMap<ReplicaClass, Arc<[Endpoint]>>>,
}

impl ReplicaDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a class's endpoints; empty if the class was never populated.
    pub fn snapshot(&self, class: ReplicaClass) -> Arc<[Endpoint]> {
        self.classes
            .read()
            .get(&class)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Swaps in a new list for `class`, dropping duplicates while keeping
    /// first-seen order. Returns the previous list, if any.
    pub fn replace(&self, class: ReplicaClass, endpoints: Vec<Endpoint>) -> Option<Arc<[Endpoint]>> {
        let mut unique: Vec<Endpoint> = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            if !unique.contains(&endpoint) {
                unique.push(endpoint);
            }
        }
        self.classes.write().insert(class, Arc::from(unique))
    }

    pub fn len(&self, class: ReplicaClass) -> usize {
        self.classes.read().get(&class).map_or(0, |list| list.len())
    }

    pub fn is_empty(&self, class: ReplicaClass) -> bool {
        self.len(class) == 0
    }
}
