//! Tick-driven asset loader

use std::collections::HashMap;
use synavis_core::{AssetCatalogEntry, LoadHandle};
use synavis_server::{LoadStatus, LoadedAsset};
use tracing::debug;

#[derive(Debug)]
struct PendingLoad {
    name: String,
    entry: AssetCatalogEntry,
    remaining: u32,
}

/// Loads complete after a fixed number of ticks
#[derive(Debug)]
pub struct AssetLoader {
    pending: HashMap<u64, PendingLoad>,
    next_handle: u64,
    latency: u32,
}

impl AssetLoader {
    pub fn new(latency: u32) -> Self {
        Self {
            pending: HashMap::new(),
            next_handle: 0,
            latency,
        }
    }

    pub fn request(&mut self, name: &str, entry: &AssetCatalogEntry) -> LoadHandle {
        self.next_handle += 1;
        self.pending.insert(
            self.next_handle,
            PendingLoad {
                name: name.to_string(),
                entry: entry.clone(),
                remaining: self.latency,
            },
        );
        LoadHandle(self.next_handle)
    }

    /// One tick of loading work
    pub fn advance(&mut self) {
        for load in self.pending.values_mut() {
            load.remaining = load.remaining.saturating_sub(1);
        }
    }

    /// Status of a load; ready loads are handed out once
    pub fn poll(&mut self, handle: LoadHandle) -> LoadStatus {
        if self.pending.get(&handle.0).is_some_and(|load| load.remaining > 0) {
            return LoadStatus::Pending;
        }
        match self.pending.remove(&handle.0) {
            None => LoadStatus::Failed(format!("{handle} is not a pending load")),
            Some(load) => {
                debug!("Loaded {} from {}", load.name, load.entry.source_path);
                LoadStatus::Ready(LoadedAsset {
                    name: load.name,
                    source_path: load.entry.source_path,
                    kind: load.entry.kind,
                })
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
