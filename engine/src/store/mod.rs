//! Threshold storage backends
//!
//! The authoritative copy of the user's range lives outside the engine. The
//! engine reads it once at start and writes it on every successful commit.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thermowatch_shared::Thresholds;

use crate::error::StoreError;

/// Get/set capability for the persisted range.
#[async_trait]
pub trait ThresholdStore: Send + Sync {
    /// Read the stored range. `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<Thresholds>, StoreError>;

    /// Persist a range, replacing any previous one.
    async fn save(&self, thresholds: &Thresholds) -> Result<(), StoreError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Load the stored range, falling back to `fallback` on absence or failure.
pub async fn load_or_default(store: &dyn ThresholdStore, fallback: Thresholds) -> Thresholds {
    match store.load().await {
        Ok(Some(thresholds)) => {
            tracing::info!("Loaded thresholds {} from {}", thresholds, store.describe());
            thresholds
        }
        Ok(None) => {
            tracing::info!(
                "No thresholds stored in {}, using defaults {}",
                store.describe(),
                fallback
            );
            fallback
        }
        Err(e) => {
            tracing::warn!("{} ({}), using default thresholds {}", e, store.describe(), fallback);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_or_default_when_empty() {
        let store = MemoryStore::new();
        assert_eq!(
            load_or_default(&store, Thresholds::default()).await,
            Thresholds::default()
        );
    }

    #[tokio::test]
    async fn test_load_or_default_when_unreadable() {
        let store = MemoryStore::with_thresholds(Thresholds::new(0.0, 1.0).unwrap());
        store.set_fail_reads(true);
        let fallback = Thresholds::new(18.0, 24.0).unwrap();
        assert_eq!(load_or_default(&store, fallback).await, fallback);
    }

    #[tokio::test]
    async fn test_load_or_default_returns_stored() {
        let stored = Thresholds::new(5.0, 8.0).unwrap();
        let store = MemoryStore::with_thresholds(stored);
        assert_eq!(load_or_default(&store, Thresholds::default()).await, stored);
    }
}
