//! In-memory threshold store

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thermowatch_shared::Thresholds;

use super::ThresholdStore;
use crate::error::StoreError;

/// Volatile store. Failure switches let callers exercise degraded paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: Mutex<Option<Thresholds>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: Thresholds) -> Self {
        Self {
            value: Mutex::new(Some(thresholds)),
            ..Default::default()
        }
    }

    /// Make subsequent `load` calls fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `save` calls fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current contents, bypassing the failure switches.
    pub fn peek(&self) -> Option<Thresholds> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ThresholdStore for MemoryStore {
    async fn load(&self) -> Result<Option<Thresholds>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store read disabled".into()));
        }
        Ok(self.peek())
    }

    async fn save(&self, thresholds: &Thresholds) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("memory store write disabled".into()));
        }
        *self.value.lock().map_err(|e| StoreError::Write(e.to_string()))? = Some(*thresholds);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
