//! Cancelable deferred actions and per-key mutual exclusion for attendance records.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::AbortHandle;
use tracing::debug;

use crate::model::attendance::AttendanceKey;

/// Pending auto-checkouts, at most one per (employee, date).
#[derive(Default)]
pub struct AutoCheckoutScheduler {
    pending: Mutex<HashMap<AttendanceKey, AbortHandle>>,
}

impl AutoCheckoutScheduler {
    /// Runs `task` after `delay` unless cancelled first. Replaces any pending task for `key`.
    pub fn schedule<F>(&self, key: AttendanceKey, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), handle.abort_handle());

        if let Some(previous) = previous {
            previous.abort();
        }
        debug!(username = %key.username, date = %key.date, delay_secs = delay.as_secs(), "Auto-checkout scheduled");
    }

    /// Returns true if a pending task was aborted.
    pub fn cancel(&self, key: &AttendanceKey) -> bool {
        let removed = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);

        match removed {
            Some(handle) => {
                handle.abort();
                debug!(username = %key.username, date = %key.date, "Auto-checkout cancelled");
                true
            }
            None => false,
        }
    }

    /// Drops the bookkeeping entry once the task has fired.
    pub fn mark_fired(&self, key: &AttendanceKey) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn is_pending(&self, key: &AttendanceKey) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

/// One async mutex per attendance key, so read-validate-write is atomic per record.
#[derive(Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<AttendanceKey, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub async fn lock(&self, key: &AttendanceKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // slots nobody holds or waits on can go
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(key.clone()).or_default().clone()
        };
        slot.lock_owned().await
    }
}
