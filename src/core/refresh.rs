//! Post-transaction refresh burst.
//!
//! Nodes lag a little behind the receipt, so balances are re-read on a
//! fixed schedule after each transaction. Triggering again replaces the
//! running burst; dropping the burst cancels it.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::utils::constants::REFRESH_BURST_SCHEDULE_MS;

pub struct RefreshBurst {
    schedule: Vec<Duration>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for RefreshBurst {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshBurst {
    /// 0 / 1.2 / 3 / 6 seconds after the trigger
    pub fn new() -> Self {
        Self::with_schedule(&REFRESH_BURST_SCHEDULE_MS)
    }

    /// Offsets in milliseconds, measured from the trigger
    pub fn with_schedule(offsets_ms: &[u64]) -> Self {
        Self {
            schedule: offsets_ms.iter().map(|ms| Duration::from_millis(*ms)).collect(),
            handle: Mutex::new(None),
        }
    }

    pub fn schedule(&self) -> &[Duration] {
        &self.schedule
    }

    /// Run `refresh` at every scheduled offset, replacing any running burst
    pub fn trigger<F, Fut>(&self, refresh: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let schedule = self.schedule.clone();
        let task = tokio::spawn(async move {
            let start = Instant::now();
            for (i, offset) in schedule.iter().enumerate() {
                sleep_until(start + *offset).await;
                debug!("🔄 Refresh burst tick {} (+{}ms)", i, offset.as_millis());
                refresh().await;
            }
        });

        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = slot.take() {
            task.abort();
        }
    }

    /// A burst is still running
    pub fn is_active(&self) -> bool {
        let slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map_or(false, |task| !task.is_finished())
    }
}

impl Drop for RefreshBurst {
    fn drop(&mut self) {
        self.cancel();
    }
}
