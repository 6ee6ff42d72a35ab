//! Quote supersession.
//!
//! Inputs change faster than quotes come back. Every request takes a new
//! generation number; a result is only surfaced while its generation is
//! still the latest one, so a slow stale quote never overwrites a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::core::quote::{QuoteEngine, QuoteRequest};
use crate::models::errors::AppResult;
use crate::models::types::Quote;

pub struct QuoteSession {
    engine: QuoteEngine,
    generation: AtomicU64,
}

impl QuoteSession {
    pub fn new(engine: QuoteEngine) -> Self {
        Self {
            engine,
            generation: AtomicU64::new(0),
        }
    }

    /// Start a new generation; earlier in-flight requests become stale
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// Drop whatever is in flight (e.g. the amount was cleared)
    pub fn invalidate(&self) {
        self.begin();
    }

    /// Quote `req`; `None` when a newer request superseded this one
    pub async fn request(&self, req: &QuoteRequest) -> Option<AppResult<Quote>> {
        let generation = self.begin();
        let result = self.engine.quote(req).await;
        if self.is_current(generation) {
            Some(result)
        } else {
            debug!("⏭️ Quote generation {} superseded by {}", generation, self.current());
            None
        }
    }
}
