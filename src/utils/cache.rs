//! High-Performance In-Memory Cache Module
//!
//! Thread-safe caching layer for token tax readings.
//! Uses DashMap for concurrent access without lock contention.
//!
//! Features:
//! - TTL-based expiration (5 minutes default)
//! - Keyed by (chain id, token address)
//! - Cache HIT/MISS logging and counters

use alloy_primitives::Address;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::types::TaxReading;
use crate::utils::constants::DEFAULT_CACHE_TTL_SECS;

/// Cache entry with creation time for TTL validation
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub reading: TaxReading,
    pub created_at: Instant,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= Duration::from_secs(self.ttl_secs)
    }

    /// Seconds left before expiry
    pub fn remaining_ttl(&self) -> u64 {
        let elapsed = self.created_at.elapsed().as_secs();
        self.ttl_secs.saturating_sub(elapsed)
    }
}

/// Tax reading cache shared across requests
#[derive(Clone)]
pub struct TaxCache {
    store: Arc<DashMap<(u64, Address), CacheEntry>>,
    ttl_secs: u64,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl Default for TaxCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TaxCache {
    /// Cache with the default TTL (5 minutes)
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL_SECS)
    }

    pub fn with_ttl(ttl_secs: u64) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl_secs,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the reading on a non-expired hit
    pub fn get(&self, chain_id: u64, token: Address) -> Option<TaxReading> {
        let key = (chain_id, token);

        if let Some(entry) = self.store.get(&key) {
            if entry.is_expired() {
                drop(entry); // release the read guard before removing
                self.store.remove(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 TAX CACHE MISS (expired): {}:{}", chain_id, token);
                None
            } else {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "✅ TAX CACHE HIT: {}:{} (TTL: {}s remaining)",
                    chain_id,
                    token,
                    entry.remaining_ttl()
                );
                Some(entry.reading)
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("📭 TAX CACHE MISS: {}:{}", chain_id, token);
            None
        }
    }

    pub fn set(&self, chain_id: u64, token: Address, reading: TaxReading) {
        let entry = CacheEntry {
            reading,
            created_at: Instant::now(),
            ttl_secs: self.ttl_secs,
        };
        self.store.insert((chain_id, token), entry);
        debug!("💾 TAX CACHE SET: {}:{} (TTL: {}s)", chain_id, token, self.ttl_secs);
    }

    pub fn invalidate(&self, chain_id: u64, token: Address) {
        self.store.remove(&(chain_id, token));
    }

    /// Drop every expired entry; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        before - self.store.len()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: self.store.len(),
            hits,
            misses,
            hit_rate,
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}
