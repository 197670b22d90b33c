//! Consultation chain state
//!
//! A chain is every nested request/response pair triggered by one top-level
//! submission. Each chain carries one cancellation token shared by all its
//! hops; the tracker records the chains currently in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::WorkerId;

// ─────────────────────────────────────────────────────────────────
// Chain Context
// ─────────────────────────────────────────────────────────────────

/// Per-hop view of a chain: its id, its cancellation token, and how many
/// consultations deep this hop sits (0 = the top-level delivery).
#[derive(Debug, Clone)]
pub struct ChainContext {
    chain_id: Uuid,
    token: CancellationToken,
    depth: u32,
}

impl ChainContext {
    /// Start a new chain bound to `token`
    pub fn new(token: CancellationToken) -> Self {
        Self {
            chain_id: Uuid::new_v4(),
            token,
            depth: 0,
        }
    }

    /// Context for a consultation issued from this hop
    pub fn child(&self) -> Self {
        Self {
            chain_id: self.chain_id,
            token: self.token.clone(),
            depth: self.depth + 1,
        }
    }

    pub fn chain_id(&self) -> Uuid {
        self.chain_id
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the chain is cancelled
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Fail fast if the chain has already been cancelled
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for ChainContext {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

// ─────────────────────────────────────────────────────────────────
// Chain Tracker
// ─────────────────────────────────────────────────────────────────

/// How a chain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    Completed,
    Failed,
    Cancelled,
}

impl ChainOutcome {
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ChainOutcome::Completed,
            Err(e) if e.is_interrupted() => ChainOutcome::Cancelled,
            Err(_) => ChainOutcome::Failed,
        }
    }
}

/// A chain currently in flight
#[derive(Debug, Clone)]
pub struct ActiveChain {
    pub chain_id: Uuid,
    pub recipient: WorkerId,
    pub started_at: DateTime<Utc>,
    token: CancellationToken,
}

/// Registry of in-flight chains plus lifetime totals
#[derive(Debug, Default)]
pub struct ChainTracker {
    active: RwLock<HashMap<Uuid, ActiveChain>>,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl ChainTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a chain as started
    pub fn start(&self, ctx: &ChainContext, recipient: &WorkerId) {
        let chain = ActiveChain {
            chain_id: ctx.chain_id(),
            recipient: recipient.clone(),
            started_at: Utc::now(),
            token: ctx.token().clone(),
        };
        self.active.write().insert(chain.chain_id, chain);
    }

    /// Record a chain as finished
    pub fn finish(&self, chain_id: Uuid, outcome: ChainOutcome) {
        self.active.write().remove(&chain_id);
        let counter = match outcome {
            ChainOutcome::Completed => &self.completed,
            ChainOutcome::Failed => &self.failed,
            ChainOutcome::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Cancel an in-flight chain. Returns false if it is not tracked.
    pub fn cancel(&self, chain_id: Uuid) -> bool {
        match self.active.read().get(&chain_id) {
            Some(chain) => {
                chain.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight chain
    pub fn cancel_all(&self) -> usize {
        let active = self.active.read();
        for chain in active.values() {
            chain.token.cancel();
        }
        active.len()
    }

    pub fn get(&self, chain_id: Uuid) -> Option<ActiveChain> {
        self.active.read().get(&chain_id).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }

    pub fn active_ids(&self) -> Vec<Uuid> {
        self.active.read().keys().copied().collect()
    }

    pub fn total_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total_cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
