//! Router: the only path a message takes between two identities
//!
//! A delivery resolves the recipient, hands it the request, and races the
//! recipient's work against the chain's cancellation token. There is a
//! single attempt per delivery; nothing is retried here.
//!
//! Every delivery runs the recipient on its own task, so a long chain of
//! consultations never nests one hop's future inside another's poll.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::{ChainContext, Endpoint, Message, WorkerId, WorkerRegistry};

// ─────────────────────────────────────────────────────────────────
// Delivery Stats
// ─────────────────────────────────────────────────────────────────

/// Counters for deliveries attempted through a router
#[derive(Debug, Default)]
pub struct DeliveryStats {
    total: AtomicU64,
    nested: AtomicU64,
    per_recipient: Mutex<HashMap<WorkerId, u64>>,
}

impl DeliveryStats {
    fn record(&self, to: &WorkerId, nested: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if nested {
            self.nested.fetch_add(1, Ordering::Relaxed);
        }
        *self.per_recipient.lock().entry(to.clone()).or_insert(0) += 1;
    }

    /// Deliveries handed to a resolved recipient
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Deliveries issued by a worker consulting a peer
    pub fn nested(&self) -> u64 {
        self.nested.load(Ordering::Relaxed)
    }

    pub fn for_recipient(&self, id: &WorkerId) -> u64 {
        self.per_recipient.lock().get(id).copied().unwrap_or(0)
    }
}

// ─────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────

pub struct Router {
    registry: Arc<WorkerRegistry>,
    max_chain_depth: Option<u32>,
    stats: DeliveryStats,
}

impl Router {
    /// Router with no depth limit: chains end only by completing,
    /// failing, timing out or being cancelled
    pub fn new(registry: Arc<WorkerRegistry>) -> Self {
        Self {
            registry,
            max_chain_depth: None,
            stats: DeliveryStats::default(),
        }
    }

    /// Reject deliveries nested deeper than `limit` consultations
    pub fn with_max_chain_depth(mut self, limit: Option<u32>) -> Self {
        self.max_chain_depth = limit;
        self
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    pub fn max_chain_depth(&self) -> Option<u32> {
        self.max_chain_depth
    }

    pub fn stats(&self) -> &DeliveryStats {
        &self.stats
    }

    /// Deliver `request` from `from` to `to` and wait for the response.
    ///
    /// Fails with `UnknownIdentity` before the recipient does any work, and
    /// with `Cancelled` as soon as the chain's token fires.
    pub async fn deliver(
        self: &Arc<Self>,
        from: &WorkerId,
        to: &WorkerId,
        request: Message,
        ctx: &ChainContext,
    ) -> Result<Message> {
        ctx.ensure_active()?;

        if let Some(limit) = self.max_chain_depth {
            if ctx.depth() > limit {
                warn!(
                    chain_id = %ctx.chain_id(),
                    depth = ctx.depth(),
                    limit,
                    "Chain depth limit reached"
                );
                return Err(Error::ChainDepthExceeded {
                    depth: ctx.depth(),
                    limit,
                });
            }
        }

        let endpoint = self.registry.lookup(to)?;
        self.stats.record(to, ctx.depth() > 0);

        debug!(
            from = %from,
            to = %to,
            chain_id = %ctx.chain_id(),
            depth = ctx.depth(),
            "Delivering request"
        );

        let mut hop = HopTask::spawn(endpoint, Arc::clone(self), request, ctx.clone());
        let result = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(Error::Cancelled),
            result = hop.join() => result,
        };

        match &result {
            Ok(_) => debug!(from = %from, to = %to, depth = ctx.depth(), "Delivery complete"),
            Err(e) => debug!(from = %from, to = %to, depth = ctx.depth(), error = %e, "Delivery failed"),
        }

        result
    }
}

// ─────────────────────────────────────────────────────────────────
// Hop Task
// ─────────────────────────────────────────────────────────────────

/// One recipient's work on its own task. Aborted when dropped, so a
/// cancelled or timed-out delivery takes its nested hops down with it.
struct HopTask {
    handle: JoinHandle<Result<Message>>,
}

impl HopTask {
    fn spawn(
        endpoint: Arc<dyn Endpoint>,
        router: Arc<Router>,
        request: Message,
        ctx: ChainContext,
    ) -> Self {
        let handle = tokio::spawn(async move { endpoint.handle(request, &router, &ctx).await });
        Self { handle }
    }

    async fn join(&mut self) -> Result<Message> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Error::Cancelled),
            Err(e) => Err(Error::Internal(format!("Delivery task failed: {}", e))),
        }
    }
}

impl Drop for HopTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
