//! Mesh: the orchestrator-facing entry point
//!
//! `MeshBuilder` registers every worker before the mesh is handed out;
//! `Mesh` then submits top-level tasks as consultation chains, each bounded
//! by one end-to-end timeout and one cancellation token.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::generation::SharedGenerator;
use crate::persona::WorkerConfig;

use super::{
    ChainContext, ChainOutcome, ChainTracker, Endpoint, Message, Router, Worker, WorkerId,
    WorkerRegistry,
};

/// Sender identity used for external submissions when none is configured
pub const DEFAULT_ORCHESTRATOR_ID: &str = "orchestrator";

// ─────────────────────────────────────────────────────────────────
// Mesh Builder
// ─────────────────────────────────────────────────────────────────

struct PendingWorker {
    id: WorkerId,
    config: WorkerConfig,
    generator: SharedGenerator,
}

/// Collects workers and policy, then freezes them into a `Mesh`
pub struct MeshBuilder {
    seed: Option<u64>,
    chain_timeout: Option<Duration>,
    max_chain_depth: Option<u32>,
    orchestrator_id: WorkerId,
    workers: Vec<PendingWorker>,
    endpoints: Vec<(WorkerId, Arc<dyn Endpoint>)>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self {
            seed: None,
            chain_timeout: None,
            max_chain_depth: None,
            orchestrator_id: WorkerId::from(DEFAULT_ORCHESTRATOR_ID),
            workers: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    /// Builder preloaded with the `[mesh]` policy and `[[workers]]` of a config
    pub fn from_config(config: &AppConfig, generator: SharedGenerator) -> Result<Self> {
        let mut builder = Self::new()
            .chain_timeout(config.mesh.chain_timeout())
            .max_chain_depth(config.mesh.max_chain_depth)
            .orchestrator_id(config.mesh.orchestrator_id.as_str());

        if let Some(seed) = config.mesh.seed {
            builder = builder.seed(seed);
        }

        for spec in &config.workers {
            builder = builder.add_worker(spec.id.as_str(), spec.worker_config()?, generator.clone());
        }

        Ok(builder)
    }

    /// Seed every random draw in the mesh
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// End-to-end bound for each submitted chain (None = unbounded)
    pub fn chain_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.chain_timeout = timeout;
        self
    }

    /// Maximum number of nested consultations in one chain (None = unbounded)
    pub fn max_chain_depth(mut self, limit: Option<u32>) -> Self {
        self.max_chain_depth = limit;
        self
    }

    pub fn orchestrator_id(mut self, id: impl Into<WorkerId>) -> Self {
        self.orchestrator_id = id.into();
        self
    }

    pub fn add_worker(
        mut self,
        id: impl Into<WorkerId>,
        config: WorkerConfig,
        generator: SharedGenerator,
    ) -> Self {
        self.workers.push(PendingWorker {
            id: id.into(),
            config,
            generator,
        });
        self
    }

    /// Register a non-worker endpoint, e.g. a remote transport
    pub fn register(mut self, id: impl Into<WorkerId>, endpoint: Arc<dyn Endpoint>) -> Self {
        self.endpoints.push((id.into(), endpoint));
        self
    }

    /// Register everything and hand out the frozen mesh
    pub fn build(self) -> Result<Mesh> {
        let registry = Arc::new(match self.seed {
            Some(seed) => WorkerRegistry::with_seed(seed),
            None => WorkerRegistry::new(),
        });

        for (index, pending) in self.workers.into_iter().enumerate() {
            let worker = match self.seed {
                Some(seed) => Worker::with_seed(
                    pending.id,
                    pending.config,
                    pending.generator,
                    seed.wrapping_add(index as u64 + 1),
                ),
                None => Worker::new(pending.id, pending.config, pending.generator),
            };
            registry.register_worker(worker)?;
        }

        for (id, endpoint) in self.endpoints {
            registry.register(id, endpoint)?;
        }

        if registry.contains(&self.orchestrator_id) {
            return Err(Error::DuplicateIdentity {
                id: self.orchestrator_id.to_string(),
            });
        }

        info!(
            workers = registry.len(),
            timeout_ms = self.chain_timeout.map(millis),
            max_chain_depth = self.max_chain_depth,
            "Mesh built"
        );

        let router = Arc::new(Router::new(registry).with_max_chain_depth(self.max_chain_depth));

        Ok(Mesh {
            inner: Arc::new(MeshInner {
                router,
                tracker: ChainTracker::new(),
                orchestrator_id: self.orchestrator_id,
                chain_timeout: self.chain_timeout,
            }),
        })
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Mesh
// ─────────────────────────────────────────────────────────────────

struct MeshInner {
    router: Arc<Router>,
    tracker: ChainTracker,
    orchestrator_id: WorkerId,
    chain_timeout: Option<Duration>,
}

/// Cheap to clone; clones share the same workers and chain tracker
#[derive(Clone)]
pub struct Mesh {
    inner: Arc<MeshInner>,
}

impl Mesh {
    pub fn builder() -> MeshBuilder {
        MeshBuilder::new()
    }

    /// Submit a task to `recipient` and wait for the chain's final answer
    pub async fn submit(
        &self,
        recipient: impl Into<WorkerId>,
        task: impl Into<String>,
    ) -> Result<String> {
        self.submit_with_token(recipient, task, CancellationToken::new())
            .await
    }

    /// Like `submit`, but cancelling `token` aborts the whole chain
    pub async fn submit_with_token(
        &self,
        recipient: impl Into<WorkerId>,
        task: impl Into<String>,
        token: CancellationToken,
    ) -> Result<String> {
        let recipient = recipient.into();
        let ctx = ChainContext::new(token);
        let guard = TrackedChain::start(&self.inner, &ctx, &recipient);
        self.run_chain(recipient, task.into(), ctx, guard).await
    }

    /// Run a chain on its own task
    pub fn spawn(&self, recipient: impl Into<WorkerId>, task: impl Into<String>) -> ChainHandle {
        let recipient = recipient.into();
        let ctx = ChainContext::default();
        let chain_id = ctx.chain_id();
        let token = ctx.token().clone();
        let guard = TrackedChain::start(&self.inner, &ctx, &recipient);

        let mesh = self.clone();
        let task = task.into();
        let handle =
            tokio::spawn(async move { mesh.run_chain(recipient, task, ctx, guard).await });

        ChainHandle {
            chain_id,
            token,
            handle,
        }
    }

    /// Cancel a tracked chain. Returns false if it already finished.
    pub fn cancel(&self, chain_id: Uuid) -> bool {
        self.inner.tracker.cancel(chain_id)
    }

    /// Cancel every chain in flight
    pub fn cancel_all(&self) -> usize {
        self.inner.tracker.cancel_all()
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.inner.router
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        self.inner.router.registry()
    }

    pub fn tracker(&self) -> &ChainTracker {
        &self.inner.tracker
    }

    pub fn orchestrator_id(&self) -> &WorkerId {
        &self.inner.orchestrator_id
    }

    pub fn chain_timeout(&self) -> Option<Duration> {
        self.inner.chain_timeout
    }

    async fn run_chain(
        &self,
        recipient: WorkerId,
        task: String,
        ctx: ChainContext,
        mut guard: TrackedChain,
    ) -> Result<String> {
        info!(chain_id = %ctx.chain_id(), recipient = %recipient, "Chain started");

        let delivery = self.inner.router.deliver(
            &self.inner.orchestrator_id,
            &recipient,
            Message::new(task),
            &ctx,
        );

        let result = match self.inner.chain_timeout {
            Some(limit) => match tokio::time::timeout(limit, delivery).await {
                Ok(result) => result,
                Err(_) => {
                    ctx.token().cancel();
                    Err(Error::Timeout {
                        timeout_ms: millis(limit),
                    })
                }
            },
            None => delivery.await,
        };

        guard.finish(ChainOutcome::of(&result));

        match &result {
            Ok(_) => info!(chain_id = %ctx.chain_id(), recipient = %recipient, "Chain completed"),
            Err(e) => warn!(
                chain_id = %ctx.chain_id(),
                recipient = %recipient,
                error = %e.format_for_log(),
                "Chain failed"
            ),
        }

        result.map(Message::into_content)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Keeps a chain in the tracker for exactly as long as its future lives.
///
/// A chain whose future is dropped before it settles is cancelled and
/// recorded as such.
struct TrackedChain {
    inner: Arc<MeshInner>,
    chain_id: Uuid,
    outcome: Option<ChainOutcome>,
}

impl TrackedChain {
    fn start(inner: &Arc<MeshInner>, ctx: &ChainContext, recipient: &WorkerId) -> Self {
        inner.tracker.start(ctx, recipient);
        Self {
            inner: Arc::clone(inner),
            chain_id: ctx.chain_id(),
            outcome: None,
        }
    }

    fn finish(&mut self, outcome: ChainOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for TrackedChain {
    fn drop(&mut self) {
        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => {
                debug!(chain_id = %self.chain_id, "Chain dropped before settling");
                self.inner.tracker.cancel(self.chain_id);
                ChainOutcome::Cancelled
            }
        };
        self.inner.tracker.finish(self.chain_id, outcome);
    }
}

// ─────────────────────────────────────────────────────────────────
// Chain Handle
// ─────────────────────────────────────────────────────────────────

/// A chain running on its own task
pub struct ChainHandle {
    chain_id: Uuid,
    token: CancellationToken,
    handle: JoinHandle<Result<String>>,
}

impl ChainHandle {
    pub fn chain_id(&self) -> Uuid {
        self.chain_id
    }

    /// Cancel the chain; `join` then resolves with `Cancelled`
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the chain's final answer
    pub async fn join(self) -> Result<String> {
        self.handle
            .await
            .map_err(|e| Error::Internal(format!("Chain task failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
