//! Worker registry: the directory of live workers
//!
//! Populated by `MeshBuilder` before any traffic flows and read thereafter.
//! Reads and writes go through a readers-writer lock so late registration
//! stays safe, though no in-flight chain ever depends on it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};

use super::{ChainContext, Message, Router, Worker, WorkerId};

// ─────────────────────────────────────────────────────────────────
// Endpoint
// ─────────────────────────────────────────────────────────────────

/// Anything the router can deliver a request to.
///
/// In-process workers are the only endpoint the mesh builds itself; other
/// transports implement this and report their failures as `DeliveryFailure`.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Turn a request into a response. Nested consultations go back
    /// through `router` with a child of `ctx`.
    async fn handle(
        &self,
        request: Message,
        router: &Arc<Router>,
        ctx: &ChainContext,
    ) -> Result<Message>;
}

// ─────────────────────────────────────────────────────────────────
// Worker Registry
// ─────────────────────────────────────────────────────────────────

/// Thread-safe map of identity to endpoint plus the peer selection policy
pub struct WorkerRegistry {
    endpoints: RwLock<HashMap<WorkerId, Arc<dyn Endpoint>>>,
    rng: Mutex<StdRng>,
}

impl WorkerRegistry {
    /// Create an empty registry with an entropy-seeded selector
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create an empty registry whose peer selection is reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    /// Register an endpoint under `id`
    pub fn register(&self, id: WorkerId, endpoint: Arc<dyn Endpoint>) -> Result<()> {
        let mut endpoints = self.endpoints.write();
        if endpoints.contains_key(&id) {
            return Err(Error::DuplicateIdentity { id: id.to_string() });
        }
        endpoints.insert(id, endpoint);
        Ok(())
    }

    /// Register an in-process worker under its own identity
    pub fn register_worker(&self, worker: Worker) -> Result<()> {
        let id = worker.id().clone();
        self.register(id, Arc::new(worker))
    }

    /// Resolve an identity to its endpoint
    pub fn lookup(&self, id: &WorkerId) -> Result<Arc<dyn Endpoint>> {
        self.endpoints
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::unknown_identity(id))
    }

    /// Pick a peer uniformly from every registered identity except `id`.
    ///
    /// Candidates are sorted before sampling so a seeded registry makes the
    /// same choices regardless of hash order.
    pub fn select_peer_excluding(&self, id: &WorkerId) -> Result<WorkerId> {
        let mut candidates: Vec<WorkerId> = self
            .endpoints
            .read()
            .keys()
            .filter(|candidate| *candidate != id)
            .cloned()
            .collect();
        candidates.sort();

        let mut rng = self.rng.lock();
        candidates
            .choose(&mut *rng)
            .cloned()
            .ok_or_else(|| Error::NoPeerAvailable { id: id.to_string() })
    }

    /// Registered identities, sorted
    pub fn identities(&self) -> Vec<WorkerId> {
        let mut ids: Vec<WorkerId> = self.endpoints.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &WorkerId) -> bool {
        self.endpoints.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
