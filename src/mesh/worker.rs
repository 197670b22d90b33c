//! Worker: turns a request into an answer, consulting at most one peer
//!
//! `handle` suspends in exactly two places: the generation call and the
//! optional nested delivery. Both observe the chain's cancellation token.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::generation::{GenerationRequest, SharedGenerator};
use crate::persona::WorkerConfig;

use super::{ChainContext, Endpoint, Message, Router, WorkerId};

pub struct Worker {
    id: WorkerId,
    config: WorkerConfig,
    generator: SharedGenerator,
    rng: Mutex<StdRng>,
}

impl Worker {
    pub fn new(id: impl Into<WorkerId>, config: WorkerConfig, generator: SharedGenerator) -> Self {
        Self::with_rng(id, config, generator, StdRng::from_entropy())
    }

    /// Worker whose consultation rolls are reproducible
    pub fn with_seed(
        id: impl Into<WorkerId>,
        config: WorkerConfig,
        generator: SharedGenerator,
        seed: u64,
    ) -> Self {
        Self::with_rng(id, config, generator, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        id: impl Into<WorkerId>,
        config: WorkerConfig,
        generator: SharedGenerator,
        rng: StdRng,
    ) -> Self {
        Self {
            id: id.into(),
            config,
            generator,
            rng: Mutex::new(rng),
        }
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Draw once from [0, 1) and compare against the consultation probability
    fn roll_for_consultation(&self) -> bool {
        let roll: f64 = self.rng.lock().gen();
        let probability = self.config.consultation_probability();
        let consult = roll < probability;
        trace!(worker = %self.id, roll, probability, consult, "Consultation roll");
        consult
    }

    fn consultation_for(&self, draft: String) -> Message {
        Message::new(self.config.frame(&draft))
    }

    async fn generate(&self, input: String, ctx: &ChainContext) -> Result<String> {
        ctx.ensure_active()?;

        let request = GenerationRequest::new(self.config.persona(), input)
            .with_params(self.config.params().clone());

        debug!(
            worker = %self.id,
            backend = self.generator.name(),
            chain_id = %ctx.chain_id(),
            "Generating draft"
        );

        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(Error::Cancelled),
            result = self.generator.generate(request) => result,
        }
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("generator", &self.generator.name())
            .finish()
    }
}

#[async_trait]
impl Endpoint for Worker {
    async fn handle(
        &self,
        request: Message,
        router: &Arc<Router>,
        ctx: &ChainContext,
    ) -> Result<Message> {
        let draft = self.generate(request.into_content(), ctx).await?;

        if !self.roll_for_consultation() {
            return Ok(Message::new(draft));
        }

        match router.registry().select_peer_excluding(&self.id) {
            Ok(peer) => {
                debug!(worker = %self.id, peer = %peer, depth = ctx.depth(), "Consulting peer");
                // The draft is dropped here; the peer's reply replaces it
                let consultation = self.consultation_for(draft);
                router
                    .deliver(&self.id, &peer, consultation, &ctx.child())
                    .await
            }
            Err(Error::NoPeerAvailable { .. }) => {
                debug!(worker = %self.id, "No peer to consult, keeping own draft");
                Ok(Message::new(draft))
            }
            Err(e) => Err(e),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
