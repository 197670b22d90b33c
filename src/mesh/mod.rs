//! Consultation mesh
//!
//! Workers turn tasks into answers and may hand their draft to one randomly
//! chosen peer for refinement. All traffic between workers flows through
//! the `Router`, which resolves identities in the `WorkerRegistry` and
//! carries each chain's cancellation token down every nested hop.

pub mod chain;
pub mod message;
pub mod orchestrator;
pub mod registry;
pub mod router;
pub mod worker;

pub use chain::{ActiveChain, ChainContext, ChainOutcome, ChainTracker};
pub use message::{Message, WorkerId};
pub use orchestrator::{ChainHandle, Mesh, MeshBuilder, DEFAULT_ORCHESTRATOR_ID};
pub use registry::{Endpoint, WorkerRegistry};
pub use router::{DeliveryStats, Router};
pub use worker::Worker;
