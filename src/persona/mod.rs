//! Persona system: per-worker behaviour and the bundled demo fleet.
//!
//! Each worker in the mesh runs one persona: the text steering its
//! generator, how often it consults a peer, and how it frames the draft
//! it hands over.

pub mod registry;
pub mod types;

pub use registry::bundled_fleet;
pub use types::{WorkerConfig, WorkerSpec, DEFAULT_FRAMING, DRAFT_PLACEHOLDER};
