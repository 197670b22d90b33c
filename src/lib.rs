//! Consult Mesh - peer-consulting worker mesh
//!
//! Workers answer tasks with the help of a text generation backend and,
//! with a configured probability, hand their draft to one randomly chosen
//! peer for refinement. Every exchange goes through a single router that
//! threads one cancellation token through the whole consultation chain.
//!
//! ```no_run
//! use std::sync::Arc;
//! use consult_mesh::generation::MockGenerator;
//! use consult_mesh::mesh::Mesh;
//! use consult_mesh::persona::WorkerConfig;
//!
//! # async fn demo() -> consult_mesh::error::Result<()> {
//! let generator = Arc::new(MockGenerator::suffix("!"));
//! let mesh = Mesh::builder()
//!     .add_worker("a", WorkerConfig::new("You plan.", 1.0)?, generator.clone())
//!     .add_worker("b", WorkerConfig::new("You refine.", 0.0)?, generator)
//!     .build()?;
//! let answer = mesh.submit("a", "Plan a picnic").await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod mesh;
pub mod persona;

pub use error::{Error, ErrorCode, Result};
