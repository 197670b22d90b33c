//! Generation capability
//!
//! The mesh treats text generation as an opaque, possibly slow and fallible
//! capability. This module defines that seam and ships two implementations:
//! an OpenAI-compatible HTTP client and a scriptable mock.

mod mock;
mod openai;
mod registry;
mod traits;

pub use mock::{MockConfig, MockGenerator, MockResponse, MAX_RECORDED_INPUTS};
pub use openai::{OpenAiConfig, OpenAiGenerator};
pub use registry::{create_generator, BackendKind, MOCK_SUFFIX};
pub use traits::*;
