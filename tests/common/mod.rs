//! Common test utilities and fixtures
//!
//! Shared by the mesh, config and CLI integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use consult_mesh::generation::{MockGenerator, SharedGenerator};
use consult_mesh::mesh::{Mesh, MeshBuilder};
use consult_mesh::persona::WorkerConfig;

/// Mock-backed config: "a" always consults, "b" never does
pub const TWO_WORKER_CONFIG: &str = r#"
[mesh]
chain_timeout_ms = 5000
seed = 11

[generation]
backend = "mock"

[logging]
level = "warn"

[[workers]]
id = "a"
persona = "Alpha"
consultation_probability = 1.0
framing = "Refine: {draft}"

[[workers]]
id = "b"
persona = "Beta"
consultation_probability = 0.0
"#;

/// A config file in a temp directory
pub struct ConfigFixture {
    _temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("consult-mesh.toml");
        Self {
            _temp_dir: temp_dir,
            config_path,
        }
    }

    pub fn with_content(content: &str) -> Self {
        let fixture = Self::new();
        fixture.write_config(content);
        fixture
    }

    pub fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    pub fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    pub fn dir(&self) -> PathBuf {
        self.config_path.parent().unwrap().to_path_buf()
    }
}

/// Worker config with a recognisable framing
pub fn worker_config(persona: &str, probability: f64) -> WorkerConfig {
    WorkerConfig::new(persona, probability)
        .unwrap()
        .with_framing(format!("{} refine: {{draft}}", persona))
}

/// Seeded builder with one shared generator for every worker
pub fn builder_of(workers: &[(&str, f64)], generator: SharedGenerator, seed: u64) -> MeshBuilder {
    workers
        .iter()
        .fold(Mesh::builder().seed(seed), |builder, (id, p)| {
            builder.add_worker(*id, worker_config(id, *p), generator.clone())
        })
}

/// Seeded mesh whose workers share one suffix-appending mock
pub fn mesh_of(workers: &[(&str, f64)], suffix: &str) -> (Mesh, Arc<MockGenerator>) {
    let generator = Arc::new(MockGenerator::suffix(suffix));
    let mesh = builder_of(workers, generator.clone(), 42).build().unwrap();
    (mesh, generator)
}
