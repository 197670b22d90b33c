//! Bundled fleet: the demo worker roster compiled into the binary.

use serde::Deserialize;

use crate::error::Result;

use super::types::WorkerSpec;

const BUNDLED_FLEET: &str = include_str!("../../config/fleet.toml");

#[derive(Deserialize)]
struct FleetFile {
    #[serde(default)]
    workers: Vec<WorkerSpec>,
}

/// Parse the bundled demo fleet.
pub fn bundled_fleet() -> Result<Vec<WorkerSpec>> {
    let file: FleetFile = toml::from_str(BUNDLED_FLEET)?;
    Ok(file.workers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bundled_fleet_parses() {
        let fleet = bundled_fleet().unwrap();
        assert!(fleet.len() >= 2, "consultation needs at least two workers");
    }

    #[test]
    fn test_bundled_fleet_is_valid() {
        let fleet = bundled_fleet().unwrap();
        let mut seen = HashSet::new();
        for spec in &fleet {
            assert!(seen.insert(spec.id.clone()), "duplicate id {}", spec.id);
            assert!(!spec.persona.trim().is_empty());
            let config = spec.worker_config().unwrap();
            assert!(config.framing().contains("{draft}"));
        }
    }
}
