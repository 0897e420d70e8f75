//! Desired-state manifest
//!
//! ```toml
//! [[aggregate]]
//! name = "ssd-hosts"
//! availability_zone = "az1"
//! hosts = ["compute-1", "compute-2"]
//!
//! [aggregate.metadata]
//! ssd = "true"
//!
//! [[aggregate]]
//! name = "retired"
//! ensure = "absent"
//! ```

use anyhow::{Context, Result, bail};
use novakit::DesiredAggregate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::ManifestArgs;
use crate::paths;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "aggregate")]
    pub aggregates: Vec<DesiredAggregate>,
}

impl Manifest {
    /// Parse manifest TOML
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content).context("Invalid manifest format")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Names must be present and unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for aggregate in &self.aggregates {
            if aggregate.name.trim().is_empty() {
                bail!("Aggregate with empty name");
            }
            if !seen.insert(aggregate.name.as_str()) {
                bail!("Aggregate '{}' is declared more than once", aggregate.name);
            }
        }
        Ok(())
    }

    /// Aggregates selected by an optional name filter
    pub fn select(&self, name: Option<&str>) -> Result<Vec<&DesiredAggregate>> {
        match name {
            None => Ok(self.aggregates.iter().collect()),
            Some(name) => {
                let found: Vec<_> = self.aggregates.iter().filter(|a| a.name == name).collect();
                if found.is_empty() {
                    bail!("Aggregate '{name}' is not in the manifest");
                }
                Ok(found)
            }
        }
    }
}

/// Resolve the manifest path from CLI args or the config dir
pub fn manifest_path(args: &ManifestArgs) -> Result<PathBuf> {
    match &args.manifest {
        Some(path) => Ok(paths::expand(&path.to_string_lossy())),
        None => paths::default_manifest(),
    }
}
