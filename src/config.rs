// YAML settings file.
//
// Only the crawl stage reads the settings file; every other stage takes its
// parameters on the command line.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Settings loaded from `settings.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Seed URLs used to initialize the crawl queue on a reset run.
    pub crawl_seeds: Vec<String>,
}

/// Load and validate settings from a YAML file.
pub fn load(path: &Path) -> Result<Settings> {
    let raw = fs::read_to_string(path)?;
    let settings: Settings = serde_yml::from_str(&raw)?;
    if settings.crawl_seeds.is_empty() {
        return Err(PipelineError::Config(format!(
            "{}: crawl_seeds must not be empty",
            path.display()
        )));
    }
    Ok(settings)
}
