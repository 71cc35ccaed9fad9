use anyhow::{Context, Result};
use std::path::Path;

pub mod scenario;

pub use scenario::*;

impl ScenarioConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid scenario file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: ScenarioConfig = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }
}

pub trait Validate {
    fn validate(&self) -> Result<()>;
}
