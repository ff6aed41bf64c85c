use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::row::AppId;

/// Top-level run configuration shared by the collector and the trainer.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Apps to collect, in processing order.
    pub identifiers: Vec<AppId>,
    pub store_path: PathBuf,
    pub model_path: PathBuf,
    #[serde(default)]
    pub collector: CollectorSettings,
    #[serde(default)]
    pub trainer: TrainerSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    /// Pause after each app, in milliseconds.
    pub pause_ms: u64,
    pub store_api: String,
    pub charts_api: String,
    /// Storefront country code, decides the currency of `price`.
    pub country: String,
    pub language: String,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            pause_ms: 1000,
            store_api: "https://store.steampowered.com".to_string(),
            charts_api: "https://steamcharts.com".to_string(),
            country: "us".to_string(),
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainerSettings {
    pub trees: usize,
    pub max_depth: u32,
    pub shrinkage: f32,
    /// Share of labeled rows held out for evaluation. Zero trains on everything.
    pub test_fraction: f64,
    pub seed: Option<u64>,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            trees: 100,
            max_depth: 6,
            shrinkage: 0.3,
            test_fraction: 0.0,
            seed: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file. Relative paths inside it are
    /// taken relative to the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config =
            Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if config.store_path.is_relative() {
            config.store_path = base.join(&config.store_path);
        }
        if config.model_path.is_relative() {
            config.model_path = base.join(&config.model_path);
        }
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let trainer = &self.trainer;
        if !(0.0..1.0).contains(&trainer.test_fraction) {
            bail!(
                "trainer.test_fraction must be in [0, 1), got {}",
                trainer.test_fraction
            );
        }
        if trainer.trees == 0 {
            bail!("trainer.trees must be positive");
        }
        if trainer.max_depth == 0 {
            bail!("trainer.max_depth must be positive");
        }
        if !trainer.shrinkage.is_finite() || trainer.shrinkage <= 0.0 {
            bail!("trainer.shrinkage must be positive");
        }
        Ok(())
    }
}
