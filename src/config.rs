use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use url::Url;

/// Top-level configuration, usually read from `votemap.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub loader: LoaderConfig,
    pub join: JoinConfig,
    pub encoding: EncodingConfig,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        config.encoding.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Relative resource references are resolved against this.
    pub base_url: Option<Url>,
    /// Progress span covered by one load.
    pub total_progress_units: f64,
    /// Chunks buffered between the network reader and the decoder.
    pub channel_capacity: usize,
    /// Restore the baseline progress when a load fails instead of leaving it stalled.
    pub reset_progress_on_failure: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            total_progress_units: 100.0,
            channel_capacity: 16,
            reset_progress_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    pub row_name_field: String,
    pub feature_name_field: String,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            row_name_field: "Nama Kelurahan_2014".to_string(),
            feature_name_field: "NAME".to_string(),
        }
    }
}

pub const MIN_SIZE: f64 = 6.0;
pub const MAX_SIZE: f64 = 24.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Signed percentage-change column.
    pub change_field: String,
    /// Column holding the display name; popups are only built when set.
    pub area_field: Option<String>,
    pub min_size: f64,
    pub max_size: f64,
    pub positive_label: String,
    pub negative_label: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            change_field: "comparison_kota_jokowi_percentage_change".to_string(),
            area_field: None,
            min_size: MIN_SIZE,
            max_size: MAX_SIZE,
            positive_label: "Jokowi".to_string(),
            negative_label: "Prabowo".to_string(),
        }
    }
}

impl EncodingConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = self.min_size.is_finite() && self.max_size.is_finite();
        if !finite || self.min_size > self.max_size {
            anyhow::bail!(
                "invalid marker size range {}..{}",
                self.min_size,
                self.max_size
            );
        }
        Ok(())
    }
}
