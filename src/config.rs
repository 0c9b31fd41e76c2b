use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants;
use crate::error::{ReconcileError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scope: ScopeConfig,
    pub jurisdictions: JurisdictionConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Business rules deciding which records are in scope for a batch
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub year: i32,
    pub excluded_product: String,
    pub excluded_types: Vec<String>,
    pub excluded_statuses: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            year: constants::SCOPE_YEAR,
            excluded_product: constants::NOT_COVID_PRODUCT.to_string(),
            excluded_types: vec![
                constants::TYPE_CALL_FOR_TENDER.to_string(),
                constants::TYPE_DUPLICATE.to_string(),
            ],
            excluded_statuses: vec![constants::STATUS_CANCELLED.to_string()],
        }
    }
}

/// Buyer-country codes that get jurisdiction-specific deduplication
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JurisdictionConfig {
    /// Countries publishing without lots or unique source identifiers
    pub lotless: Vec<String>,
    /// Countries numbering contracts as tender-number/lot
    pub split_lot: Vec<String>,
}

impl Default for JurisdictionConfig {
    fn default() -> Self {
        Self {
            lotless: vec![constants::LOTLESS_COUNTRY.to_string()],
            split_lot: vec![constants::SPLIT_LOT_COUNTRY.to_string()],
        }
    }
}

impl JurisdictionConfig {
    pub fn is_lotless(&self, country: Option<&str>) -> bool {
        matches_country(&self.lotless, country)
    }

    pub fn is_split_lot(&self, country: Option<&str>) -> bool {
        matches_country(&self.split_lot, country)
    }
}

fn matches_country(codes: &[String], country: Option<&str>) -> bool {
    match country {
        Some(country) => codes.iter().any(|code| code.eq_ignore_ascii_case(country.trim())),
        None => false,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(config_path) = path else {
            return Ok(Self::default());
        };

        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ReconcileError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.scope.excluded_product.trim().is_empty() {
            return Err(ReconcileError::Config(
                "scope.excluded_product must not be empty".to_string(),
            ));
        }
        Ok(config)
    }
}
