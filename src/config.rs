use crate::error::{CuratorError, Result};
use crate::types::{ContentSource, FilterRule};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Per-tenant deployment configuration. Fully validated and immutable for the
/// lifetime it is handed to the core; a config change means rebuilding the
/// aggregator and filter engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub deployment: DeploymentInfo,
    pub content: ContentConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub id: String,
    pub name: String,
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentConfig {
    pub sources: Vec<ContentSource>,
    /// Feed cache refresh interval in minutes.
    pub refresh_interval: u64,
    #[serde(default)]
    pub manual_approval_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub sensitivity: Sensitivity,
    #[serde(default)]
    pub rules: Vec<FilterRule>,
    #[serde(default)]
    pub dry_run_mode: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitivity: Sensitivity::default(),
            rules: Vec::new(),
            dry_run_mode: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Strict,
    #[default]
    Moderate,
    Permissive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub youtube_api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vimeo_access_token: Option<String>,
}

/// Load and validate a deployment config from a JSON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<DeploymentConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let config: DeploymentConfig = serde_json::from_str(&raw)?;
    validate_config(&config)?;
    info!(
        deployment_id = %config.deployment.id,
        sources = config.content.sources.len(),
        rules = config.filters.rules.len(),
        "Loaded deployment config from {}",
        path.display()
    );
    Ok(config)
}

pub fn validate_config(config: &DeploymentConfig) -> Result<()> {
    let id = &config.deployment.id;
    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CuratorError::Config(format!(
            "Deployment ID must be lowercase alphanumeric with hyphens: {id:?}"
        )));
    }

    if config.content.sources.is_empty() {
        return Err(CuratorError::Config(
            "At least one content source is required".to_string(),
        ));
    }

    if !(5..=1440).contains(&config.content.refresh_interval) {
        return Err(CuratorError::Config(format!(
            "Refresh interval must be between 5 and 1440 minutes, got {}",
            config.content.refresh_interval
        )));
    }

    let mut rule_ids = HashSet::new();
    for rule in &config.filters.rules {
        if rule.id.is_empty() {
            return Err(CuratorError::Config(
                "Filter rule ID is required".to_string(),
            ));
        }
        if !rule_ids.insert(rule.id.as_str()) {
            return Err(CuratorError::Config(format!(
                "Duplicate filter rule ID: {}",
                rule.id
            )));
        }
        if rule.conditions.is_empty() {
            return Err(CuratorError::Config(format!(
                "Filter rule {} needs at least one condition",
                rule.id
            )));
        }
    }

    Ok(())
}
