//! Deployment description: which tokens, feeds and synthetic asset an
//! engine instance is wired to.
//!
//! String fields may reference environment variables as `${VAR}`.

use alloy::primitives::{Address, I256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::EngineConfig;

/// Deployment file as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployment name (for logging/identification)
    #[serde(default = "default_deployment_name")]
    pub name: String,
    pub engine: EngineSection,
    pub synthetic: SyntheticSection,
    /// Collateral tokens, paired by position with `feeds`
    #[serde(default)]
    pub collateral: Vec<CollateralEntry>,
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
}

fn default_deployment_name() -> String {
    "local".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Engine identity toward token collaborators
    pub address: String,
    /// Profile name or engine config path; `ENGINE_PROFILE` when absent
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticSection {
    pub symbol: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralEntry {
    pub symbol: String,
    pub token: String,
    #[serde(default = "default_token_decimals")]
    pub decimals: u8,
}

fn default_token_decimals() -> u8 {
    18
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub address: String,
    #[serde(default = "default_feed_decimals")]
    pub decimals: u8,
    /// First answer, in feed decimals
    pub initial_answer: i64,
}

fn default_feed_decimals() -> u8 {
    8
}

/// Deployment with addresses parsed and the engine config selected.
#[derive(Debug, Clone)]
pub struct ResolvedDeployment {
    pub name: String,
    pub engine_address: Address,
    pub engine: EngineConfig,
    pub synthetic: ResolvedSynthetic,
    pub collateral: Vec<ResolvedCollateral>,
    pub feeds: Vec<ResolvedFeed>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSynthetic {
    pub symbol: String,
    pub address: Address,
}

#[derive(Debug, Clone)]
pub struct ResolvedCollateral {
    pub symbol: String,
    pub token: Address,
    pub decimals: u8,
}

#[derive(Debug, Clone)]
pub struct ResolvedFeed {
    pub address: Address,
    pub decimals: u8,
    pub initial_answer: I256,
}

impl DeploymentConfig {
    /// Load a deployment from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse deployment {}", path.display()))
    }

    /// Expand environment references and parse addresses.
    ///
    /// Collateral and feed lists are not checked against each other here;
    /// the engine rejects mismatched lengths at construction.
    pub fn resolve(&self) -> Result<ResolvedDeployment> {
        let engine_address = parse_address(&self.engine.address).context("engine.address")?;
        let engine = match &self.engine.profile {
            Some(selector) => EngineConfig::load(&expand_env(selector)?)?,
            None => EngineConfig::from_env()?,
        };

        let synthetic = ResolvedSynthetic {
            symbol: self.synthetic.symbol.clone(),
            address: parse_address(&self.synthetic.address).context("synthetic.address")?,
        };

        let collateral = self
            .collateral
            .iter()
            .map(|entry| {
                Ok(ResolvedCollateral {
                    symbol: entry.symbol.clone(),
                    token: parse_address(&entry.token)
                        .with_context(|| format!("collateral {} token", entry.symbol))?,
                    decimals: entry.decimals,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let feeds = self
            .feeds
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                Ok(ResolvedFeed {
                    address: parse_address(&entry.address)
                        .with_context(|| format!("feeds[{i}].address"))?,
                    decimals: entry.decimals,
                    initial_answer: I256::try_from(entry.initial_answer)
                        .with_context(|| format!("feeds[{i}].initial_answer"))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            deployment = %self.name,
            engine = %engine_address,
            collateral = collateral.len(),
            feeds = feeds.len(),
            "Deployment resolved"
        );

        Ok(ResolvedDeployment {
            name: self.name.clone(),
            engine_address,
            engine,
            synthetic,
            collateral,
            feeds,
        })
    }
}

/// Load and resolve a deployment file.
pub fn load_deployment(path: impl AsRef<Path>) -> Result<ResolvedDeployment> {
    DeploymentConfig::from_file(path)?.resolve()
}

/// Load the deployment named by `DEPLOYMENT_CONFIG`, or `config/deployment.toml`.
pub fn load_deployment_from_env() -> Result<ResolvedDeployment> {
    let path = std::env::var("DEPLOYMENT_CONFIG")
        .unwrap_or_else(|_| "config/deployment.toml".to_string());
    load_deployment(path)
}

fn parse_address(raw: &str) -> Result<Address> {
    let expanded = expand_env(raw)?;
    expanded
        .trim()
        .parse::<Address>()
        .with_context(|| format!("Invalid address '{expanded}'"))
}

/// Expand ${VAR_NAME} patterns with environment variable values.
/// Unset variables are left as written.
fn expand_env(s: &str) -> Result<String> {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")?;
    let mut result = s.to_string();

    for cap in re.captures_iter(s) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            if let Ok(value) = std::env::var(var_match.as_str()) {
                result = result.replace(full_match.as_str(), &value);
            }
        }
    }

    Ok(result)
}
