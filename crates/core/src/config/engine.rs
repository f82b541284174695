//! Engine configuration with profile support.
//!
//! Profiles fix the solvency policy (`default`, `legacy`) and the event
//! channel size. The policy is chosen once at construction; there are no
//! dynamic parameters.

use alloy::primitives::U256;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::u256_math::{LEGACY_MIN_HEALTH_FACTOR, MIN_HEALTH_FACTOR};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Solvency enforcement
    #[serde(default)]
    pub solvency: SolvencyPolicy,

    /// Event delivery
    #[serde(default)]
    pub events: EventConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// When the mint-time solvency check runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MintCheck {
    /// Before the debt increase, and only if the account already owes something
    PreMint,
    /// After the debt increase
    PostMint,
}

/// Minimum health factor and mint-check placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvencyPolicy {
    /// Minimum health factor, compared directly against the computed ratio
    #[serde(default = "default_min_health_factor")]
    pub min_health_factor: u64,

    #[serde(default = "default_mint_check")]
    pub mint_check: MintCheck,
}

fn default_min_health_factor() -> u64 {
    MIN_HEALTH_FACTOR.to()
}
fn default_mint_check() -> MintCheck {
    MintCheck::PostMint
}

impl Default for SolvencyPolicy {
    fn default() -> Self {
        Self {
            min_health_factor: default_min_health_factor(),
            mint_check: default_mint_check(),
        }
    }
}

impl SolvencyPolicy {
    /// Unscaled threshold with the mint check on pre-mint debt.
    pub fn legacy() -> Self {
        Self {
            min_health_factor: LEGACY_MIN_HEALTH_FACTOR.to(),
            mint_check: MintCheck::PreMint,
        }
    }

    pub fn min_health_factor(&self) -> U256 {
        U256::from(self.min_health_factor)
    }
}

/// Event channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventConfig {
    /// Buffered events per subscriber before it starts lagging
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            solvency: SolvencyPolicy::default(),
            events: EventConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse engine config {}", path.display()))?;
        Ok(config)
    }

    /// Profile reproducing the unscaled threshold and pre-mint check.
    pub fn legacy() -> Self {
        Self {
            profile: "legacy".to_string(),
            solvency: SolvencyPolicy::legacy(),
            events: EventConfig::default(),
        }
    }

    /// Resolve a profile by name. Unknown names yield `None`.
    pub fn profile(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" | "" => Some(Self::default()),
            "legacy" => Some(Self::legacy()),
            _ => None,
        }
    }

    /// Resolve a profile name or a path to a TOML file.
    pub fn load(selector: &str) -> anyhow::Result<Self> {
        if let Some(config) = Self::profile(selector) {
            return Ok(config);
        }
        if selector.ends_with(".toml") || Path::new(selector).is_file() {
            return Self::from_file(selector);
        }
        anyhow::bail!("Unknown engine profile '{selector}' (expected default, legacy or a TOML path)")
    }

    /// Select configuration from `ENGINE_PROFILE`. Unset means the default profile.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var("ENGINE_PROFILE") {
            Ok(selector) => Self::load(&selector),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "Engine configuration loaded");
        tracing::info!(
            min_health_factor = self.solvency.min_health_factor,
            mint_check = ?self.solvency.mint_check,
            "Solvency policy"
        );
        tracing::info!(
            channel_capacity = self.events.channel_capacity,
            "Event delivery"
        );
    }
}
