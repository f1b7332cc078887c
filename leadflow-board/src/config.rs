//! Engine configuration
//!
//! Layered with figment: serialized defaults, then an optional config file
//! (format picked from the extension, YAML otherwise), then `LEADFLOW_`
//! environment variables.

use crate::error::Result;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment overrides, e.g. `LEADFLOW_FAILURE_POLICY=mark_stale`
pub const ENV_PREFIX: &str = "LEADFLOW_";

/// What happens to the optimistic commit when persisting the moved lead fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Move the lead back to where it was before the gesture
    #[default]
    Revert,
    /// Keep the local position and flag the lead until the next refresh
    MarkStale,
}

/// Which leads get pushed to the store when a gesture commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingSync {
    /// Only the dragged lead
    #[default]
    MovedOnly,
    /// The dragged lead plus every renumbered sibling, one request each
    AllAffected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub failure_policy: FailurePolicy,
    pub sibling_sync: SiblingSync,
    /// Persist the dragged lead even when it ends where it started
    pub persist_unchanged: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            sibling_sync: SiblingSync::default(),
            persist_unchanged: true,
        }
    }
}

impl EngineConfig {
    /// The layered figment behind [`EngineConfig::load`]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));

        if let Some(path) = path {
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Yaml::file(path)),
            };
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: EngineConfig = Self::figment(path).extract()?;
        tracing::debug!(?config, "loaded engine configuration");
        Ok(config)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_sibling_sync(mut self, sync: SiblingSync) -> Self {
        self.sibling_sync = sync;
        self
    }

    pub fn with_persist_unchanged(mut self, persist: bool) -> Self {
        self.persist_unchanged = persist;
        self
    }
}
