//! Configuration management for threatwatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to load configuration from a `threatwatch.toml` file and merge it
//! with environment variables and CLI arguments.

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment, Provider,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Directory of reference-data overrides; embedded datasets are used
    /// for any file not present.
    pub data_dir: Option<PathBuf>,
    /// Path the whitelist is loaded from and persisted to.
    pub whitelist_path: Option<PathBuf>,
    /// Configuration for the result caches.
    pub cache: CacheConfig,
    /// Configuration for statistics persistence.
    pub stats: StatsConfig,
    /// Runtime analysis settings (feature toggles, category policies).
    pub settings: Settings,
}

/// Expiry windows and capacities for the two result caches.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// TTL for URL-analysis results in seconds.
    pub url_ttl_seconds: u64,
    /// Maximum number of URL-analysis entries.
    pub url_capacity: u64,
    /// TTL for page-analysis results in seconds.
    pub page_ttl_seconds: u64,
    /// Maximum number of page-analysis entries.
    pub page_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url_ttl_seconds: 600,
            url_capacity: 1000,
            page_ttl_seconds: 300,
            page_capacity: 500,
        }
    }
}

/// Statistics persistence settings. Counters are flushed periodically, not
/// on every analysis, to bound write volume.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StatsConfig {
    /// Path the stats snapshot is persisted to; disabled when unset.
    pub path: Option<PathBuf>,
    /// Seconds between persistence sweeps.
    pub persist_interval_seconds: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            path: None,
            persist_interval_seconds: 60,
        }
    }
}

/// Keyword strictness tier for a content category.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    Low,
    Moderate,
    /// Matches both the explicit and the moderate keyword sets.
    High,
}

/// Enablement and strictness for one content category.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct CategoryPolicy {
    pub enabled: bool,
    pub strictness: Strictness,
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            strictness: Strictness::Moderate,
        }
    }
}

/// Runtime analysis settings, hot-swappable via
/// `ThreatAnalyzer::update_settings`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Master toggle for the phishing-oriented detectors (homograph,
    /// typosquatting, login-form, brand impersonation, urgency language).
    pub phishing_detection: bool,
    /// Master toggle for tracker classification.
    pub tracker_detection: bool,
    /// Master toggle for content-category filtering.
    pub content_filtering: bool,
    /// Per-category content policy; categories absent from the map fall
    /// back to `CategoryPolicy::default()`.
    pub content_categories: BTreeMap<String, CategoryPolicy>,
    /// Per-category tracker enablement; absent categories default to on.
    pub tracker_categories: BTreeMap<String, bool>,
}

impl Settings {
    pub fn content_policy(&self, category: &str) -> CategoryPolicy {
        self.content_categories
            .get(category)
            .copied()
            .unwrap_or_default()
    }

    pub fn tracker_category_enabled(&self, category: &str) -> bool {
        self.tracker_categories.get(category).copied().unwrap_or(true)
    }

    /// Applies a partial update on top of this settings value, returning
    /// the merged result. Category maps are merged per key.
    pub fn merged_with(&self, update: &SettingsUpdate) -> Settings {
        let mut next = self.clone();
        if let Some(v) = update.phishing_detection {
            next.phishing_detection = v;
        }
        if let Some(v) = update.tracker_detection {
            next.tracker_detection = v;
        }
        if let Some(v) = update.content_filtering {
            next.content_filtering = v;
        }
        for (category, policy) in &update.content_categories {
            next.content_categories.insert(category.clone(), *policy);
        }
        for (category, enabled) in &update.tracker_categories {
            next.tracker_categories.insert(category.clone(), *enabled);
        }
        next
    }
}

impl Default for Settings {
    fn default() -> Self {
        let mut content_categories = BTreeMap::new();
        content_categories.insert(
            "adult".to_string(),
            CategoryPolicy {
                enabled: true,
                strictness: Strictness::High,
            },
        );
        for category in ["gambling", "violence", "drugs", "piracy"] {
            content_categories.insert(category.to_string(), CategoryPolicy::default());
        }

        let tracker_categories = ["advertising", "analytics", "social", "fingerprinting"]
            .into_iter()
            .map(|c| (c.to_string(), true))
            .collect();

        Self {
            phishing_detection: true,
            tracker_detection: true,
            content_filtering: true,
            content_categories,
            tracker_categories,
        }
    }
}

/// A partial settings overlay; `None` fields leave the current value
/// untouched, map entries replace only their own key.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SettingsUpdate {
    pub phishing_detection: Option<bool>,
    pub tracker_detection: Option<bool>,
    pub content_filtering: Option<bool>,
    #[serde(default)]
    pub content_categories: BTreeMap<String, CategoryPolicy>,
    #[serde(default)]
    pub tracker_categories: BTreeMap<String, bool>,
}

impl Config {
    /// Loads the application configuration by layering sources: defaults,
    /// the TOML file, `THREATWATCH_`-prefixed environment variables, and a
    /// final provider (typically the parsed CLI arguments).
    pub fn load(config_path: &str, overrides: impl Provider) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("THREATWATCH_").split("__"))
            .merge(overrides)
            .extract()?;
        Ok(config)
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: None,
            whitelist_path: None,
            cache: CacheConfig::default(),
            stats: StatsConfig::default(),
            settings: Settings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_enable_all_tracker_categories() {
        let settings = Settings::default();
        for category in ["advertising", "analytics", "social", "fingerprinting"] {
            assert!(settings.tracker_category_enabled(category));
        }
        // Unknown categories default to enabled.
        assert!(settings.tracker_category_enabled("beacon"));
    }

    #[test]
    fn default_adult_policy_is_high_strictness() {
        let settings = Settings::default();
        let policy = settings.content_policy("adult");
        assert!(policy.enabled);
        assert_eq!(policy.strictness, Strictness::High);
        assert_eq!(settings.content_policy("gambling").strictness, Strictness::Moderate);
    }

    #[test]
    fn merged_with_overlays_only_present_fields() {
        let base = Settings::default();
        let update = SettingsUpdate {
            tracker_detection: Some(false),
            content_categories: [(
                "gambling".to_string(),
                CategoryPolicy {
                    enabled: false,
                    strictness: Strictness::Low,
                },
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };

        let merged = base.merged_with(&update);
        assert!(!merged.tracker_detection);
        assert!(merged.phishing_detection, "untouched field preserved");
        assert!(!merged.content_policy("gambling").enabled);
        // Other categories untouched.
        assert!(merged.content_policy("adult").enabled);
    }
}
