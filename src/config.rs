//! Sweep configuration and the TOML profile store.
//!
//! The active [`SweepConfig`] is an immutable snapshot: reconfiguration
//! replaces it whole, and a firing reads it exactly once. [`SweepProfile`]
//! is the on-disk shape (sweep section, per-category rules, debug switches)
//! with a lenient loader for startup and a strict loader for operator
//! reloads, which keep the last-good profile on failure.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::policy::{CategoryRule, VisitorPolicy};

/// Errors produced by sweep configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The firing period must be at least one tick.
    #[error("sweep period must be at least 1 tick")]
    ZeroPeriod,
    /// Interval multipliers must be at least 1 (1 = every firing).
    #[error("interval multiplier for category `{category}` must be at least 1")]
    ZeroIntervalMultiplier {
        /// Category whose rule failed validation.
        category: String,
    },
}

/// Errors produced by a strict profile reload.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The profile file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The profile file is not valid TOML for this schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// The profile parsed but violates a configuration invariant.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Active sweep configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Ticks between firings (must be >= 1).
    pub period_ticks: u64,
    /// Per-firing visit cap; 0 means unlimited.
    pub max_visits_per_firing: usize,
    /// Master switch; a firing that observes `false` cancels the sweep.
    pub enabled: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            period_ticks: 2,
            max_visits_per_firing: 10,
            enabled: true,
        }
    }
}

impl SweepConfig {
    /// Check invariants, rejecting a zero period.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ticks == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }
}

/// Debug switches mirrored from the profile's `[debug]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugOptions {
    /// Log each visit at debug level.
    pub log_visits: bool,
    /// Log a per-firing summary at debug level.
    pub firing_stats: bool,
}

/// On-disk profile: sweep settings plus the per-category visitor policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SweepProfile {
    /// Core sweep settings.
    pub sweep: SweepConfig,
    /// Category rules keyed by canonical category name.
    pub categories: BTreeMap<String, CategoryRule>,
    /// Rule applied to categories without an explicit entry.
    pub default_rule: CategoryRule,
    /// Debug switches.
    pub debug: DebugOptions,
}

impl SweepProfile {
    /// Load a profile, falling back to defaults on any error.
    ///
    /// A missing file is normal on first run and is not logged.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<SweepProfile>(&contents) {
                Ok(profile) => match profile.validate() {
                    Ok(()) => profile,
                    Err(err) => {
                        warn!("Invalid profile {}: {err}. Using defaults", path.display());
                        Self::default()
                    }
                },
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                Self::default()
            }
        }
    }

    /// Load a profile strictly, returning errors to the caller.
    ///
    /// Intended for operator-driven reloads: on failure the caller keeps its
    /// last-good profile.
    pub fn reload_from_path(path: &Path) -> Result<Self, ReloadError> {
        let contents = fs::read_to_string(path).map_err(|source| ReloadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let profile: SweepProfile =
            toml::from_str(&contents).map_err(|source| ReloadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Save the profile as pretty TOML, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Check the sweep section and every category rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sweep.validate()?;
        self.default_rule.validate("default")?;
        for (category, rule) in &self.categories {
            rule.validate(category)?;
        }
        Ok(())
    }

    /// Build the visitor policy described by this profile.
    pub fn policy(&self) -> VisitorPolicy {
        VisitorPolicy::with_rules(self.default_rule, self.categories.clone())
    }
}
