// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Register configuration and feature flags.
//!
//! The finalization engine never looks anything up on its own. Register
//! options and feature flags are resolved once into [`Capabilities`] and passed
//! in, so the calculator and the confirm predicate stay pure.
//!
//! # Example
//!
//! ```
//! use ressourcerie_checkout::Config;
//!
//! let config = Config::from_toml_str(r#"
//!     [register.features.no_item_pricing]
//!     enabled = true
//!
//!     [flags]
//!     check_change = true
//! "#).unwrap();
//!
//! let caps = config.capabilities();
//! assert!(caps.global_pricing);
//! assert!(caps.check_change);
//! assert!(!caps.card_enabled);
//! ```

use crate::error::ConfigError;
use crate::sale::PresetClassifier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Flag: check payments take a tendered amount and give change, like cash.
pub const FLAG_CHECK_CHANGE: &str = "check_change";
/// Flag: the card method can be selected.
pub const FLAG_CARD_PAYMENTS: &str = "card_payments";

/// Register options as served by the register-options collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterOptions {
    pub features: RegisterFeatures,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterFeatures {
    pub no_item_pricing: FeatureToggle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggle {
    pub enabled: bool,
}

impl RegisterOptions {
    pub fn with_global_pricing(enabled: bool) -> Self {
        Self {
            features: RegisterFeatures {
                no_item_pricing: FeatureToggle { enabled },
            },
        }
    }

    /// Whether the operator types the sale total instead of pricing items.
    pub fn global_pricing(&self) -> bool {
        self.features.no_item_pricing.enabled
    }
}

/// Named boolean flag lookup.
pub trait FeatureFlags {
    fn is_enabled(&self, name: &str) -> bool;
}

/// Flag set backed by a map. Unknown flags are off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticFlags(HashMap<String, bool>);

impl StaticFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.0.insert(name.into(), enabled);
        self
    }
}

impl FeatureFlags for StaticFlags {
    fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }
}

/// Resolved capability set consumed by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Manual-total mode.
    pub global_pricing: bool,
    /// Checks behave like cash.
    pub check_change: bool,
    /// Card is selectable.
    pub card_enabled: bool,
}

impl Capabilities {
    pub fn resolve(options: &RegisterOptions, flags: &dyn FeatureFlags) -> Self {
        Self {
            global_pricing: options.global_pricing(),
            check_change: flags.is_enabled(FLAG_CHECK_CHANGE),
            card_enabled: flags.is_enabled(FLAG_CARD_PAYMENTS),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Register configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub register: RegisterOptions,
    pub flags: StaticFlags,
    /// Preset identifiers marking recycling, drop-off and donation lines.
    pub special_presets: Vec<String>,
    /// How long the "payment added" notice stays up, in milliseconds.
    pub notice_ms: u64,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            register: RegisterOptions::default(),
            flags: StaticFlags::default(),
            special_presets: PresetClassifier::DEFAULT_PRESETS
                .iter()
                .map(|preset| preset.to_string())
                .collect(),
            notice_ms: 2_000,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.notice_ms == 0 {
            return Err(ConfigError::Invalid(
                "notice_ms must be greater than zero".to_string(),
            ));
        }
        if self.special_presets.iter().any(|preset| preset.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "special_presets must not contain blank identifiers".to_string(),
            ));
        }
        Ok(())
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::resolve(&self.register, &self.flags)
    }

    pub fn classifier(&self) -> PresetClassifier {
        PresetClassifier::new(self.special_presets.iter().cloned())
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_ms)
    }
}
