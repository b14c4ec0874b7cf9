// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use crate::error::ConfigError;
use figment::Figment;
use figment::providers::Env;
use figment::providers::Format;
use figment::providers::Json;
use figment::providers::Serialized;
use figment::providers::Toml;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

// --- Default Values ---
/// Executable used when the configured path is blank.
pub const DEFAULT_EXECUTABLE: &str = "/usr/bin/arch-manager";

/// Settings file read from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "archdeck.toml";

/// Prefix of the environment variables that override settings.
pub const ENV_PREFIX: &str = "ARCHDECK_";

pub const MIN_REFRESH_SECS: u64 = 5;
pub const MAX_REFRESH_SECS: u64 = 3600;
pub const DEFAULT_REFRESH_SECS: u64 = 30;

/// Metrics refresh period in whole seconds, always within 5..=3600.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RefreshInterval(u64);

impl RefreshInterval {
  /// Pulls an arbitrary number of seconds into the allowed range.
  pub fn clamped(secs: u64) -> Self {
    Self(secs.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS))
  }

  pub fn secs(self) -> u64 {
    self.0
  }

  pub fn period(self) -> Duration {
    Duration::from_secs(self.0)
  }
}

impl Default for RefreshInterval {
  fn default() -> Self {
    Self(DEFAULT_REFRESH_SECS)
  }
}

impl TryFrom<u64> for RefreshInterval {
  type Error = ConfigError;

  fn try_from(secs: u64) -> Result<Self, Self::Error> {
    if (MIN_REFRESH_SECS..=MAX_REFRESH_SECS).contains(&secs) {
      Ok(Self(secs))
    } else {
      Err(ConfigError::IntervalOutOfRange(secs))
    }
  }
}

impl From<RefreshInterval> for u64 {
  fn from(interval: RefreshInterval) -> Self {
    interval.0
  }
}

/// User-facing settings of the front-end core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Path or name of the administration CLI. Blank means [`DEFAULT_EXECUTABLE`].
  pub executable: String,

  pub refresh_interval: RefreshInterval,

  pub auto_refresh: bool,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      executable: String::new(),
      refresh_interval: RefreshInterval::default(),
      auto_refresh: true,
    }
  }
}

impl Settings {
  /// The executable to launch right now. Not cached: callers resolve it on
  /// every invocation so a settings change applies to the next command.
  pub fn resolved_executable(&self) -> &str {
    let configured = self.executable.trim();
    if configured.is_empty() {
      DEFAULT_EXECUTABLE
    } else {
      configured
    }
  }

  /// Layers defaults, the settings file and `ARCHDECK_*` environment variables.
  ///
  /// A missing settings file is not an error. Files ending in `.json` are read
  /// as JSON, everything else as TOML.
  pub fn figment(path: Option<&Path>) -> Figment {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let figment = Figment::from(Serialized::defaults(Settings::default()));

    let figment = if path.extension().is_some_and(|ext| ext == "json") {
      figment.merge(Json::file(path))
    } else {
      figment.merge(Toml::file(path))
    };

    figment.merge(Env::prefixed(ENV_PREFIX))
  }

  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    let settings = Self::figment(path)
      .extract()
      .map_err(|e| ConfigError::Extract(Box::new(e)))?;
    tracing::debug!(?settings, "Settings loaded");
    Ok(settings)
  }

  pub fn to_toml(&self) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(self)?)
  }
}
