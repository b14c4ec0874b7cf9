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
use thiserror::Error;

/// Top-level error enum for the archdeck library.
#[derive(Error, Debug)]
pub enum ArchdeckError {
  #[error("Configuration error")]
  Config(#[from] ConfigError),

  #[error("Command rejected: {0}")]
  Run(#[from] RunError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON serialization error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Metrics refresh could not be started")]
  MetricsUnavailable,
}

/// Why a user-triggered invocation did not produce a running process
/// (src/runner.rs).
#[derive(Error, Debug)]
pub enum RunError {
  #[error("busy")]
  Busy,

  #[error("empty command")]
  EmptyCommand,

  #[error("no executable configured")]
  NoExecutable,

  #[error("Failed to start {program}: {source}")]
  Launch {
    program: String,
    #[source]
    source: std::io::Error,
  },
}

/// Errors related to loading settings (src/config.rs).
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to extract settings: {0}")]
  Extract(#[from] Box<figment::Error>),

  #[error("Refresh interval {0}s is outside the allowed range of 5..=3600 seconds")]
  IntervalOutOfRange(u64),

  #[error("Failed to render settings as TOML")]
  RenderToml(#[from] toml::ser::Error),
}
