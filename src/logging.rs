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
use anyhow::Result;
use std::env;
use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable naming the log file.
pub const LOG_FILE_ENV: &str = "ARCHDECK_LOG_FILE";

/// Environment variable naming the directory a relative log file lives in.
pub const LOG_DIR_ENV: &str = "ARCHDECK_LOG_DIR";

/// Filter used when `RUST_LOG` is unset: archdeck's own events at `info`,
/// everything else only when it warns.
pub const DEFAULT_FILTER: &str = "warn,archdeck=info";

/// Sets up the global tracing subscriber.
///
/// Reads the `ARCHDECK_LOG_FILE` env var.
/// - If set, logs to that file. A relative name is placed under
///   `ARCHDECK_LOG_DIR` (default: the working directory). Keep the returned
///   guard alive until exit so buffered lines are flushed.
/// - If not set, logs to stderr.
///
/// Log level is controlled by the `RUST_LOG` env var (e.g., `RUST_LOG=archdeck=debug`).
pub fn setup_tracing() -> Result<Option<WorkerGuard>> {
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  match env::var(LOG_FILE_ENV) {
    Ok(log_file) if !log_file.is_empty() => {
      let log_dir = env::var_os(LOG_DIR_ENV).map(PathBuf::from);
      let (dir, name) = log_target(Path::new(&log_file), log_dir.as_deref());
      std::fs::create_dir_all(&dir)?;

      let file_appender = tracing_appender::rolling::never(dir, name);
      let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

      tracing_subscriber::registry()
        .with(env_filter)
        .with(
          fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false), // No ANSI colors in files
        )
        .try_init()?;

      Ok(Some(guard))
    }
    _ => {
      tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

      Ok(None)
    }
  }
}

/// Splits the configured log file into the directory to open it in and the
/// file name.
fn log_target(file: &Path, log_dir: Option<&Path>) -> (PathBuf, OsString) {
  let name = file
    .file_name()
    .map(OsString::from)
    .unwrap_or_else(|| OsString::from("archdeck.log"));
  let parent = file.parent().filter(|p| !p.as_os_str().is_empty());

  let dir = match (parent, log_dir) {
    (Some(parent), _) if parent.is_absolute() => parent.to_path_buf(),
    (Some(parent), Some(base)) => base.join(parent),
    (Some(parent), None) => parent.to_path_buf(),
    (None, Some(base)) => base.to_path_buf(),
    (None, None) => PathBuf::from("."),
  };
  (dir, name)
}
