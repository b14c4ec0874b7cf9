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
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
  name = "archdeck",
  version,
  about = "Terminal host for the arch-manager front-end core"
)]
pub struct Cli {
  /// Settings file. TOML, or JSON when the name ends in `.json`.
  #[arg(long, global = true, env = "ARCHDECK_CONFIG")]
  pub config: Option<PathBuf>,

  /// Path or name of the administration CLI, overriding the settings.
  #[arg(long, global = true)]
  pub executable: Option<String>,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Runs one command through the CLI and streams its output.
  Run {
    /// Collect output in a named sink instead of streaming it.
    ///
    /// Nothing is printed while the command runs. Once it ends, the sink's
    /// text (stdout and stderr together, in arrival order) goes to stdout and
    /// the final status to stderr.
    #[arg(long)]
    sink: Option<String>,

    /// Arguments passed to the CLI, e.g. `pacman install htop`.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
  },

  /// Queries `metrics all` and prints the decoded fields.
  Metrics {
    /// Print a JSON object instead of labelled lines.
    #[arg(long)]
    json: bool,

    /// Keep polling on the refresh timer.
    #[arg(long)]
    watch: bool,

    /// Refresh period in seconds for `--watch`.
    #[arg(long, value_parser = clap::value_parser!(u64).range(5..=3600))]
    interval: Option<u64>,
  },

  /// Prints the effective settings as TOML.
  Config,
}
