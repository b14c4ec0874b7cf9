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
use Commands::Config;
use Commands::Metrics;
use Commands::Run;
use anyhow::Context;
use anyhow::Result;
use archdeck::cli::Cli;
use archdeck::cli::Commands;
use archdeck::command::Invocation;
use archdeck::config::RefreshInterval;
use archdeck::config::Settings;
use archdeck::logging::setup_tracing;
use archdeck::sink::SinkId;
use archdeck::terminal::run_command;
use archdeck::terminal::show_metrics;
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  let guard = setup_tracing()?;

  let Cli {
    config,
    executable,
    command,
  } = Cli::parse();

  let mut settings = Settings::load(config.as_deref()).context("Failed to load settings")?;
  if let Some(executable) = executable {
    settings.executable = executable;
  }

  let main_span = tracing::info_span!("archdeck");
  let _enter = main_span.enter();

  match command {
    Run { sink, args } => {
      let mut invocation = Invocation::new(args);
      if let Some(sink) = sink {
        invocation = invocation.with_sink(SinkId::new(sink));
      }

      let code = run_command(settings, invocation).await?;
      if code != 0 {
        drop(_enter);
        drop(guard);
        std::process::exit(code);
      }
    }
    Metrics {
      json,
      watch,
      interval,
    } => {
      if let Some(secs) = interval {
        settings.refresh_interval = RefreshInterval::clamped(secs);
      }
      show_metrics(settings, json, watch).await?;
    }
    Config => {
      print!("{}", settings.to_toml()?);
    }
  }

  Ok(())
}
