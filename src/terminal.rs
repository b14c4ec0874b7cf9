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
use crate::command::Invocation;
use crate::config::Settings;
use crate::error::ArchdeckError;
use crate::metrics::MetricFields;
use crate::metrics::MetricKey;
use crate::session::Session;
use crate::session::Update;
use crate::sink::OutputSink;
use crate::sink::Stream;
use serde_json::Map;
use serde_json::Value;
use std::io::Write;

/// Console sink for a terminal: stdout chunks go to stdout, everything else
/// to stderr.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl OutputSink for TerminalSink {
  fn append(&mut self, stream: Stream, text: &str) {
    let result = match stream {
      Stream::Stdout => {
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes()).and_then(|_| out.flush())
      }
      Stream::Stderr | Stream::System => {
        let mut err = std::io::stderr().lock();
        err.write_all(text.as_bytes()).and_then(|_| err.flush())
      }
    };
    if let Err(e) = result {
      tracing::debug!(error = %e, "Failed to write to terminal");
    }
  }

  // A terminal cannot be cleared.
  fn clear(&mut self) {}
}

/// Runs one invocation to completion and returns the exit code to report.
pub async fn run_command(settings: Settings, invocation: Invocation) -> Result<i32, ArchdeckError> {
  let settings = Settings {
    auto_refresh: false,
    ..settings
  };
  let mut session = Session::with_console(settings, Box::new(TerminalSink));
  session.run(invocation)?;

  loop {
    if let Update::CommandFinished { sink, outcome } = session.next_update().await {
      if !sink.is_console() {
        if let Some(text) = session.sink(&sink).and_then(|s| s.text()) {
          print!("{text}");
          std::io::stdout().flush()?;
        }
      }
      eprintln!("{}", session.status());
      return Ok(outcome.code().unwrap_or(1));
    }
  }
}

/// Polls metrics once, or forever with `watch`, printing every refresh.
pub async fn show_metrics(settings: Settings, json: bool, watch: bool) -> Result<(), ArchdeckError> {
  let settings = Settings {
    auto_refresh: watch,
    ..settings
  };
  let mut session = Session::with_console(settings, Box::new(TerminalSink));

  // A watching session polls on its first timer tick.
  if !watch && !session.refresh_metrics() {
    return Err(ArchdeckError::MetricsUnavailable);
  }

  let mut refreshes = 0usize;
  loop {
    match session.next_update().await {
      Update::MetricsRefreshed { changed, outcome } => {
        tracing::debug!(changed = changed.len(), ?outcome, "Metrics refreshed");
        if refreshes > 0 {
          println!();
        }
        println!("{}", render_fields(session.metrics(), json)?);
        refreshes += 1;
        if !watch {
          return Ok(());
        }
      }
      Update::MetricsLaunchFailed if !watch => return Err(ArchdeckError::MetricsUnavailable),
      _ => {}
    }
  }
}

/// Labelled lines, or a JSON object keyed by wire token with `PROCESSES` as
/// an array.
pub fn render_fields(fields: &MetricFields, json: bool) -> Result<String, serde_json::Error> {
  if json {
    let mut map = Map::new();
    for key in MetricKey::ALL {
      if let Some(value) = fields.get(key) {
        map.insert(key.as_str().to_string(), Value::String(value.to_string()));
      }
    }
    if let Some(processes) = fields.processes() {
      let list = processes
        .lines()
        .map(|line| Value::String(line.to_string()))
        .collect();
      map.insert(MetricKey::Processes.as_str().to_string(), Value::Array(list));
    }
    return serde_json::to_string_pretty(&Value::Object(map));
  }

  let mut lines: Vec<String> = MetricKey::ALL
    .into_iter()
    .filter(|key| *key != MetricKey::Processes)
    .map(|key| fields.display(key))
    .collect();

  lines.push(format!("{}:", MetricKey::Processes.label()));
  match fields.processes() {
    Some(processes) => lines.extend(processes.lines().map(|line| format!("  {line}"))),
    None => lines.push(format!("  {}", crate::metrics::UNSET)),
  }

  Ok(lines.join("\n"))
}
