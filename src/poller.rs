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
use crate::config::Settings;
use crate::error::RunError;
use crate::metrics::MetricFields;
use crate::process::ProcessSlot;
use crate::process::SlotEvent;
use crate::process::SlotEventKind;
use crate::process::SlotKind;
use crate::session::Update;
use crate::sink::SinkId;
use crate::sink::Sinks;
use crate::sink::Stream;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio::time::Interval;
use tokio::time::MissedTickBehavior;

/// Arguments of the metrics query, after the executable.
pub const METRICS_ARGS: [&str; 2] = ["metrics", "all"];

/// Periodically runs `metrics all` on its own slot and folds the output into
/// [`MetricFields`].
#[derive(Debug)]
pub struct MetricsPoller {
  slot: ProcessSlot,
  buffer: String,
  fields: MetricFields,
}

impl MetricsPoller {
  pub fn new(events: mpsc::Sender<SlotEvent>) -> Self {
    Self {
      slot: ProcessSlot::new(SlotKind::Metrics, events),
      buffer: String::new(),
      fields: MetricFields::default(),
    }
  }

  pub fn fields(&self) -> &MetricFields {
    &self.fields
  }

  pub fn is_running(&self) -> bool {
    self.slot.is_live()
  }

  /// Starts a poll unless one is already live, in which case nothing happens.
  pub fn tick(&mut self, executable: &str, sinks: &mut Sinks) -> Update {
    if self.slot.is_live() {
      tracing::debug!("Metrics poll still running, skipping tick");
      return Update::MetricsSkipped;
    }

    self.buffer.clear();
    let args = METRICS_ARGS.map(String::from);
    match self.slot.launch(executable, &args) {
      Ok(instance) => {
        tracing::debug!(instance, program = executable, "Metrics poll started");
        Update::MetricsStarted
      }
      Err(source) => {
        let err = RunError::Launch {
          program: executable.to_string(),
          source,
        };
        tracing::warn!(error = %err, "Metrics poll failed to launch");
        sinks
          .console()
          .append_line(Stream::System, &format!("Metrics refresh failed: {err}"));
        Update::MetricsLaunchFailed
      }
    }
  }

  /// Buffers stdout, forwards stderr to the console and parses on exit
  /// whatever the exit code.
  pub fn handle(&mut self, event: SlotEvent, sinks: &mut Sinks) -> Update {
    let Some(kind) = self.slot.accept(event) else {
      return Update::Ignored;
    };

    match kind {
      SlotEventKind::Output {
        stream: Stream::Stdout,
        text,
      } => {
        self.buffer.push_str(&text);
        Update::MetricsBuffered
      }
      SlotEventKind::Output { stream, text } => {
        let console = sinks.console();
        console.append(stream, &text);
        Update::Output {
          sink: SinkId::console(),
        }
      }
      SlotEventKind::Exited(outcome) => {
        let text = std::mem::take(&mut self.buffer);
        let changed = self.fields.update_from(&text);
        tracing::debug!(?outcome, updates = changed.len(), "Metrics parsed");
        Update::MetricsRefreshed { changed, outcome }
      }
    }
  }
}

/// Repeating timer behind auto-refresh. A stopped timer never fires.
#[derive(Debug, Default)]
pub struct RefreshTimer {
  interval: Option<Interval>,
}

impl RefreshTimer {
  /// (Re)starts with `period`; the first tick is one full period away.
  pub fn restart(&mut self, period: Duration) {
    self.arm(Instant::now() + period, period);
  }

  /// Like [`RefreshTimer::configure`], but an enabled timer fires right away.
  pub fn start(&mut self, settings: &Settings) {
    if settings.auto_refresh {
      self.arm(Instant::now(), settings.refresh_interval.period());
    } else {
      self.stop();
    }
  }

  fn arm(&mut self, first: Instant, period: Duration) {
    let mut interval = tokio::time::interval_at(first, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    self.interval = Some(interval);
  }

  pub fn stop(&mut self) {
    self.interval = None;
  }

  /// Restarts or stops according to `settings`.
  pub fn configure(&mut self, settings: &Settings) {
    if settings.auto_refresh {
      self.restart(settings.refresh_interval.period());
    } else {
      self.stop();
    }
    tracing::debug!(period = ?self.period(), "Refresh timer configured");
  }

  pub fn period(&self) -> Option<Duration> {
    self.interval.as_ref().map(Interval::period)
  }

  pub fn is_active(&self) -> bool {
    self.interval.is_some()
  }

  /// Completes at the next scheduled tick. Cancel safe.
  pub async fn tick(&mut self) {
    match self.interval.as_mut() {
      Some(interval) => {
        interval.tick().await;
      }
      None => std::future::pending::<()>().await,
    }
  }
}
