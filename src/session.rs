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

//! The state a host UI holds: both process slots, the sinks, the settings and
//! the refresh timer, all driven from one event loop.
//!
//! A host calls [`Session::run`] and [`Session::refresh_metrics`] from its
//! triggers, awaits [`Session::next_update`] in its loop, and redraws from the
//! read-only accessors.

use crate::command::Invocation;
use crate::config::Settings;
use crate::error::RunError;
use crate::metrics::MetricFields;
use crate::metrics::MetricKey;
use crate::poller::MetricsPoller;
use crate::poller::RefreshTimer;
use crate::process::ExitOutcome;
use crate::process::SlotEvent;
use crate::process::SlotKind;
use crate::runner::CommandRunner;
use crate::sink::OutputSink;
use crate::sink::SinkId;
use crate::sink::Sinks;
use crate::sink::TextBuffer;
use tokio::sync::mpsc;

const EVENT_CAPACITY: usize = 256;

/// What a single step of the loop changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
  /// Text was appended to `sink`.
  Output { sink: SinkId },
  /// The user command ended and the active sink went back to the console.
  CommandFinished { sink: SinkId, outcome: ExitOutcome },
  MetricsStarted,
  /// A tick arrived while the previous poll was still live.
  MetricsSkipped,
  MetricsLaunchFailed,
  /// Metrics stdout was buffered for parsing.
  MetricsBuffered,
  MetricsRefreshed {
    changed: Vec<MetricKey>,
    outcome: ExitOutcome,
  },
  /// A stale event for a process that is no longer current.
  Ignored,
}

pub struct Session {
  settings: Settings,
  sinks: Sinks,
  runner: CommandRunner,
  poller: MetricsPoller,
  timer: RefreshTimer,
  events: mpsc::Receiver<SlotEvent>,
}

impl Session {
  /// A session whose console is an in-memory [`TextBuffer`].
  ///
  /// Must be created inside a Tokio runtime.
  pub fn new(settings: Settings) -> Self {
    Self::with_console(settings, Box::new(TextBuffer::default()))
  }

  /// With auto-refresh enabled the first [`Session::next_update`] fetches
  /// metrics straight away.
  pub fn with_console(settings: Settings, console: Box<dyn OutputSink>) -> Self {
    let (tx, events) = mpsc::channel(EVENT_CAPACITY);
    let mut timer = RefreshTimer::default();
    timer.start(&settings);

    Self {
      settings,
      sinks: Sinks::new(console),
      runner: CommandRunner::new(tx.clone()),
      poller: MetricsPoller::new(tx),
      timer,
      events,
    }
  }

  pub fn register_sink(&mut self, id: SinkId, sink: Box<dyn OutputSink>) {
    self.sinks.register(id, sink);
  }

  /// Starts a user command with the executable as configured right now.
  pub fn run(&mut self, invocation: Invocation) -> Result<(), RunError> {
    let span = tracing::info_span!("command", args = ?invocation.args);
    let _enter = span.enter();
    self
      .runner
      .run(self.settings.resolved_executable(), &invocation, &mut self.sinks)
  }

  /// Manual metrics refresh. Returns whether a poll was started.
  pub fn refresh_metrics(&mut self) -> bool {
    matches!(self.poll(), Update::MetricsStarted)
  }

  /// Replaces the settings and restarts or stops the refresh timer.
  pub fn apply_settings(&mut self, settings: Settings) {
    self.timer.configure(&settings);
    tracing::info!(
      executable = settings.resolved_executable(),
      interval = settings.refresh_interval.secs(),
      auto_refresh = settings.auto_refresh,
      "Settings applied"
    );
    self.settings = settings;
    self.runner.set_status("Settings applied");
  }

  /// Waits for the next timer tick or process event and applies it.
  pub async fn next_update(&mut self) -> Update {
    tokio::select! {
      _ = self.timer.tick() => self.poll(),
      event = self.events.recv() => match event {
        Some(event) => self.handle_event(event),
        None => Update::Ignored,
      },
    }
  }

  fn poll(&mut self) -> Update {
    let span = tracing::debug_span!("metrics");
    let _enter = span.enter();
    self
      .poller
      .tick(self.settings.resolved_executable(), &mut self.sinks)
  }

  fn handle_event(&mut self, event: SlotEvent) -> Update {
    match event.slot {
      SlotKind::User => self.runner.handle(event, &mut self.sinks),
      SlotKind::Metrics => self.poller.handle(event, &mut self.sinks),
    }
  }

  pub fn is_busy(&self) -> bool {
    self.runner.is_busy()
  }

  pub fn status(&self) -> &str {
    self.runner.status()
  }

  pub fn active_sink(&self) -> &SinkId {
    self.runner.active_sink()
  }

  pub fn sink(&self, id: &SinkId) -> Option<&dyn OutputSink> {
    self.sinks.get(id)
  }

  /// Buffered console text, when the console keeps any.
  pub fn console_text(&self) -> Option<&str> {
    self.sinks.get(&SinkId::console()).and_then(|sink| sink.text())
  }

  pub fn metrics(&self) -> &MetricFields {
    self.poller.fields()
  }

  pub fn metrics_running(&self) -> bool {
    self.poller.is_running()
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn refresh_timer(&self) -> &RefreshTimer {
    &self.timer
  }
}
