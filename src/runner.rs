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
use crate::error::RunError;
use crate::process::ProcessSlot;
use crate::process::SlotEvent;
use crate::process::SlotEventKind;
use crate::process::SlotKind;
use crate::session::Update;
use crate::sink::SinkId;
use crate::sink::Sinks;
use crate::sink::Stream;
use tokio::sync::mpsc;

pub const STATUS_READY: &str = "Ready";
pub const STATUS_RUNNING: &str = "Running…";
pub const STATUS_LAUNCH_FAILED: &str = "Failed to start";

/// Runs user-triggered commands one at a time and streams their output into
/// the active sink.
#[derive(Debug)]
pub struct CommandRunner {
  slot: ProcessSlot,
  active_sink: SinkId,
  status: String,
}

impl CommandRunner {
  pub fn new(events: mpsc::Sender<SlotEvent>) -> Self {
    Self {
      slot: ProcessSlot::new(SlotKind::User, events),
      active_sink: SinkId::console(),
      status: STATUS_READY.to_string(),
    }
  }

  /// True while a user command is live.
  pub fn is_busy(&self) -> bool {
    self.slot.is_live()
  }

  pub fn status(&self) -> &str {
    &self.status
  }

  pub fn set_status(&mut self, status: impl Into<String>) {
    self.status = status.into();
  }

  pub fn active_sink(&self) -> &SinkId {
    &self.active_sink
  }

  /// Starts `invocation` with `executable`.
  ///
  /// A busy rejection leaves every sink untouched. The other rejections clear
  /// the target sink and leave a one-line diagnostic there. A launch failure
  /// is reported the same way and never leaves the runner busy.
  pub fn run(
    &mut self,
    executable: &str,
    invocation: &Invocation,
    sinks: &mut Sinks,
  ) -> Result<(), RunError> {
    if self.is_busy() {
      tracing::warn!(args = ?invocation.args, "Process already running. Rejecting invocation.");
      return Err(RunError::Busy);
    }

    let target = invocation.target_sink();
    let args = invocation.normalized_args();

    let sink = sinks.get_or_create(&target);
    sink.clear();

    if args.is_empty() {
      sink.append_line(Stream::System, "No command provided.");
      return Err(RunError::EmptyCommand);
    }
    if executable.trim().is_empty() {
      sink.append_line(Stream::System, "CLI path not set.");
      return Err(RunError::NoExecutable);
    }

    self.active_sink = target;
    self.status = STATUS_RUNNING.to_string();

    match self.slot.launch(executable, &args) {
      Ok(instance) => {
        tracing::info!(instance, program = executable, ?args, sink = %self.active_sink, "Command started");
        Ok(())
      }
      Err(source) => {
        let err = RunError::Launch {
          program: executable.to_string(),
          source,
        };
        tracing::error!(error = %err, "Command failed to launch");

        sinks
          .get_or_create(&self.active_sink)
          .append_line(Stream::System, &err.to_string());
        self.status = STATUS_LAUNCH_FAILED.to_string();
        self.active_sink = SinkId::console();
        Err(err)
      }
    }
  }

  pub fn handle(&mut self, event: SlotEvent, sinks: &mut Sinks) -> Update {
    let Some(kind) = self.slot.accept(event) else {
      return Update::Ignored;
    };

    match kind {
      SlotEventKind::Output { stream, text } => {
        sinks.get_or_create(&self.active_sink).append(stream, &text);
        Update::Output {
          sink: self.active_sink.clone(),
        }
      }
      SlotEventKind::Exited(outcome) => {
        self.status = outcome.status_text();
        tracing::info!(?outcome, "Command finished");
        let sink = std::mem::replace(&mut self.active_sink, SinkId::console());
        Update::CommandFinished { sink, outcome }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::process::ExitOutcome;

  fn news_with_leftovers(sinks: &mut Sinks) -> SinkId {
    let news = SinkId::new("news");
    sinks
      .get_or_create(&news)
      .append(Stream::Stdout, "yesterday's headlines");
    news
  }

  fn text_of<'a>(sinks: &'a Sinks, id: &SinkId) -> &'a str {
    sinks.get(id).and_then(|s| s.text()).unwrap_or_default()
  }

  #[tokio::test]
  async fn blank_executable_is_rejected_without_spawning() {
    let (tx, mut rx) = mpsc::channel(16);
    let mut runner = CommandRunner::new(tx);
    let mut sinks = Sinks::default();
    let news = news_with_leftovers(&mut sinks);

    let invocation = Invocation::new(["news", "latest"]).with_sink(news.clone());
    let result = runner.run("  ", &invocation, &mut sinks);

    assert!(matches!(result, Err(RunError::NoExecutable)));
    assert_eq!(text_of(&sinks, &news), "CLI path not set.\n");
    assert!(!runner.is_busy());
    assert_eq!(runner.status(), STATUS_READY);
    assert_eq!(runner.active_sink(), &SinkId::console());
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn empty_command_wins_over_blank_executable() {
    let (tx, _rx) = mpsc::channel(16);
    let mut runner = CommandRunner::new(tx);
    let mut sinks = Sinks::default();

    let result = runner.run("", &Invocation::new([""]), &mut sinks);

    assert!(matches!(result, Err(RunError::EmptyCommand)));
    assert_eq!(text_of(&sinks, &SinkId::console()), "No command provided.\n");
    assert!(!runner.is_busy());
  }

  #[tokio::test]
  async fn launch_failure_resets_the_active_sink() {
    let (tx, _rx) = mpsc::channel(16);
    let mut runner = CommandRunner::new(tx);
    let mut sinks = Sinks::default();
    let news = news_with_leftovers(&mut sinks);

    let invocation = Invocation::new(["news"]).with_sink(news.clone());
    let result = runner.run("/nonexistent/arch-manager", &invocation, &mut sinks);

    assert!(matches!(result, Err(RunError::Launch { .. })));
    assert!(text_of(&sinks, &news).starts_with("Failed to start /nonexistent/arch-manager: "));
    assert_eq!(runner.status(), STATUS_LAUNCH_FAILED);
    assert_eq!(runner.active_sink(), &SinkId::console());
    assert!(!runner.is_busy());
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn output_goes_to_the_active_sink_until_exit() {
    let (tx, mut rx) = mpsc::channel(16);
    let mut runner = CommandRunner::new(tx);
    let mut sinks = Sinks::default();
    let news = SinkId::new("news");

    let invocation = Invocation::new(["-c", "printf headline; exit 2"]).with_sink(news.clone());
    runner.run("sh", &invocation, &mut sinks).unwrap();
    assert!(runner.is_busy());
    assert_eq!(runner.status(), STATUS_RUNNING);

    let finished = loop {
      let event = rx.recv().await.expect("supervisor stopped early");
      if let Update::CommandFinished { sink, outcome } = runner.handle(event, &mut sinks) {
        break (sink, outcome);
      }
    };

    assert_eq!(finished, (news.clone(), ExitOutcome::Code(2)));
    assert_eq!(text_of(&sinks, &news), "headline");
    assert_eq!(text_of(&sinks, &SinkId::console()), "");
    assert_eq!(runner.status(), "Finished (exit 2)");
    assert_eq!(runner.active_sink(), &SinkId::console());
    assert!(!runner.is_busy());
  }
}
