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
use crate::sink::Stream;
use std::fmt;
use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Largest read taken from a pipe in one go.
const CHUNK_SIZE: usize = 8 * 1024;

/// How long the pipes may keep delivering output after the child exits.
pub const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// The two independent single-occupancy execution channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
  /// Commands triggered by the user.
  User,
  /// The periodic `metrics all` poll.
  Metrics,
}

impl fmt::Display for SlotKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SlotKind::User => f.write_str("user"),
      SlotKind::Metrics => f.write_str("metrics"),
    }
  }
}

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
  Code(i32),
  /// Killed by a signal (unix only).
  Signal(i32),
  Unknown,
  /// The child could not be waited on.
  WaitFailed(String),
}

impl ExitOutcome {
  pub fn code(&self) -> Option<i32> {
    match self {
      ExitOutcome::Code(code) => Some(*code),
      _ => None,
    }
  }

  pub fn success(&self) -> bool {
    self.code() == Some(0)
  }

  /// Terminal status message shown once the process is gone.
  pub fn status_text(&self) -> String {
    match self {
      ExitOutcome::Code(code) => format!("Finished (exit {code})"),
      ExitOutcome::Signal(signal) => format!("Terminated (signal {signal})"),
      ExitOutcome::Unknown => "Finished (exit unknown)".to_string(),
      ExitOutcome::WaitFailed(reason) => format!("Finished (wait failed: {reason})"),
    }
  }
}

impl From<ExitStatus> for ExitOutcome {
  fn from(status: ExitStatus) -> Self {
    if let Some(code) = status.code() {
      return ExitOutcome::Code(code);
    }
    #[cfg(unix)]
    {
      use std::os::unix::process::ExitStatusExt;
      if let Some(signal) = status.signal() {
        return ExitOutcome::Signal(signal);
      }
    }
    ExitOutcome::Unknown
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEventKind {
  Output { stream: Stream, text: String },
  Exited(ExitOutcome),
}

/// A notification from a supervised process, tagged with the slot and the
/// launch it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEvent {
  pub slot: SlotKind,
  pub instance: u64,
  pub kind: SlotEventKind,
}

/// `Idle → Running → Exited`, and back to `Running` on the next launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
  Idle,
  Running { instance: u64, pid: Option<u32> },
  Exited { instance: u64, outcome: ExitOutcome },
}

/// Holds at most one live process and turns its pipes into [`SlotEvent`]s.
#[derive(Debug)]
pub struct ProcessSlot {
  kind: SlotKind,
  state: SlotState,
  next_instance: u64,
  events: mpsc::Sender<SlotEvent>,
}

impl ProcessSlot {
  pub fn new(kind: SlotKind, events: mpsc::Sender<SlotEvent>) -> Self {
    Self {
      kind,
      state: SlotState::Idle,
      next_instance: 1,
      events,
    }
  }

  pub fn kind(&self) -> SlotKind {
    self.kind
  }

  pub fn state(&self) -> &SlotState {
    &self.state
  }

  pub fn is_live(&self) -> bool {
    matches!(self.state, SlotState::Running { .. })
  }

  /// Spawns `program` with `args` as discrete argv entries.
  ///
  /// Must be called from within a Tokio runtime. On failure the slot keeps
  /// its previous (non-running) state.
  pub fn launch(&mut self, program: &str, args: &[String]) -> std::io::Result<u64> {
    debug_assert!(!self.is_live(), "launch on a live {} slot", self.kind);

    let mut cmd = Command::new(program);
    cmd
      .args(args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    tracing::debug!(slot = %self.kind, cmd = ?cmd, "Spawning process");
    let mut child = cmd.spawn()?;

    let instance = self.next_instance;
    self.next_instance += 1;
    let pid = child.id();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let sender = EventSender {
      slot: self.kind,
      instance,
      events: self.events.clone(),
    };

    tokio::spawn(
      supervise(child, stdout, stderr, sender)
        .instrument(tracing::debug_span!("supervisor", slot = %self.kind, instance, ?pid)),
    );

    self.state = SlotState::Running { instance, pid };
    Ok(instance)
  }

  /// Admits `event` if it belongs to the running instance and returns its
  /// payload. An `Exited` payload moves the slot to `Exited`; anything for
  /// another slot, an older instance, or a finished one is dropped.
  pub fn accept(&mut self, event: SlotEvent) -> Option<SlotEventKind> {
    let SlotState::Running { instance, .. } = self.state else {
      tracing::trace!(slot = %self.kind, instance = event.instance, "Dropping event for idle slot");
      return None;
    };
    if event.slot != self.kind || event.instance != instance {
      tracing::trace!(slot = %self.kind, instance = event.instance, "Dropping stale event");
      return None;
    }

    if let SlotEventKind::Exited(outcome) = &event.kind {
      self.state = SlotState::Exited {
        instance,
        outcome: outcome.clone(),
      };
    }
    Some(event.kind)
  }
}

struct EventSender {
  slot: SlotKind,
  instance: u64,
  events: mpsc::Sender<SlotEvent>,
}

impl EventSender {
  /// Returns `false` once the receiving side is gone.
  async fn send(&self, kind: SlotEventKind) -> bool {
    self
      .events
      .send(SlotEvent {
        slot: self.slot,
        instance: self.instance,
        kind,
      })
      .await
      .is_ok()
  }
}

/// Pumps both pipes while waiting for the child, then sends `Exited`.
///
/// The exit event follows every output event of the process. Once the child
/// is gone the pipes get [`DRAIN_GRACE`] to reach EOF; a descendant that keeps
/// them open past that is cut off. Dropping the receiving side kills the
/// child.
async fn supervise(
  mut child: Child,
  stdout: Option<tokio::process::ChildStdout>,
  stderr: Option<tokio::process::ChildStderr>,
  sender: EventSender,
) {
  let pumps = async {
    let stdout_task = async {
      if let Some(stdout) = stdout {
        pump(stdout, Stream::Stdout, &sender).await;
      }
    };
    let stderr_task = async {
      if let Some(stderr) = stderr {
        pump(stderr, Stream::Stderr, &sender).await;
      }
    };
    tokio::join!(stdout_task, stderr_task);
  };
  tokio::pin!(pumps);

  let status = tokio::select! {
    status = child.wait() => {
      if tokio::time::timeout(DRAIN_GRACE, &mut pumps).await.is_err() {
        tracing::debug!("Pipes still open after exit, detaching");
      }
      status
    }
    _ = &mut pumps => {
      tokio::select! {
        status = child.wait() => status,
        _ = sender.events.closed() => {
          kill(&mut child).await;
          return;
        }
      }
    }
    _ = sender.events.closed() => {
      kill(&mut child).await;
      return;
    }
  };

  let outcome = match status {
    Ok(status) => ExitOutcome::from(status),
    Err(e) => {
      tracing::error!(error = %e, "Failed to wait for child process");
      ExitOutcome::WaitFailed(e.to_string())
    }
  };
  tracing::debug!(?outcome, "Process exited");

  sender.send(SlotEventKind::Exited(outcome)).await;
}

async fn kill(child: &mut Child) {
  tracing::debug!("Event receiver gone, killing child");
  if let Err(e) = child.kill().await {
    tracing::warn!(error = %e, "Failed to kill child process");
  }
}

/// Forwards chunks from one pipe in arrival order until EOF.
async fn pump<R: AsyncRead + Unpin>(mut stream: R, which: Stream, sender: &EventSender) {
  let mut buf = vec![0u8; CHUNK_SIZE];
  let mut decoder = Utf8Decoder::default();

  loop {
    match stream.read(&mut buf).await {
      Ok(0) => break,
      Ok(n) => {
        let text = decoder.decode(&buf[..n]);
        if text.is_empty() {
          continue;
        }
        if !sender.send(SlotEventKind::Output { stream: which, text }).await {
          return;
        }
      }
      Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
      Err(e) => {
        tracing::warn!(error = %e, stream = ?which, "Failed to read process output");
        break;
      }
    }
  }

  let rest = decoder.finish();
  if !rest.is_empty() {
    sender.send(SlotEventKind::Output { stream: which, text: rest }).await;
  }
}

/// Decodes a byte stream chunk by chunk without splitting multi-byte
/// characters across chunk boundaries.
#[derive(Debug, Default)]
struct Utf8Decoder {
  pending: Vec<u8>,
}

impl Utf8Decoder {
  fn decode(&mut self, chunk: &[u8]) -> String {
    self.pending.extend_from_slice(chunk);

    let mut out = String::with_capacity(self.pending.len());
    let mut input: &[u8] = &self.pending;
    loop {
      match std::str::from_utf8(input) {
        Ok(valid) => {
          out.push_str(valid);
          input = &[];
          break;
        }
        Err(e) => {
          let (valid, rest) = input.split_at(e.valid_up_to());
          out.push_str(&String::from_utf8_lossy(valid));
          match e.error_len() {
            Some(len) => {
              out.push(char::REPLACEMENT_CHARACTER);
              input = &rest[len..];
            }
            // Incomplete sequence at the end: wait for more bytes.
            None => {
              input = rest;
              break;
            }
          }
        }
      }
    }

    let remaining = input.to_vec();
    self.pending = remaining;
    out
  }

  /// Flushes whatever is left at EOF.
  fn finish(&mut self) -> String {
    let rest = String::from_utf8_lossy(&self.pending).into_owned();
    self.pending.clear();
    rest
  }
}
