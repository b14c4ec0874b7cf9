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
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Which channel a piece of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
  Stdout,
  Stderr,
  /// Diagnostics produced by archdeck itself.
  System,
}

/// Name of an output destination. The console always exists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SinkId(String);

impl SinkId {
  pub const CONSOLE: &'static str = "console";

  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn console() -> Self {
    Self(Self::CONSOLE.to_string())
  }

  pub fn is_console(&self) -> bool {
    self.0 == Self::CONSOLE
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for SinkId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// An appendable text destination (a console widget, a news pane, a terminal).
pub trait OutputSink {
  /// Appends `text` exactly as received; chunks may end mid-line.
  fn append(&mut self, stream: Stream, text: &str);

  fn clear(&mut self);

  /// Appends a complete diagnostic line.
  fn append_line(&mut self, stream: Stream, line: &str) {
    self.append(stream, &format!("{line}\n"));
  }

  /// Buffered contents, for sinks that keep them.
  fn text(&self) -> Option<&str> {
    None
  }
}

/// In-memory sink holding everything appended since the last clear.
#[derive(Debug, Default, Clone)]
pub struct TextBuffer {
  text: String,
}

impl TextBuffer {
  pub fn as_str(&self) -> &str {
    &self.text
  }
}

impl OutputSink for TextBuffer {
  fn append(&mut self, _stream: Stream, text: &str) {
    self.text.push_str(text);
  }

  fn clear(&mut self) {
    self.text.clear();
  }

  fn append_line(&mut self, _stream: Stream, line: &str) {
    if !self.text.is_empty() && !self.text.ends_with('\n') {
      self.text.push('\n');
    }
    self.text.push_str(line);
    self.text.push('\n');
  }

  fn text(&self) -> Option<&str> {
    Some(&self.text)
  }
}

/// Registry of every sink the host has handed to the core.
pub struct Sinks {
  sinks: BTreeMap<SinkId, Box<dyn OutputSink>>,
}

impl Sinks {
  pub fn new(console: Box<dyn OutputSink>) -> Self {
    let mut sinks: BTreeMap<SinkId, Box<dyn OutputSink>> = BTreeMap::new();
    sinks.insert(SinkId::console(), console);
    Self { sinks }
  }

  /// Installs `sink` under `id`, returning the one it replaces.
  pub fn register(&mut self, id: SinkId, sink: Box<dyn OutputSink>) -> Option<Box<dyn OutputSink>> {
    self.sinks.insert(id, sink)
  }

  pub fn get(&self, id: &SinkId) -> Option<&dyn OutputSink> {
    self.sinks.get(id).map(|sink| sink.as_ref())
  }

  /// The sink named `id`; unknown names get a fresh [`TextBuffer`].
  pub fn get_or_create(&mut self, id: &SinkId) -> &mut dyn OutputSink {
    self
      .sinks
      .entry(id.clone())
      .or_insert_with(|| Box::new(TextBuffer::default()))
      .as_mut()
  }

  pub fn console(&mut self) -> &mut dyn OutputSink {
    self.get_or_create(&SinkId::console())
  }

  pub fn ids(&self) -> impl Iterator<Item = &SinkId> {
    self.sinks.keys()
  }
}

impl Default for Sinks {
  fn default() -> Self {
    Self::new(Box::new(TextBuffer::default()))
  }
}

impl fmt::Debug for Sinks {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Sinks")
      .field("ids", &self.sinks.keys().collect::<Vec<_>>())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn text_buffer_keeps_partial_lines() {
    let mut buffer = TextBuffer::default();
    buffer.append(Stream::Stdout, "downloading ");
    buffer.append(Stream::Stdout, "50%");
    buffer.append(Stream::Stderr, "\nwarning\n");
    assert_eq!(buffer.as_str(), "downloading 50%\nwarning\n");
  }

  #[test]
  fn diagnostic_lines_start_on_a_fresh_line() {
    let mut buffer = TextBuffer::default();
    buffer.append(Stream::Stdout, "partial");
    buffer.append_line(Stream::System, "Failed to start x");
    assert_eq!(buffer.as_str(), "partial\nFailed to start x\n");
  }

  #[test]
  fn unknown_sinks_are_created_on_demand() {
    let mut sinks = Sinks::default();
    let news = SinkId::new("news");
    assert!(sinks.get(&news).is_none());

    sinks.get_or_create(&news).append(Stream::Stdout, "hello");
    assert_eq!(sinks.get(&news).and_then(|s| s.text()), Some("hello"));
    assert_eq!(sinks.ids().count(), 2);
  }
}
