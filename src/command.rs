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
use crate::sink::SinkId;
use serde::Deserialize;
use serde::Serialize;

/// One request to run the administration CLI.
///
/// `args` are the tokens passed after the executable (e.g. `["pacman",
/// "install", "htop"]`). They are handed to the process as discrete argv
/// entries and never joined into a shell string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
  pub args: Vec<String>,

  /// Where output goes. `None` means the console.
  #[serde(default)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sink: Option<SinkId>,
}

impl Invocation {
  pub fn new<I, S>(args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      args: args.into_iter().map(Into::into).collect(),
      sink: None,
    }
  }

  pub fn with_sink(mut self, sink: SinkId) -> Self {
    self.sink = Some(sink);
    self
  }

  /// Drops empty argument strings. An empty result means the invocation
  /// must be rejected.
  pub fn normalized_args(&self) -> Vec<String> {
    self
      .args
      .iter()
      .filter(|arg| !arg.is_empty())
      .cloned()
      .collect()
  }

  pub fn target_sink(&self) -> SinkId {
    self.sink.clone().unwrap_or_else(SinkId::console)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_strings_are_dropped() {
    let invocation = Invocation::new(["pacman", "install", ""]);
    assert_eq!(invocation.normalized_args(), vec!["pacman", "install"]);
  }

  #[test]
  fn all_empty_normalizes_to_nothing() {
    assert!(Invocation::new(["", ""]).normalized_args().is_empty());
    assert!(Invocation::new(Vec::<String>::new()).normalized_args().is_empty());
  }

  #[test]
  fn whitespace_is_not_empty() {
    assert_eq!(Invocation::new([" "]).normalized_args(), vec![" "]);
  }

  #[test]
  fn sink_defaults_to_console() {
    assert_eq!(Invocation::new(["news"]).target_sink(), SinkId::console());
    let news = SinkId::new("news");
    assert_eq!(
      Invocation::new(["news"]).with_sink(news.clone()).target_sink(),
      news
    );
  }
}
