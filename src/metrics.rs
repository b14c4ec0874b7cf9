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

//! Decoder for the `metrics all` output.
//!
//! The wire format is one `KEY: value` record per line. The first colon
//! splits key from value, both are trimmed, and the key must name one of the
//! [`MetricKey`] variants exactly. Everything else is skipped silently so a
//! newer CLI that prints extra fields keeps working.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Placeholder shown for a field that has never been reported.
pub const UNSET: &str = "—";

/// Separator the CLI uses between entries of the `PROCESSES` record.
const PROCESS_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKey {
  Ram,
  CpuTemp,
  CpuUsage,
  Gpu,
  GpuTemp,
  GpuUsage,
  Battery,
  BatteryHealth,
  Load,
  MemUsage,
  NetStatus,
  NetIp,
  NetTraffic,
  Orphans,
  Uptime,
  Processes,
}

impl MetricKey {
  pub const ALL: [MetricKey; 16] = [
    MetricKey::Ram,
    MetricKey::CpuTemp,
    MetricKey::CpuUsage,
    MetricKey::Gpu,
    MetricKey::GpuTemp,
    MetricKey::GpuUsage,
    MetricKey::Battery,
    MetricKey::BatteryHealth,
    MetricKey::Load,
    MetricKey::MemUsage,
    MetricKey::NetStatus,
    MetricKey::NetIp,
    MetricKey::NetTraffic,
    MetricKey::Orphans,
    MetricKey::Uptime,
    MetricKey::Processes,
  ];

  /// The token used on the wire.
  pub fn as_str(self) -> &'static str {
    match self {
      MetricKey::Ram => "RAM",
      MetricKey::CpuTemp => "CPU_TEMP",
      MetricKey::CpuUsage => "CPU_USAGE",
      MetricKey::Gpu => "GPU",
      MetricKey::GpuTemp => "GPU_TEMP",
      MetricKey::GpuUsage => "GPU_USAGE",
      MetricKey::Battery => "BATTERY",
      MetricKey::BatteryHealth => "BATTERY_HEALTH",
      MetricKey::Load => "LOAD",
      MetricKey::MemUsage => "MEM_USAGE",
      MetricKey::NetStatus => "NET_STATUS",
      MetricKey::NetIp => "NET_IP",
      MetricKey::NetTraffic => "NET_TRAFFIC",
      MetricKey::Orphans => "ORPHANS",
      MetricKey::Uptime => "UPTIME",
      MetricKey::Processes => "PROCESSES",
    }
  }

  /// Human-readable label for the display slot.
  pub fn label(self) -> &'static str {
    match self {
      MetricKey::Ram => "RAM",
      MetricKey::CpuTemp => "CPU Temp",
      MetricKey::CpuUsage => "CPU Usage",
      MetricKey::Gpu => "GPU",
      MetricKey::GpuTemp => "GPU Temp",
      MetricKey::GpuUsage => "GPU Usage",
      MetricKey::Battery => "Battery",
      MetricKey::BatteryHealth => "Battery Health",
      MetricKey::Load => "Load",
      MetricKey::MemUsage => "Memory Usage",
      MetricKey::NetStatus => "Network",
      MetricKey::NetIp => "IP",
      MetricKey::NetTraffic => "Traffic",
      MetricKey::Orphans => "Orphans",
      MetricKey::Uptime => "Uptime",
      MetricKey::Processes => "Top Processes",
    }
  }
}

impl fmt::Display for MetricKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMetricKey;

impl FromStr for MetricKey {
  type Err = UnknownMetricKey;

  /// Case-sensitive.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    MetricKey::ALL
      .into_iter()
      .find(|key| key.as_str() == s)
      .ok_or(UnknownMetricKey)
  }
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
  Value { key: MetricKey, value: String },
  /// The `PROCESSES` record, one entry per line.
  ProcessList(String),
}

impl FieldUpdate {
  pub fn key(&self) -> MetricKey {
    match self {
      FieldUpdate::Value { key, .. } => *key,
      FieldUpdate::ProcessList(_) => MetricKey::Processes,
    }
  }
}

/// Decodes `text` into field updates in line order.
pub fn parse(text: &str) -> Vec<FieldUpdate> {
  text.split('\n').filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<FieldUpdate> {
  if line.is_empty() {
    return None;
  }
  let idx = line.find(':')?;
  if idx == 0 {
    return None;
  }

  let key: MetricKey = line[..idx].trim().parse().ok()?;
  let value = line[idx + 1..].trim();

  Some(match key {
    MetricKey::Processes => FieldUpdate::ProcessList(value.replace(PROCESS_SEPARATOR, "\n")),
    key => FieldUpdate::Value {
      key,
      value: value.to_string(),
    },
  })
}

/// Current value of every display slot.
///
/// Fields keep their last reported value until a later parse overwrites them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricFields {
  values: BTreeMap<MetricKey, String>,
  processes: Option<String>,
}

impl MetricFields {
  /// Applies `updates` and returns the keys they touched.
  pub fn apply(&mut self, updates: impl IntoIterator<Item = FieldUpdate>) -> Vec<MetricKey> {
    let mut touched = Vec::new();
    for update in updates {
      let key = update.key();
      match update {
        FieldUpdate::Value { key, value } => {
          self.values.insert(key, value);
        }
        FieldUpdate::ProcessList(list) => self.processes = Some(list),
      }
      if !touched.contains(&key) {
        touched.push(key);
      }
    }
    touched
  }

  /// Parses `text` and applies the result.
  pub fn update_from(&mut self, text: &str) -> Vec<MetricKey> {
    self.apply(parse(text))
  }

  /// Raw value of a scalar field. Always `None` for [`MetricKey::Processes`].
  pub fn get(&self, key: MetricKey) -> Option<&str> {
    self.values.get(&key).map(String::as_str)
  }

  /// The process list, newline separated.
  pub fn processes(&self) -> Option<&str> {
    self.processes.as_deref()
  }

  /// `"<Label>: <value>"`, or the placeholder when unset.
  pub fn display(&self, key: MetricKey) -> String {
    let value = match key {
      MetricKey::Processes => self.processes(),
      key => self.get(key),
    };
    format!("{}: {}", key.label(), value.unwrap_or(UNSET))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_known_fields_and_leaves_others_alone() {
    let mut fields = MetricFields::default();
    fields.update_from("UPTIME: up 3 days\n");

    let touched = fields.update_from("RAM: 4.2 GiB\nCPU_TEMP: 55C\n");
    assert_eq!(touched, vec![MetricKey::Ram, MetricKey::CpuTemp]);
    assert_eq!(fields.get(MetricKey::Ram), Some("4.2 GiB"));
    assert_eq!(fields.get(MetricKey::CpuTemp), Some("55C"));
    assert_eq!(fields.get(MetricKey::Uptime), Some("up 3 days"));
    assert_eq!(fields.get(MetricKey::Gpu), None);
  }

  #[test]
  fn empty_and_garbage_input_yield_nothing() {
    assert!(parse("").is_empty());
    assert!(parse("garbage_no_colon\n").is_empty());
    assert!(parse("\n\n\n").is_empty());
    assert!(parse(": leading colon\n").is_empty());
  }

  #[test]
  fn unknown_and_miscased_keys_are_ignored() {
    assert!(parse("FAN_SPEED: 1200rpm\nram: 1G\n").is_empty());
  }

  #[test]
  fn splits_on_first_colon_and_trims() {
    let updates = parse("  NET_IP :  fe80::1 \r\n");
    assert_eq!(
      updates,
      vec![FieldUpdate::Value {
        key: MetricKey::NetIp,
        value: "fe80::1".to_string(),
      }]
    );
  }

  #[test]
  fn empty_value_is_still_an_update() {
    assert_eq!(
      parse("GPU:\n"),
      vec![FieldUpdate::Value {
        key: MetricKey::Gpu,
        value: String::new(),
      }]
    );
  }

  #[test]
  fn processes_are_expanded_into_lines() {
    let mut fields = MetricFields::default();
    fields.update_from("PROCESSES: a | b | c\n");
    assert_eq!(fields.processes(), Some("a\nb\nc"));
    assert_eq!(fields.get(MetricKey::Processes), None);
    assert_eq!(fields.display(MetricKey::Processes), "Top Processes: a\nb\nc");
  }

  #[test]
  fn parsing_is_idempotent() {
    let text = "RAM: 1G/8G\nLOAD: 0.1 0.2 0.3\nPROCESSES: init | sshd\nBOGUS\n";
    let mut fields = MetricFields::default();
    fields.update_from(text);
    let first = fields.clone();
    fields.update_from(text);
    assert_eq!(fields, first);
  }

  #[test]
  fn later_lines_win_within_one_parse() {
    let mut fields = MetricFields::default();
    let touched = fields.update_from("LOAD: 1\nLOAD: 2\n");
    assert_eq!(touched, vec![MetricKey::Load]);
    assert_eq!(fields.get(MetricKey::Load), Some("2"));
  }

  #[test]
  fn display_uses_labels_and_placeholder() {
    let mut fields = MetricFields::default();
    assert_eq!(fields.display(MetricKey::MemUsage), "Memory Usage: —");
    fields.update_from("NET_STATUS: online\n");
    assert_eq!(fields.display(MetricKey::NetStatus), "Network: online");
  }

  #[test]
  fn key_tokens_round_trip() {
    for key in MetricKey::ALL {
      assert_eq!(key.as_str().parse::<MetricKey>(), Ok(key));
    }
  }
}
