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
#![cfg(unix)]

use assert_cmd::cargo;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

use serde_json::Value;

fn archdeck(cwd: &Path) -> Command {
  let mut cmd = Command::new(cargo::cargo_bin!("archdeck"));
  cmd
    .current_dir(cwd)
    .env_remove("ARCHDECK_EXECUTABLE")
    .env_remove("ARCHDECK_REFRESH_INTERVAL")
    .env_remove("ARCHDECK_AUTO_REFRESH")
    .env_remove("ARCHDECK_CONFIG")
    .env_remove("ARCHDECK_LOG_FILE")
    .env_remove("ARCHDECK_LOG_DIR")
    .env_remove("RUST_LOG")
    .env("CLICOLOR", "0");
  cmd
}

/// `sh metrics all` runs the `metrics` script in the working directory, which
/// stands in for the administration CLI.
fn write_metrics_script(dir: &Path) {
  fs::write(
    dir.join("metrics"),
    "printf 'RAM: 4.2 GiB\\nCPU_TEMP: 55C\\nFAN: 900rpm\\nPROCESSES: init | sshd | htop\\n'\n\
     echo 'gpu probe failed' >&2\n\
     exit 1\n",
  )
  .unwrap();
}

#[test]
fn test_run_streams_output_and_exit_code() {
  let temp = tempdir().unwrap();

  archdeck(temp.path())
    .arg("--executable")
    .arg("sh")
    .arg("run")
    .arg("--")
    .arg("-c")
    .arg("printf hello; printf oops >&2; exit 3")
    .assert()
    .code(3)
    .stdout(predicate::eq("hello"))
    .stderr(predicate::str::contains("oops"))
    .stderr(predicate::str::contains("Finished (exit 3)"));
}

#[test]
fn test_run_into_named_sink() {
  let temp = tempdir().unwrap();

  archdeck(temp.path())
    .env("ARCHDECK_EXECUTABLE", "sh")
    .arg("run")
    .arg("--sink")
    .arg("news")
    .arg("--")
    .arg("-c")
    .arg("echo 'Arch news: all quiet'")
    .assert()
    .success()
    .stdout(predicate::str::contains("Arch news: all quiet"))
    .stderr(predicate::str::contains("Finished (exit 0)"));
}

#[test]
fn test_run_named_sink_collects_both_streams() {
  let temp = tempdir().unwrap();

  archdeck(temp.path())
    .arg("--executable")
    .arg("sh")
    .arg("run")
    .arg("--sink")
    .arg("news")
    .arg("--")
    .arg("-c")
    .arg("printf headline; printf warning >&2")
    .assert()
    .success()
    .stdout(predicate::str::contains("headline"))
    .stdout(predicate::str::contains("warning"))
    .stderr(predicate::str::contains("Finished (exit 0)"));
}

#[test]
fn test_log_file_is_written_under_log_dir() {
  let temp = tempdir().unwrap();

  archdeck(temp.path())
    .env("ARCHDECK_LOG_DIR", temp.path().join("logs"))
    .env("ARCHDECK_LOG_FILE", "archdeck.log")
    .env("RUST_LOG", "archdeck=debug")
    .arg("config")
    .assert()
    .success();

  let log = fs::read_to_string(temp.path().join("logs").join("archdeck.log")).unwrap();
  assert!(log.contains("Settings loaded"));
}

#[test]
fn test_run_empty_command_is_rejected() {
  let temp = tempdir().unwrap();

  archdeck(temp.path())
    .arg("--executable")
    .arg("sh")
    .arg("run")
    .arg("")
    .assert()
    .failure()
    .stderr(predicate::str::contains("No command provided."))
    .stderr(predicate::str::contains("empty command"));
}

#[test]
fn test_run_missing_executable() {
  let temp = tempdir().unwrap();

  archdeck(temp.path())
    .arg("--executable")
    .arg("/nonexistent/arch-manager")
    .arg("run")
    .arg("pacman")
    .arg("update")
    .assert()
    .failure()
    .stderr(predicate::str::contains(
      "Failed to start /nonexistent/arch-manager",
    ));
}

#[test]
fn test_metrics_lines() {
  let temp = tempdir().unwrap();
  write_metrics_script(temp.path());

  archdeck(temp.path())
    .arg("--executable")
    .arg("sh")
    .arg("metrics")
    .assert()
    .success()
    .stdout(predicate::str::contains("RAM: 4.2 GiB\nCPU Temp: 55C\n"))
    .stdout(predicate::str::contains("GPU: —"))
    .stdout(predicate::str::contains("Top Processes:\n  init\n  sshd\n  htop"))
    .stdout(predicate::str::contains("FAN").not())
    .stderr(predicate::str::contains("gpu probe failed"));
}

#[test]
fn test_metrics_json() {
  let temp = tempdir().unwrap();
  write_metrics_script(temp.path());

  let output = archdeck(temp.path())
    .arg("--executable")
    .arg("sh")
    .arg("metrics")
    .arg("--json")
    .output()
    .unwrap();
  assert!(output.status.success());

  let json: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["RAM"], "4.2 GiB");
  assert_eq!(json["CPU_TEMP"], "55C");
  assert_eq!(json["PROCESSES"], serde_json::json!(["init", "sshd", "htop"]));
  assert!(json.get("FAN").is_none());
  assert!(json.get("UPTIME").is_none());
}

#[test]
fn test_metrics_missing_executable() {
  let temp = tempdir().unwrap();

  archdeck(temp.path())
    .arg("--executable")
    .arg("/nonexistent/arch-manager")
    .arg("metrics")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Metrics refresh failed"));
}

#[test]
fn test_config_layers_file_and_env() {
  let temp = tempdir().unwrap();
  fs::write(
    temp.path().join("archdeck.toml"),
    "executable = \"/opt/am/arch-manager\"\nrefresh_interval = 60\n",
  )
  .unwrap();

  archdeck(temp.path())
    .env("ARCHDECK_REFRESH_INTERVAL", "45")
    .arg("config")
    .assert()
    .success()
    .stdout(predicate::str::contains("executable = \"/opt/am/arch-manager\""))
    .stdout(predicate::str::contains("refresh_interval = 45"))
    .stdout(predicate::str::contains("auto_refresh = true"));
}

#[test]
fn test_config_rejects_out_of_range_interval() {
  let temp = tempdir().unwrap();

  archdeck(temp.path())
    .env("ARCHDECK_REFRESH_INTERVAL", "1")
    .arg("config")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load settings"));
}
