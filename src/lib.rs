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

//! # Archdeck
//!
//! `archdeck` is the process orchestration and output-routing core of a
//! desktop front-end for the `arch-manager` administration CLI. It launches
//! at most one user command at a time, streams its output into a chosen
//! sink, and polls `metrics all` on a timer to keep a set of display fields
//! current.
//!
//! Everything runs on one event loop: hosts hold a [`session::Session`],
//! call into it from their triggers and await [`session::Session::next_update`].
//!
//! ## Core Modules
//!
//! * [`session`]: The owned state a host UI holds and drives.
//! * [`runner`]: Single-flight user commands with streamed output.
//! * [`poller`]: The metrics poller and its refresh timer.
//! * [`metrics`]: Decoder for `KEY: value` metrics text and the field set.
//! * [`process`]: Process slots, supervision and pipe pumping.
//! * [`command`]: The `Invocation` request value.
//! * [`sink`]: Output sinks and their registry.
//! * [`config`]: Layered settings loading.
//! * [`cli`]: Defines the `clap`-based command-line interface of the terminal host.
//! * [`terminal`]: The terminal host used by the `archdeck` binary.
//! * [`error`]: Defines the custom error types for the library.
//! * [`logging`]: Provides the `setup_tracing` utility.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod poller;
pub mod process;
pub mod runner;
pub mod session;
pub mod sink;
pub mod terminal;
