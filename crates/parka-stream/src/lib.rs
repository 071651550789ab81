// Dweve Parka - Typed Command Server
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Concurrent streaming execution for Parka commands.
//!
//! Each request gets a [`TaskGroup`]: a producer running the command, a
//! formatter turning rows into wire units, and for HTML pages a template
//! renderer on the blocking pool. Stages hand off through bounded channels
//! and share one cancellation token, fired by the first failing stage, a
//! dropped response body or the configured timeout.
//!
//! Failure semantics:
//!
//! - a command that fails before any output surfaces as an error from
//!   [`Pipeline::stream_rows`] (and friends), so the caller can answer 500
//! - a later failure is appended as the format's error unit, or ends the
//!   body with an error for formats that have none
//! - the request's temp files are deleted once every stage has finished
//!
//! # Example
//!
//! ```no_run
//! # async fn run(ctx: parka_core::CommandContext) -> parka_stream::ExecResult<()> {
//! use futures::StreamExt;
//! use parka_render::OutputFormat;
//! use parka_stream::Pipeline;
//!
//! let mut body = Pipeline::default().stream_rows(ctx, OutputFormat::Csv).await?;
//! while let Some(unit) = body.next().await {
//!     print!("{}", String::from_utf8_lossy(&unit?));
//! }
//! # Ok(())
//! # }
//! ```

mod download;
mod error;
mod group;
mod html;
mod pipeline;
mod rows;
mod text;

pub use download::{Download, DownloadBody};
pub use error::{ExecError, ExecResult};
pub use group::TaskGroup;
pub use pipeline::{ExecutionStream, Pipeline, PipelineConfig, Unit};
