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

//! Pipeline assembly: one task group per request.
//!
//! ```text
//! producer --rows--> formatter --units--> response body
//!     \                 ^
//!      `--failure slot--'
//! ```
//!
//! HTML pages add a columns rendezvous and a blocking template renderer
//! between the formatter and the response body.

use crate::download::{self, Download};
use crate::error::{ExecError, ExecResult};
use crate::group::TaskGroup;
use crate::html;
use crate::rows;
use crate::text;
use bytes::Bytes;
use futures::Stream;
use parka_core::{Command, CommandContext, TempFileManager};
use parka_render::{formatter_for, ErrorPanel, OutputFormat, Page, TemplateResolver};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, warn};

/// One unit of response body, or the error that ends it.
pub type Unit = ExecResult<Bytes>;

/// Channel capacities and limits for one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Rows buffered between producer and formatter.
    pub row_buffer: usize,
    /// Units buffered between formatter and response.
    pub output_buffer: usize,
    /// Cancel executions running longer than this.
    pub timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            row_buffer: 64,
            output_buffer: 16,
            timeout: None,
        }
    }
}

pub(crate) async fn emit(out: &mpsc::Sender<Unit>, text: String) -> ExecResult<()> {
    if text.is_empty() {
        return Ok(());
    }
    out.send(Ok(Bytes::from(text)))
        .await
        .map_err(|_| ExecError::Disconnected)
}

pub(crate) async fn emit_opt(out: &mpsc::Sender<Unit>, text: Option<String>) -> ExecResult<()> {
    match text {
        Some(text) => emit(out, text).await,
        None => Ok(()),
    }
}

/// Forward `err` to the response, then hand it back.
pub(crate) async fn abort(out: &mpsc::Sender<Unit>, err: ExecError) -> ExecError {
    let _ = out.send(Err(err.clone())).await;
    err
}

/// A running execution's response body.
///
/// Created only once the first unit is available, so an execution that fails
/// before producing anything surfaces as an error instead of a body.
/// Dropping the stream cancels the execution.
pub struct ExecutionStream {
    content_type: &'static str,
    first: Option<Bytes>,
    rx: mpsc::Receiver<Unit>,
    _cancel_on_drop: DropGuard,
}

impl ExecutionStream {
    async fn start(
        content_type: &'static str,
        mut rx: mpsc::Receiver<Unit>,
        cancel: CancellationToken,
    ) -> ExecResult<Self> {
        let guard = cancel.drop_guard();
        let first = match rx.recv().await {
            Some(Ok(bytes)) => Some(bytes),
            Some(Err(err)) => return Err(err),
            None => None,
        };
        Ok(Self {
            content_type,
            first,
            rx,
            _cancel_on_drop: guard,
        })
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Drain the whole body into memory, stopping at the first error.
    pub async fn collect_bytes(mut self) -> ExecResult<Vec<u8>> {
        let mut body = self.first.take().map(|b| b.to_vec()).unwrap_or_default();
        while let Some(unit) = self.rx.recv().await {
            body.extend_from_slice(&unit?);
        }
        Ok(body)
    }
}

impl fmt::Debug for ExecutionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionStream")
            .field("content_type", &self.content_type)
            .field("pending_first", &self.first.is_some())
            .finish()
    }
}

impl Stream for ExecutionStream {
    type Item = Unit;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(first) = self.first.take() {
            return Poll::Ready(Some(Ok(first)));
        }
        self.rx.poll_recv(cx)
    }
}

/// Wait for `group`, enforce the timeout, then release the request's temp
/// files. `out` stays open until cleanup is done.
fn supervise(
    group: TaskGroup,
    command: String,
    temp_files: Arc<TempFileManager>,
    timeout: Option<Duration>,
    out: mpsc::Sender<Unit>,
    panel: Option<ErrorPanel>,
) {
    tokio::spawn(async move {
        let cancel = group.token();
        let waiting = group.wait();
        tokio::pin!(waiting);

        let result = match timeout {
            None => waiting.await,
            Some(limit) => tokio::select! {
                result = &mut waiting => result,
                _ = tokio::time::sleep(limit) => {
                    warn!(command = %command, ?limit, "execution timed out");
                    let err = ExecError::TimedOut(limit);
                    if let Some(panel) = &panel {
                        panel.set(err.to_string());
                    }
                    cancel.cancel();
                    let _ = waiting.await;
                    let _ = out.send(Err(err.clone())).await;
                    Err(err)
                }
            },
        };

        match &result {
            Ok(()) => debug!(command = %command, "execution finished"),
            Err(err) if err.is_cancellation() => debug!(command = %command, error = %err, "execution stopped"),
            Err(err) => error!(command = %command, error = %err, "execution failed"),
        }
        temp_files.close();
    });
}

fn wrong_kind(ctx: &CommandContext, expected: &'static str) -> ExecError {
    ExecError::WrongKind {
        command: ctx.command.name().to_string(),
        kind: ctx.command.kind(),
        expected,
    }
}

/// Runs commands and turns their output into response bodies.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stream a row command's output in a tabular or SSE format.
    ///
    /// Columns come from the first row.
    pub async fn stream_rows(
        &self,
        ctx: CommandContext,
        format: OutputFormat,
    ) -> ExecResult<ExecutionStream> {
        let Command::Rows(command) = &ctx.command else {
            let err = wrong_kind(&ctx, "row command");
            ctx.close_temp_files();
            return Err(err);
        };
        let command = Arc::clone(command);
        let name = command.description().name.clone();
        let layers = Arc::new(ctx.layers);

        let cancel = CancellationToken::new();
        let mut group = TaskGroup::new(cancel.clone());
        let (row_tx, row_rx) = mpsc::channel(self.config.row_buffer);
        let (failure_tx, failure_rx) = oneshot::channel();
        let (out_tx, out_rx) = mpsc::channel(self.config.output_buffer);

        group.spawn(
            "producer",
            rows::produce(command, layers, row_tx, failure_tx, cancel.clone()),
        );
        group.spawn(
            "formatter",
            rows::format(
                row_rx,
                failure_rx,
                formatter_for(format),
                out_tx.clone(),
                cancel.clone(),
            ),
        );
        debug!(command = %name, format = %format, "streaming rows");
        supervise(group, name, ctx.temp_files, self.config.timeout, out_tx, None);

        ExecutionStream::start(format.content_type(), out_rx, cancel).await
    }

    /// Stream a row command into an HTML page rendered from `resolver`.
    pub async fn stream_page(
        &self,
        ctx: CommandContext,
        page: Page,
        resolver: Arc<dyn TemplateResolver>,
    ) -> ExecResult<ExecutionStream> {
        let Command::Rows(command) = &ctx.command else {
            let err = wrong_kind(&ctx, "row command");
            ctx.close_temp_files();
            return Err(err);
        };
        let command = Arc::clone(command);
        let name = command.description().name.clone();
        let page = page.with_values(&ctx.layers);
        let mode = page.mode;
        let layers = Arc::new(ctx.layers);

        let cancel = CancellationToken::new();
        let mut group = TaskGroup::new(cancel.clone());
        let panel = ErrorPanel::new();
        let (row_tx, row_rx) = mpsc::channel(self.config.row_buffer);
        let (failure_tx, failure_rx) = oneshot::channel();
        let (columns_tx, columns_rx) = oneshot::channel();
        let (unit_tx, unit_rx) = mpsc::channel(self.config.row_buffer);
        let (out_tx, out_rx) = mpsc::channel(self.config.output_buffer);

        group.spawn(
            "producer",
            rows::produce(command, layers, row_tx, failure_tx, cancel.clone()),
        );
        group.spawn(
            "formatter",
            html::format_fragments(
                row_rx,
                failure_rx,
                html::fragment_formatter(mode),
                columns_tx,
                unit_tx,
                panel.clone(),
                cancel.clone(),
            ),
        );
        let renderer_panel = panel.clone();
        let renderer_out = out_tx.clone();
        group.spawn_blocking("renderer", move || {
            html::render_streamed(resolver, page, columns_rx, unit_rx, renderer_panel, renderer_out)
        });
        debug!(command = %name, mode = ?mode, "streaming page");
        supervise(group, name, ctx.temp_files, self.config.timeout, out_tx, Some(panel));

        ExecutionStream::start(OutputFormat::Html.content_type(), out_rx, cancel).await
    }

    /// Stream a writer command's text.
    pub async fn stream_text(&self, ctx: CommandContext) -> ExecResult<ExecutionStream> {
        let Command::Writer(command) = &ctx.command else {
            let err = wrong_kind(&ctx, "writer command");
            ctx.close_temp_files();
            return Err(err);
        };
        let command = Arc::clone(command);
        let name = command.description().name.clone();
        let layers = Arc::new(ctx.layers);

        let cancel = CancellationToken::new();
        let mut group = TaskGroup::new(cancel.clone());
        let (chunk_tx, chunk_rx) = mpsc::channel(self.config.row_buffer);
        let (failure_tx, failure_rx) = oneshot::channel();
        let (out_tx, out_rx) = mpsc::channel(self.config.output_buffer);

        group.spawn(
            "writer",
            text::produce(command, layers, chunk_tx, failure_tx, cancel.clone()),
        );
        group.spawn(
            "passthrough",
            text::pass_through(chunk_rx, failure_rx, out_tx.clone(), cancel.clone()),
        );
        debug!(command = %name, "streaming text");
        supervise(group, name, ctx.temp_files, self.config.timeout, out_tx, None);

        ExecutionStream::start(OutputFormat::Ascii.content_type(), out_rx, cancel).await
    }

    /// Run a bare command to completion.
    pub async fn run_bare(&self, ctx: CommandContext) -> ExecResult<()> {
        let result = match &ctx.command {
            Command::Bare(command) => {
                let run = command.run(&ctx.layers);
                match self.config.timeout {
                    Some(limit) => match tokio::time::timeout(limit, run).await {
                        Ok(result) => result.map_err(ExecError::from),
                        Err(_) => Err(ExecError::TimedOut(limit)),
                    },
                    None => run.await.map_err(ExecError::from),
                }
            }
            _ => Err(wrong_kind(&ctx, "bare command")),
        };
        if let Err(err) = &result {
            error!(command = %ctx.command.name(), error = %err, "execution failed");
        }
        ctx.close_temp_files();
        result
    }

    /// Run a row command to completion and write its output to a file.
    ///
    /// Columns are the union of all rows.
    pub async fn download(&self, ctx: CommandContext, format: OutputFormat) -> ExecResult<Download> {
        let result = match &ctx.command {
            Command::Rows(command) => {
                download::materialize(
                    Arc::clone(command),
                    &ctx.layers,
                    format,
                    &self.config,
                )
                .await
            }
            _ => Err(wrong_kind(&ctx, "row command")),
        };
        if let Err(err) = &result {
            error!(command = %ctx.command.name(), error = %err, "download failed");
        }
        ctx.close_temp_files();
        result
    }
}
