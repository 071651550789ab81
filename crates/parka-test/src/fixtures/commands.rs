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

//! Command fixtures.
//!
//! Every fixture counts its runs so tests can assert that a command never
//! executed (resolution errors) or executed exactly once.

use super::layers::numbers_layers;
use async_trait::async_trait;
use parka_core::{
    BareCommand, Command, CommandDescription, CommandError, ParameterLayers, ParsedLayers, Row,
    RowCommand, RowSink, TextSink, WriterCommand,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Emits `count` rows `{n, square, label}`, failing after `fail_after` rows
/// when set.
#[derive(Debug)]
pub struct NumbersCommand {
    description: CommandDescription,
    runs: AtomicUsize,
}

impl NumbersCommand {
    pub fn new() -> Self {
        Self {
            description: CommandDescription::new("numbers", "Emit numbered rows")
                .with_long("# Numbers\n\nEmits `count` rows.")
                .with_layers(numbers_layers()),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Default for NumbersCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowCommand for NumbersCommand {
    fn description(&self) -> &CommandDescription {
        &self.description
    }

    async fn run(&self, layers: &ParsedLayers, sink: RowSink) -> Result<(), CommandError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let flags = layers.default_layer();
        let count = flags.and_then(|l| l.get_int("count")).unwrap_or(3);
        let fail_after = flags.and_then(|l| l.get_int("fail_after"));

        for n in 1..=count {
            if fail_after == Some(n - 1) {
                return Err(CommandError::failed(format!("failed after {} rows", n - 1)));
            }
            sink.send(
                Row::new()
                    .with("n", n)
                    .with("square", n * n)
                    .with("label", format!("row {}", n)),
            )
            .await?;
        }
        if fail_after == Some(count) {
            return Err(CommandError::failed(format!("failed after {} rows", count)));
        }
        Ok(())
    }
}

/// Emits rows whose columns differ: `{a, b}`, `{b, c}`, `{a}`.
#[derive(Debug)]
pub struct RaggedCommand {
    description: CommandDescription,
}

impl RaggedCommand {
    pub fn new() -> Self {
        Self {
            description: CommandDescription::new("ragged", "Rows with differing columns"),
        }
    }
}

impl Default for RaggedCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowCommand for RaggedCommand {
    fn description(&self) -> &CommandDescription {
        &self.description
    }

    async fn run(&self, _layers: &ParsedLayers, sink: RowSink) -> Result<(), CommandError> {
        sink.send(Row::new().with("a", 1i64).with("b", 2i64)).await?;
        sink.send(Row::new().with("b", 3i64).with("c", 4i64)).await?;
        sink.send(Row::new().with("a", 5i64)).await
    }
}

/// Emits rows until cancelled, then records that it saw the cancellation.
#[derive(Debug)]
pub struct EndlessCommand {
    description: CommandDescription,
    interval: Duration,
    cancelled: AtomicBool,
}

impl EndlessCommand {
    pub fn new(interval: Duration) -> Self {
        Self {
            description: CommandDescription::new("endless", "Emit rows until cancelled"),
            interval,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn saw_cancellation(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RowCommand for EndlessCommand {
    fn description(&self) -> &CommandDescription {
        &self.description
    }

    async fn run(&self, _layers: &ParsedLayers, sink: RowSink) -> Result<(), CommandError> {
        let mut n: i64 = 0;
        loop {
            n += 1;
            if let Err(e) = sink.send(Row::new().with("n", n)).await {
                self.cancelled.store(true, Ordering::SeqCst);
                return Err(e);
            }
            tokio::select! {
                _ = sink.cancellation().cancelled() => {
                    self.cancelled.store(true, Ordering::SeqCst);
                    return Err(CommandError::Cancelled);
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

/// Writes `lines` then optionally fails.
#[derive(Debug)]
pub struct EchoWriter {
    description: CommandDescription,
    lines: Vec<String>,
    fail: bool,
}

impl EchoWriter {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            description: CommandDescription::new("echo", "Write lines"),
            lines: lines.into_iter().map(Into::into).collect(),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl WriterCommand for EchoWriter {
    fn description(&self) -> &CommandDescription {
        &self.description
    }

    async fn run(&self, _layers: &ParsedLayers, sink: TextSink) -> Result<(), CommandError> {
        for line in &self.lines {
            sink.writeln(line).await?;
        }
        if self.fail {
            return Err(CommandError::failed("writer failed"));
        }
        Ok(())
    }
}

/// Counts its runs and does nothing else.
#[derive(Debug)]
pub struct CountingBare {
    description: CommandDescription,
    runs: AtomicUsize,
}

impl CountingBare {
    pub fn new(layers: ParameterLayers) -> Self {
        Self {
            description: CommandDescription::new("touch", "Do nothing").with_layers(layers),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BareCommand for CountingBare {
    fn description(&self) -> &CommandDescription {
        &self.description
    }

    async fn run(&self, _layers: &ParsedLayers) -> Result<(), CommandError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Wrap a shared [`NumbersCommand`] as a [`Command`], keeping a handle for
/// run-count assertions.
pub fn numbers_command() -> (Command, Arc<NumbersCommand>) {
    let inner = Arc::new(NumbersCommand::new());
    (Command::Rows(inner.clone()), inner)
}
