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

//! Command model.
//!
//! A command is one of three closed shapes:
//!
//! - [`RowCommand`]: emits structured rows into a [`RowSink`]
//! - [`WriterCommand`]: writes raw text chunks into a [`TextSink`]
//! - [`BareCommand`]: runs for its side effects only
//!
//! The shape is chosen once at registration by wrapping the implementation
//! in the matching [`Command`] variant.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use parka_core::{
//!     Command, CommandDescription, CommandError, ParsedLayers, Row, RowCommand, RowSink,
//! };
//! use std::sync::Arc;
//!
//! struct Hello {
//!     description: CommandDescription,
//! }
//!
//! #[async_trait]
//! impl RowCommand for Hello {
//!     fn description(&self) -> &CommandDescription {
//!         &self.description
//!     }
//!
//!     async fn run(&self, _layers: &ParsedLayers, sink: RowSink) -> Result<(), CommandError> {
//!         sink.send(Row::new().with("greeting", "hello")).await
//!     }
//! }
//!
//! let command = Command::Rows(Arc::new(Hello {
//!     description: CommandDescription::new("hello", "Say hello"),
//! }));
//! assert_eq!(command.name(), "hello");
//! ```

use crate::error::CommandError;
use crate::layer::ParameterLayers;
use crate::parsed::ParsedLayers;
use crate::row::Row;
use crate::temp_files::{CleanupReport, TempFileManager};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A titled group of parameters in a form layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSection {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Layer the parameters belong to.
    pub layer: String,
    /// Parameter names, in display order.
    pub parameters: Vec<String>,
}

impl LayoutSection {
    pub fn new<I, S>(title: impl Into<String>, layer: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            description: String::new(),
            layer: layer.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Name, help and parameter schema of a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandDescription {
    pub name: String,
    pub short: String,
    /// Long help, in Markdown.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub long: String,
    pub layers: ParameterLayers,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layout: Vec<LayoutSection>,
}

impl CommandDescription {
    pub fn new(name: impl Into<String>, short: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: short.into(),
            long: String::new(),
            layers: ParameterLayers::new(),
            layout: Vec::new(),
        }
    }

    pub fn with_long(mut self, long: impl Into<String>) -> Self {
        self.long = long.into();
        self
    }

    pub fn with_layers(mut self, layers: ParameterLayers) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_layout(mut self, layout: Vec<LayoutSection>) -> Self {
        self.layout = layout;
        self
    }
}

/// Sending half of the row channel handed to a [`RowCommand`].
///
/// Sends fail with [`CommandError::Cancelled`] once the request is
/// cancelled or the consumer has gone away, so commands can simply `?`.
#[derive(Debug, Clone)]
pub struct RowSink {
    tx: mpsc::Sender<Row>,
    cancel: CancellationToken,
}

impl RowSink {
    pub fn new(tx: mpsc::Sender<Row>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Send one row, waiting for channel capacity.
    pub async fn send(&self, row: Row) -> Result<(), CommandError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CommandError::Cancelled),
            sent = self.tx.send(row) => sent.map_err(|_| CommandError::Cancelled),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that fires when the request is cancelled.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Sending half of the text channel handed to a [`WriterCommand`].
#[derive(Debug, Clone)]
pub struct TextSink {
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl TextSink {
    pub fn new(tx: mpsc::Sender<String>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    pub async fn write(&self, chunk: impl Into<String>) -> Result<(), CommandError> {
        let chunk = chunk.into();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CommandError::Cancelled),
            sent = self.tx.send(chunk) => sent.map_err(|_| CommandError::Cancelled),
        }
    }

    pub async fn writeln(&self, line: impl AsRef<str>) -> Result<(), CommandError> {
        self.write(format!("{}\n", line.as_ref())).await
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// A command producing structured rows.
#[async_trait]
pub trait RowCommand: Send + Sync {
    fn description(&self) -> &CommandDescription;

    /// Run the command, emitting rows in order. Returning closes the stream.
    async fn run(&self, layers: &ParsedLayers, sink: RowSink) -> Result<(), CommandError>;
}

/// A command producing raw text.
#[async_trait]
pub trait WriterCommand: Send + Sync {
    fn description(&self) -> &CommandDescription;

    async fn run(&self, layers: &ParsedLayers, sink: TextSink) -> Result<(), CommandError>;
}

/// A command run only for its effects.
#[async_trait]
pub trait BareCommand: Send + Sync {
    fn description(&self) -> &CommandDescription;

    async fn run(&self, layers: &ParsedLayers) -> Result<(), CommandError>;
}

/// A registered command.
#[derive(Clone)]
pub enum Command {
    Rows(Arc<dyn RowCommand>),
    Writer(Arc<dyn WriterCommand>),
    Bare(Arc<dyn BareCommand>),
}

impl Command {
    pub fn description(&self) -> &CommandDescription {
        match self {
            Self::Rows(c) => c.description(),
            Self::Writer(c) => c.description(),
            Self::Bare(c) => c.description(),
        }
    }

    pub fn name(&self) -> &str {
        &self.description().name
    }

    pub fn layers(&self) -> &ParameterLayers {
        &self.description().layers
    }

    /// `"rows"`, `"writer"` or `"bare"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rows(_) => "rows",
            Self::Writer(_) => "writer",
            Self::Bare(_) => "bare",
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Resolved parameters bound to a command for one request.
///
/// Owns the request's [`TempFileManager`]; dropping the last reference to the
/// manager deletes the files.
#[derive(Debug)]
pub struct CommandContext {
    pub command: Command,
    pub layers: ParsedLayers,
    pub temp_files: Arc<TempFileManager>,
}

impl CommandContext {
    pub fn new(command: Command, layers: ParsedLayers, temp_files: Arc<TempFileManager>) -> Self {
        Self {
            command,
            layers,
            temp_files,
        }
    }

    pub fn description(&self) -> &CommandDescription {
        self.command.description()
    }

    /// Delete the request's temp files now.
    pub fn close_temp_files(&self) -> CleanupReport {
        self.temp_files.close()
    }
}
