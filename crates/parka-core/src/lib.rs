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

//! Parameter schema, value domain and command model for Parka.
//!
//! Parka serves pre-defined, typed commands over HTTP. This crate holds the
//! pieces every other crate agrees on:
//!
//! - [`Value`]: the typed value domain shared by parameters and rows
//! - [`ParameterType`] and [`ParameterDefinition`]: the schema, including
//!   per-type coercion from strings, JSON and file content
//! - [`ParameterLayer`] / [`ParameterLayers`]: named groups of definitions
//! - [`ParsedLayer`] / [`ParsedLayers`]: resolved values with provenance
//! - [`Row`] / [`ColumnSet`]: command output
//! - [`Command`], [`RowCommand`], [`WriterCommand`], [`BareCommand`] and
//!   [`CommandContext`]: the execution unit
//! - [`TempFileManager`]: request-scoped temp file cleanup
//!
//! # Example
//!
//! ```
//! use parka_core::{ParameterDefinition, ParameterType, Value};
//!
//! let def = ParameterDefinition::new("ids", ParameterType::IntegerList);
//! let value = def.parse_strings(&["1".to_string(), "2".to_string()]).unwrap();
//! assert_eq!(value, Value::from(vec![1i64, 2]));
//! ```

mod command;
mod definition;
mod error;
mod files;
mod layer;
mod parsed;
mod row;
mod temp_files;
mod types;
mod value;

// Re-export public API
pub use command::{
    BareCommand, Command, CommandContext, CommandDescription, LayoutSection, RowCommand, RowSink,
    TextSink, WriterCommand,
};
pub use definition::ParameterDefinition;
pub use error::{CommandError, ParameterError, ParameterResult};
pub use files::{FileContent, StructuredFormat};
pub use layer::{ParameterLayer, ParameterLayers, DEFAULT_SLUG};
pub use parsed::{ParsedLayer, ParsedLayers, ParsedParameter, Source};
pub use row::{ColumnSet, Row};
pub use temp_files::{CleanupReport, TempFileManager};
pub use types::ParameterType;
pub use value::Value;
