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

//! Output rendering for Parka.
//!
//! - [`OutputFormat`]: the negotiable formats and their content types
//! - [`RowFormatter`]: incremental, per-row serialization used by the
//!   streaming pipeline
//! - [`write_table`] / [`render_table`]: buffered rendering with a
//!   [`ColumnPolicy`] for ragged rows
//! - [`FormLayout`]: the input form derived from a command's schema
//! - [`TemplateResolver`], [`render_page`] and [`render_index`]: HTML pages
//!
//! # Example
//!
//! ```
//! use parka_core::Row;
//! use parka_render::{render_table, ColumnPolicy, OutputFormat};
//!
//! let rows = vec![Row::new().with("n", 1i64), Row::new().with("n", 2i64)];
//! let csv = render_table(OutputFormat::Csv, &rows, ColumnPolicy::Union).unwrap();
//! assert_eq!(csv, "n\n1\n2\n");
//! ```

mod error;
mod format;
mod formatter;
mod layout;
mod markdown;
mod page;
mod table;
mod templates;

pub use error::{RenderError, RenderResult};
pub use format::OutputFormat;
pub use formatter::{
    formatter_for, AsciiFormatter, DataTablesFormatter, DelimitedFormatter, HtmlRowsFormatter,
    JsonArrayFormatter, MarkdownFormatter, RowFormatter, SseFormatter, YamlFormatter,
};
pub use layout::{FormField, FormLayout, FormSection};
pub use markdown::render_markdown;
pub use page::{render_index, render_page, BufferedRows, ErrorPanel, Page, PageMode, RowSource};
pub use table::{render_table, write_table, ColumnPolicy};
pub use templates::{
    TemplateResolver, TemplateStore, BASE_TEMPLATE, COMMAND_TEMPLATE, INDEX_TEMPLATE,
};
