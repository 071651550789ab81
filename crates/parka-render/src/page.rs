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

//! HTML pages rendered through minijinja.
//!
//! Command pages range over a [`RowSource`] while the template is being
//! evaluated, so rows reach the response as soon as the engine writes them.
//! Errors raised after the template started are reported through an
//! [`ErrorPanel`] the template reads after its row loop.

use crate::error::{RenderError, RenderResult};
use crate::layout::FormLayout;
use crate::markdown::render_markdown;
use crate::templates::{TemplateResolver, COMMAND_TEMPLATE, INDEX_TEMPLATE};
use minijinja::value::{Enumerator, Object, ObjectRepr, Value};
use minijinja::{context, Environment};
use parka_core::{ColumnSet, CommandDescription, ParsedLayers};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Supplier of pre-rendered row fragments.
///
/// `next_unit` may block; it returns `None` once the stream is exhausted.
pub trait RowSource: Send + Sync + fmt::Debug + 'static {
    fn next_unit(&self) -> Option<String>;
}

/// Row fragments that are already in memory.
#[derive(Debug, Default)]
pub struct BufferedRows {
    units: Mutex<VecDeque<String>>,
}

impl BufferedRows {
    pub fn new<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            units: Mutex::new(units.into_iter().map(Into::into).collect()),
        }
    }
}

impl RowSource for BufferedRows {
    fn next_unit(&self) -> Option<String> {
        self.units.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }
}

#[derive(Debug)]
struct StreamedRows<S>(S);

impl<S: RowSource> Object for StreamedRows<S> {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Iterable
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        let this = Arc::clone(self);
        Enumerator::Iter(Box::new(std::iter::from_fn(move || {
            this.0.next_unit().map(Value::from_safe_string)
        })))
    }
}

/// Late error message shown below the rows.
#[derive(Debug, Clone, Default)]
pub struct ErrorPanel {
    slot: Arc<Mutex<Option<String>>>,
}

impl ErrorPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, message: impl Into<String>) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    pub fn message(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[derive(Debug)]
struct ErrorPanelObject(ErrorPanel);

impl Object for ErrorPanelObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "message" => self.0.message().map(Value::from),
            _ => None,
        }
    }
}

/// How a command page presents its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageMode {
    /// `<tr>` fragments inside a static table.
    Table,
    /// JSON objects inlined into a DataTables initializer.
    DataTables,
}

/// Everything a command page template sees besides the rows.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub template: String,
    pub command: String,
    pub title: String,
    pub description: String,
    pub long_html: String,
    pub layout: FormLayout,
    pub has_files: bool,
    pub mode: PageMode,
    pub columns: Vec<String>,
    /// Column names as a JSON array, safe to inline in a script block.
    pub columns_json: String,
    pub query: String,
}

impl Page {
    /// Page for `description`, with its form layout built and validated.
    pub fn for_command(description: &CommandDescription, mode: PageMode) -> RenderResult<Self> {
        let layout = FormLayout::from_description(description)?;
        let has_files = layout
            .sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .any(|f| f.input == "file");
        Ok(Self {
            template: COMMAND_TEMPLATE.to_string(),
            command: description.name.clone(),
            title: description.name.clone(),
            description: description.short.clone(),
            long_html: render_markdown(&description.long),
            layout,
            has_files,
            mode,
            columns: Vec::new(),
            columns_json: "[]".to_string(),
            query: String::new(),
        })
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_values(mut self, parsed: &ParsedLayers) -> Self {
        self.layout = self.layout.with_values(parsed);
        self
    }

    pub fn with_columns(mut self, columns: &ColumnSet) -> Self {
        self.columns = columns.as_slice().to_vec();
        self.columns_json = serde_json::to_string(&self.columns)
            .unwrap_or_else(|_| "[]".to_string())
            .replace("</", "<\\/");
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }
}

fn environment<'a>(sources: &'a [(String, String)]) -> RenderResult<Environment<'a>> {
    let mut env = Environment::new();
    for (name, source) in sources {
        env.add_template(name, source)
            .map_err(|e| RenderError::template(name.as_str(), e))?;
    }
    Ok(env)
}

fn load_sources(resolver: &dyn TemplateResolver, entry: &str) -> RenderResult<Vec<(String, String)>> {
    let mut sources = vec![(entry.to_string(), resolver.resolve(entry)?)];
    for name in resolver.names() {
        if name != entry {
            sources.push((name.clone(), resolver.resolve(&name)?));
        }
    }
    Ok(sources)
}

/// Render a command page into `out`, pulling rows from `rows` while the
/// template runs.
pub fn render_page<S, W>(
    resolver: &dyn TemplateResolver,
    page: &Page,
    rows: S,
    error: &ErrorPanel,
    out: W,
) -> RenderResult<()>
where
    S: RowSource,
    W: Write,
{
    let sources = load_sources(resolver, &page.template)?;
    let env = environment(&sources)?;
    let template = env
        .get_template(&page.template)
        .map_err(|e| RenderError::template(page.template.as_str(), e))?;

    debug!(template = %page.template, command = %page.command, "rendering page");
    template
        .render_captured_to(
            context! {
                page => Value::from_serialize(page),
                rows => Value::from_object(StreamedRows(rows)),
                error => Value::from_object(ErrorPanelObject(error.clone())),
            },
            out,
        )
        .map_err(|e| RenderError::template(page.template.as_str(), e))?;
    Ok(())
}

#[derive(Serialize)]
struct IndexEntry<'a> {
    name: &'a str,
    short: &'a str,
    kind: &'a str,
}

/// Render the command index.
///
/// `commands` pairs each description with its kind (`rows`, `writer` or
/// `bare`).
pub fn render_index(
    resolver: &dyn TemplateResolver,
    commands: &[(&CommandDescription, &str)],
) -> RenderResult<String> {
    let sources = load_sources(resolver, INDEX_TEMPLATE)?;
    let env = environment(&sources)?;
    let template = env
        .get_template(INDEX_TEMPLATE)
        .map_err(|e| RenderError::template(INDEX_TEMPLATE, e))?;
    let entries: Vec<IndexEntry<'_>> = commands
        .iter()
        .map(|(d, kind)| IndexEntry {
            name: &d.name,
            short: &d.short,
            kind,
        })
        .collect();
    template
        .render(context! { commands => entries })
        .map_err(|e| RenderError::template(INDEX_TEMPLATE, e))
}
