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

//! Concrete parse steps.
//!
//! | step               | reads                                  | source   |
//! |--------------------|----------------------------------------|----------|
//! | [`QueryStep`]      | URL query string                       | `Query`  |
//! | [`FormStep`]       | form fields and multipart file parts   | `Form` / `File` |
//! | [`JsonBodyStep`]   | JSON object body                       | `Json`   |
//! | [`DefaultsStep`]   | declared defaults                      | `Default`|
//! | [`StopStep`]       | nothing; seals the layer               |          |
//! | [`FilteredStep`]   | whatever the wrapped step reads        |          |

use crate::ingest::{ingest_inline, materialize};
use crate::input::{collect_values, filename_hint, RequestInput};
use crate::step::{ParseStep, StepContext};
use parka_core::{ParameterDefinition, ParameterResult, Source, Value};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// Resolve a definition from string pairs (query or form fields).
fn resolve_from_pairs(
    ctx: &StepContext<'_>,
    definition: &ParameterDefinition,
    pairs: &[(String, String)],
) -> ParameterResult<Option<Value>> {
    let t = definition.parameter_type;
    if t.is_file_backed() {
        // Inline content may contain commas, never split it.
        let Some(contents) = collect_values(pairs, &definition.name, t, false) else {
            return Ok(None);
        };
        let hint = filename_hint(pairs, &definition.name);
        return ingest_inline(definition, ctx.temp_files, hint, &contents).map(Some);
    }
    match collect_values(pairs, &definition.name, t, true) {
        Some(raw) => definition.parse_strings(&raw).map(Some),
        None => Ok(None),
    }
}

/// Values from the URL query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryStep;

impl ParseStep for QueryStep {
    fn name(&self) -> &str {
        "query"
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> ParameterResult<()> {
        let input: &RequestInput = ctx.input;
        for definition in ctx.pending_snapshot() {
            if let Some(value) = resolve_from_pairs(ctx, &definition, &input.query)? {
                trace!(parameter = %definition.name, "resolved from query");
                ctx.resolve(&definition.name, value, Source::Query);
            }
        }
        Ok(())
    }
}

/// Values from form fields and uploaded files.
///
/// An uploaded file for a file-backed parameter wins over inline form text
/// for the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormStep;

impl ParseStep for FormStep {
    fn name(&self) -> &str {
        "form"
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> ParameterResult<()> {
        let input: &RequestInput = ctx.input;
        for definition in ctx.pending_snapshot() {
            if definition.parameter_type.is_file_backed() {
                let uploads = input.files_for(&definition.name);
                if !uploads.is_empty() {
                    let files = uploads
                        .iter()
                        .map(|f| {
                            materialize(&definition, ctx.temp_files, Some(f.filename.as_str()), &f.content)
                        })
                        .collect::<ParameterResult<Vec<_>>>()?;
                    let value = definition.parse_files(&files)?;
                    trace!(parameter = %definition.name, files = files.len(), "resolved from upload");
                    ctx.resolve(&definition.name, value, Source::File);
                    continue;
                }
            }
            if let Some(value) = resolve_from_pairs(ctx, &definition, &input.form)? {
                trace!(parameter = %definition.name, "resolved from form");
                ctx.resolve(&definition.name, value, Source::Form);
            }
        }
        Ok(())
    }
}

/// Values from a JSON object body.
///
/// Strings for file-backed parameters are written to a temp file and parsed
/// like an upload, using `<name>.filename` from the body as the filename
/// hint. Objects and arrays are coerced directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBodyStep;

impl JsonBodyStep {
    fn resolve_one(
        ctx: &StepContext<'_>,
        definition: &ParameterDefinition,
        json: &JsonValue,
    ) -> ParameterResult<Value> {
        if !definition.parameter_type.is_file_backed() {
            return definition.coerce_json(json);
        }
        let hint_key = format!("{}.filename", definition.name);
        let hint = ctx.input.json_value(&hint_key).and_then(JsonValue::as_str);
        match json {
            JsonValue::String(content) => {
                ingest_inline(definition, ctx.temp_files, hint, std::slice::from_ref(content))
            }
            JsonValue::Array(items) if items.iter().all(JsonValue::is_string) => {
                let contents: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                ingest_inline(definition, ctx.temp_files, hint, &contents)
            }
            other => definition.coerce_json(other),
        }
    }
}

impl ParseStep for JsonBodyStep {
    fn name(&self) -> &str {
        "json"
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> ParameterResult<()> {
        if ctx.input.json.is_none() {
            return Ok(());
        }
        let input: &RequestInput = ctx.input;
        for definition in ctx.pending_snapshot() {
            if let Some(json) = input.json_value(&definition.name) {
                let value = Self::resolve_one(ctx, &definition, json)?;
                trace!(parameter = %definition.name, "resolved from json body");
                ctx.resolve(&definition.name, value, Source::Json);
            }
        }
        Ok(())
    }
}

/// Fill declared defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultsStep;

impl ParseStep for DefaultsStep {
    fn name(&self) -> &str {
        "defaults"
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> ParameterResult<()> {
        for definition in ctx.pending_snapshot() {
            if let Some(default) = &definition.default {
                ctx.resolve(&definition.name, default.clone(), Source::Default);
            }
        }
        Ok(())
    }
}

/// Seal the layer: no later step runs on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopStep;

impl ParseStep for StopStep {
    fn name(&self) -> &str {
        "stop"
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> ParameterResult<()> {
        ctx.seal();
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Filter {
    Allow(HashSet<String>),
    Deny(HashSet<String>),
}

/// Restrict a step to a subset of parameter names.
pub struct FilteredStep {
    inner: Arc<dyn ParseStep>,
    filter: Filter,
    label: String,
}

impl FilteredStep {
    /// Only `names` may be set by `inner`.
    pub fn allow<I, S>(inner: Arc<dyn ParseStep>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let label = format!("allow({})", inner.name());
        Self {
            inner,
            filter: Filter::Allow(names.into_iter().map(Into::into).collect()),
            label,
        }
    }

    /// `names` may not be set by `inner`.
    pub fn deny<I, S>(inner: Arc<dyn ParseStep>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let label = format!("deny({})", inner.name());
        Self {
            inner,
            filter: Filter::Deny(names.into_iter().map(Into::into).collect()),
            label,
        }
    }

    fn permits(&self, name: &str) -> bool {
        match &self.filter {
            Filter::Allow(names) => names.contains(name),
            Filter::Deny(names) => !names.contains(name),
        }
    }
}

impl ParseStep for FilteredStep {
    fn name(&self) -> &str {
        &self.label
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> ParameterResult<()> {
        let hidden = ctx.hide(|d| !self.permits(&d.name));
        let result = self.inner.apply(ctx);
        ctx.restore(hidden);
        result
    }
}

impl std::fmt::Debug for FilteredStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredStep")
            .field("inner", &self.inner.name())
            .field("filter", &self.filter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parka_core::{ParameterLayer, ParameterType, ParsedLayer, TempFileManager};

    fn layer() -> ParameterLayer {
        ParameterLayer::new("default", "Flags")
            .with_definition(ParameterDefinition::new("limit", ParameterType::Integer).with_default(10i64))
            .with_definition(ParameterDefinition::new("name", ParameterType::String))
            .with_definition(ParameterDefinition::new("ids", ParameterType::IntegerList))
    }

    fn run(step: &dyn ParseStep, input: &RequestInput) -> ParameterResult<ParsedLayer> {
        let layer = layer();
        let mut parsed = ParsedLayer::new("default");
        let temp = TempFileManager::new();
        {
            let mut ctx = StepContext::new(&layer, &mut parsed, input, &temp);
            step.apply(&mut ctx)?;
        }
        Ok(parsed)
    }

    #[test]
    fn test_query_step() {
        let input = RequestInput::from_query_string("limit=5&ids=1,2&unrelated=x");
        let parsed = run(&QueryStep, &input).unwrap();
        assert_eq!(parsed.get_int("limit"), Some(5));
        assert_eq!(parsed.get_list("ids").map(|l| l.len()), Some(2));
        assert!(!parsed.contains("name"));
        assert_eq!(parsed.get("limit").unwrap().source, Source::Query);
    }

    #[test]
    fn test_query_step_error_names_parameter() {
        let input = RequestInput::from_query_string("limit=many");
        let err = run(&QueryStep, &input).unwrap_err();
        assert_eq!(err.parameter(), Some("limit"));
    }

    #[test]
    fn test_form_step_ignores_query() {
        let input = RequestInput::from_query_string("name=q").with_form("name", "f");
        let parsed = run(&FormStep, &input).unwrap();
        assert_eq!(parsed.get_str("name"), Some("f"));
        assert_eq!(parsed.get("name").unwrap().source, Source::Form);
    }

    #[test]
    fn test_json_step() {
        let body = serde_json::json!({"limit": 3, "ids": [4, 5]});
        let input = RequestInput::from_json(body.as_object().cloned().unwrap());
        let parsed = run(&JsonBodyStep, &input).unwrap();
        assert_eq!(parsed.get_int("limit"), Some(3));
        assert_eq!(parsed.get("ids").unwrap().source, Source::Json);
    }

    #[test]
    fn test_defaults_step() {
        let parsed = run(&DefaultsStep, &RequestInput::new()).unwrap();
        assert_eq!(parsed.get_int("limit"), Some(10));
        assert_eq!(parsed.get("limit").unwrap().source, Source::Default);
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_filtered_allow() {
        let input = RequestInput::from_query_string("limit=5&name=bob");
        let step = FilteredStep::allow(Arc::new(QueryStep), ["name"]);
        let parsed = run(&step, &input).unwrap();
        assert_eq!(parsed.get_str("name"), Some("bob"));
        assert!(!parsed.contains("limit"));
        assert_eq!(step.name(), "allow(query)");
    }

    #[test]
    fn test_filtered_deny() {
        let input = RequestInput::from_query_string("limit=5&name=bob");
        let step = FilteredStep::deny(Arc::new(QueryStep), ["name"]);
        let parsed = run(&step, &input).unwrap();
        assert!(!parsed.contains("name"));
        assert_eq!(parsed.get_int("limit"), Some(5));
    }
}
