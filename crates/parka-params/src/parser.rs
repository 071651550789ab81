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

//! Composing parse steps into a parser.

use crate::input::RequestInput;
use crate::overrides::{StaticOverrideStep, StaticOverrides};
use crate::step::{ParseStep, StepContext};
use crate::steps::{DefaultsStep, FormStep, JsonBodyStep, QueryStep};
use indexmap::IndexMap;
use parka_core::{
    Command, CommandContext, ParameterError, ParameterLayers, ParameterResult, ParsedLayer,
    ParsedLayers, TempFileManager,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// An ordered chain of parse steps.
///
/// Parsers are immutable: every `with_*` call returns a new parser and
/// leaves the receiver untouched, so one parser can be shared by all
/// requests of a route and specialized per command.
///
/// Resolution for each layer runs, in order:
///
/// 1. static overrides, if configured
/// 2. the layer's own steps if registered with [`with_layer_steps`],
///    otherwise the shared steps
///
/// and fails if a required parameter is still pending afterwards.
///
/// [`with_layer_steps`]: Parser::with_layer_steps
#[derive(Clone, Default)]
pub struct Parser {
    steps: Vec<Arc<dyn ParseStep>>,
    layer_steps: IndexMap<String, Vec<Arc<dyn ParseStep>>>,
    overrides: Option<Arc<StaticOverrides>>,
}

impl Parser {
    /// A parser with no steps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Query string, then defaults.
    pub fn for_query() -> Self {
        Self::new().with_step(QueryStep).with_step(DefaultsStep)
    }

    /// Form fields and uploads, then defaults.
    pub fn for_form() -> Self {
        Self::new().with_step(FormStep).with_step(DefaultsStep)
    }

    /// JSON body, then defaults.
    pub fn for_json() -> Self {
        Self::new().with_step(JsonBodyStep).with_step(DefaultsStep)
    }

    /// Append a shared step.
    pub fn with_step(&self, step: impl ParseStep + 'static) -> Self {
        self.with_shared_step(Arc::new(step))
    }

    /// Append an already shared step.
    pub fn with_shared_step(&self, step: Arc<dyn ParseStep>) -> Self {
        let mut next = self.clone();
        next.steps.push(step);
        next
    }

    /// Give `slug` its own step chain instead of the shared one.
    pub fn with_layer_steps(&self, slug: impl Into<String>, steps: Vec<Arc<dyn ParseStep>>) -> Self {
        let mut next = self.clone();
        next.layer_steps.insert(slug.into(), steps);
        next
    }

    /// Apply `overrides` before any other step.
    pub fn with_static_overrides(&self, overrides: Arc<StaticOverrides>) -> Self {
        let mut next = self.clone();
        next.overrides = if overrides.is_empty() {
            None
        } else {
            Some(overrides)
        };
        next
    }

    /// The steps run for `slug`, excluding static overrides.
    pub fn steps_for(&self, slug: &str) -> &[Arc<dyn ParseStep>] {
        self.layer_steps
            .get(slug)
            .map(Vec::as_slice)
            .unwrap_or(&self.steps)
    }

    /// Names of the steps run for `slug`, for diagnostics.
    pub fn step_names(&self, slug: &str) -> Vec<String> {
        let mut names = Vec::new();
        if self.overrides.is_some() {
            names.push("static-overrides".to_string());
        }
        names.extend(self.steps_for(slug).iter().map(|s| s.name().to_string()));
        names
    }

    /// Resolve every layer against `input`.
    ///
    /// All-or-nothing: the first error aborts resolution and no partial
    /// result is returned. Temp files created along the way stay registered
    /// with `temp_files` so the caller's cleanup still removes them.
    pub fn resolve(
        &self,
        layers: &ParameterLayers,
        input: &RequestInput,
        temp_files: &TempFileManager,
    ) -> ParameterResult<ParsedLayers> {
        let mut resolved = ParsedLayers::new();
        for layer in layers.iter() {
            let mut parsed = ParsedLayer::new(&layer.slug);
            {
                let mut ctx = StepContext::new(layer, &mut parsed, input, temp_files);
                if let Some(overrides) = &self.overrides {
                    StaticOverrideStep::new(overrides.clone()).apply(&mut ctx)?;
                }
                for step in self.steps_for(&layer.slug) {
                    if ctx.is_sealed() {
                        trace!(layer = %layer.slug, "layer sealed");
                        break;
                    }
                    step.apply(&mut ctx)?;
                }
                if let Some(missing) = ctx.pending().iter().find(|d| d.required) {
                    return Err(ParameterError::missing(&layer.slug, &missing.name));
                }
            }
            debug!(layer = %layer.slug, resolved = parsed.len(), "layer resolved");
            resolved.insert(parsed);
        }
        Ok(resolved)
    }

    /// Resolve `command`'s layers and bind them into a context.
    pub fn build_context(
        &self,
        command: Command,
        input: &RequestInput,
        temp_files: Arc<TempFileManager>,
    ) -> ParameterResult<CommandContext> {
        let layers = self.resolve(command.layers(), input, &temp_files)?;
        Ok(CommandContext::new(command, layers, temp_files))
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field(
                "steps",
                &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("layer_steps", &self.layer_steps.keys().collect::<Vec<_>>())
            .field("overrides", &self.overrides.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::StopStep;
    use parka_core::{ParameterDefinition, ParameterLayer, ParameterType, Source, Value};

    fn layers() -> ParameterLayers {
        ParameterLayers::new()
            .with_defaults(vec![
                ParameterDefinition::new("limit", ParameterType::Integer).with_default(10i64),
                ParameterDefinition::new("name", ParameterType::String).required(),
            ])
            .with_layer(ParameterLayer::new("db", "Database").with_definition(
                ParameterDefinition::new("host", ParameterType::String).with_default("localhost"),
            ))
    }

    #[test]
    fn test_builder_is_immutable() {
        let base = Parser::new();
        let extended = base.with_step(QueryStep);
        assert!(base.steps_for("default").is_empty());
        assert_eq!(extended.step_names("default"), vec!["query"]);
    }

    #[test]
    fn test_missing_required_names_parameter() {
        let temp = TempFileManager::new();
        let err = Parser::for_query()
            .resolve(&layers(), &RequestInput::new(), &temp)
            .unwrap_err();
        assert!(matches!(err, ParameterError::MissingRequired { ref name, .. } if name == "name"));
    }

    #[test]
    fn test_undeclared_layer_still_gets_defaults() {
        let temp = TempFileManager::new();
        let input = RequestInput::from_query_string("name=x");
        let parsed = Parser::for_query().resolve(&layers(), &input, &temp).unwrap();
        assert_eq!(parsed.value("db", "host"), Some(&Value::from("localhost")));
        assert_eq!(parsed.get("db").unwrap().get("host").unwrap().source, Source::Default);
    }

    #[test]
    fn test_layer_steps_replace_shared_steps() {
        let temp = TempFileManager::new();
        let input = RequestInput::from_query_string("name=x&host=remote");
        let parser = Parser::for_query()
            .with_layer_steps("db", vec![Arc::new(StopStep), Arc::new(QueryStep)]);
        let parsed = parser.resolve(&layers(), &input, &temp).unwrap();
        // Sealed before the query step and the defaults: nothing set.
        assert!(parsed.get("db").unwrap().is_empty());
        assert_eq!(parsed.value("default", "name"), Some(&Value::from("x")));
    }

    #[test]
    fn test_static_override_beats_query() {
        let temp = TempFileManager::new();
        let input = RequestInput::from_query_string("name=x&limit=3");
        let overrides = StaticOverrides::new().set("default", "limit", 99);
        let parser = Parser::for_query().with_static_overrides(Arc::new(overrides));
        let parsed = parser.resolve(&layers(), &input, &temp).unwrap();
        assert_eq!(parsed.value("default", "limit"), Some(&Value::Int(99)));
        assert_eq!(parser.step_names("default")[0], "static-overrides");
    }

    #[test]
    fn test_static_override_unknown_parameter_is_schema_violation() {
        let temp = TempFileManager::new();
        let input = RequestInput::from_query_string("name=x");
        let overrides = StaticOverrides::new().set("default", "nope", 1);
        let err = Parser::for_query()
            .with_static_overrides(Arc::new(overrides))
            .resolve(&layers(), &input, &temp)
            .unwrap_err();
        assert!(err.is_schema_violation());
    }
}
