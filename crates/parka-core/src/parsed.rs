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

//! Resolved parameter values with provenance.

use crate::definition::ParameterDefinition;
use crate::types::ParameterType;
use crate::value::Value;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Where a parsed value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Default,
    Static,
    Query,
    Form,
    Json,
    File,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Static => "static",
            Self::Query => "query",
            Self::Form => "form",
            Self::Json => "json",
            Self::File => "file",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const REDACTED: &str = "********";

/// A typed value bound to its definition.
#[derive(Clone, PartialEq)]
pub struct ParsedParameter {
    pub definition: Arc<ParameterDefinition>,
    pub value: Value,
    pub source: Source,
}

impl ParsedParameter {
    pub fn new(definition: Arc<ParameterDefinition>, value: Value, source: Source) -> Self {
        Self {
            definition,
            value,
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn is_secret(&self) -> bool {
        self.definition.parameter_type == ParameterType::Secret
    }

    /// The value, or a fixed mask for secrets.
    pub fn redacted_value(&self) -> Value {
        if self.is_secret() {
            Value::from(REDACTED)
        } else {
            self.value.clone()
        }
    }
}

impl fmt::Debug for ParsedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ParsedParameter");
        s.field("name", &self.definition.name);
        if self.is_secret() {
            s.field("value", &REDACTED);
        } else {
            s.field("value", &self.value);
        }
        s.field("source", &self.source).finish()
    }
}

/// Parsed values for one layer, in resolution order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLayer {
    pub slug: String,
    parameters: IndexMap<String, ParsedParameter>,
}

impl ParsedLayer {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            parameters: IndexMap::new(),
        }
    }

    /// Set a parameter, replacing any previous value.
    pub fn set(&mut self, definition: Arc<ParameterDefinition>, value: Value, source: Source) {
        let name = definition.name.clone();
        self.parameters
            .insert(name, ParsedParameter::new(definition, value, source));
    }

    pub fn get(&self, name: &str) -> Option<&ParsedParameter> {
        self.parameters.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name).map(|p| &p.value)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Value::as_int)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(Value::as_float)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(Value::as_bool)
    }

    pub fn get_date(&self, name: &str) -> Option<NaiveDate> {
        self.value(name).and_then(Value::as_date)
    }

    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        self.value(name).and_then(Value::as_list)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedParameter> {
        self.parameters.values()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// `{name: value}` with secrets redacted.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.parameters
                .iter()
                .map(|(name, p)| {
                    let value = if p.is_secret() {
                        JsonValue::String(REDACTED.to_string())
                    } else {
                        p.value.to_json()
                    };
                    (name.clone(), value)
                })
                .collect(),
        )
    }
}

/// Parsed values for every layer of a command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLayers {
    layers: IndexMap<String, ParsedLayer>,
}

impl ParsedLayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: ParsedLayer) {
        self.layers.insert(layer.slug.clone(), layer);
    }

    pub fn get(&self, slug: &str) -> Option<&ParsedLayer> {
        self.layers.get(slug)
    }

    /// The implicit `default` layer, if declared.
    pub fn default_layer(&self) -> Option<&ParsedLayer> {
        self.layers.get(crate::layer::DEFAULT_SLUG)
    }

    /// Shortcut for `get(layer)?.value(name)`.
    pub fn value(&self, layer: &str, name: &str) -> Option<&Value> {
        self.layers.get(layer).and_then(|l| l.value(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedLayer> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// `{layer: {name: value}}` with secrets redacted.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.layers
                .iter()
                .map(|(slug, layer)| (slug.clone(), layer.to_json()))
                .collect(),
        )
    }
}
