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

//! Parameter layers: named groups of definitions.

use crate::definition::ParameterDefinition;
use crate::error::{ParameterError, ParameterResult};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// Slug of the implicit layer holding a command's top-level flags.
pub const DEFAULT_SLUG: &str = "default";

/// A named, reusable group of parameter definitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterLayer {
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "parameters")]
    pub definitions: Vec<Arc<ParameterDefinition>>,
}

impl ParameterLayer {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: String::new(),
            definitions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_definition(mut self, definition: ParameterDefinition) -> Self {
        self.definitions.push(Arc::new(definition));
        self
    }

    pub fn with_definitions<I>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = ParameterDefinition>,
    {
        self.definitions
            .extend(definitions.into_iter().map(Arc::new));
        self
    }

    /// Look up a definition by name.
    pub fn get(&self, name: &str) -> Option<&Arc<ParameterDefinition>> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Check names are unique and defaults fit their types.
    pub fn validate(&self) -> ParameterResult<()> {
        for (i, def) in self.definitions.iter().enumerate() {
            if self.definitions[..i].iter().any(|d| d.name == def.name) {
                return Err(ParameterError::invalid_value(
                    &def.name,
                    &self.slug,
                    "duplicate parameter name in layer",
                ));
            }
            if let Some(default) = &def.default {
                def.validate(default)?;
            }
        }
        Ok(())
    }
}

/// The ordered set of layers a command declares.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterLayers {
    layers: IndexMap<String, ParameterLayer>,
}

impl ParameterLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer, replacing any layer with the same slug.
    pub fn with_layer(mut self, layer: ParameterLayer) -> Self {
        self.layers.insert(layer.slug.clone(), layer);
        self
    }

    /// Add the implicit `default` layer from top-level definitions.
    pub fn with_defaults<I>(self, definitions: I) -> Self
    where
        I: IntoIterator<Item = ParameterDefinition>,
    {
        self.with_layer(ParameterLayer::new(DEFAULT_SLUG, "Flags").with_definitions(definitions))
    }

    pub fn get(&self, slug: &str) -> Option<&ParameterLayer> {
        self.layers.get(slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.layers.contains_key(slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterLayer> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Validate every layer.
    pub fn validate(&self) -> ParameterResult<()> {
        self.layers.values().try_for_each(ParameterLayer::validate)
    }
}
