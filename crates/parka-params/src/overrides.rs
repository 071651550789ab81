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

//! Static parameter overrides injected by the operator.
//!
//! Overrides are keyed by layer slug and parameter name and take precedence
//! over anything in the request. They are typically loaded once from a YAML
//! file:
//!
//! ```yaml
//! default:
//!   limit: 100
//! db:
//!   host: replica.internal
//! ```

use crate::step::{ParseStep, StepContext};
use indexmap::IndexMap;
use parka_core::{ParameterError, ParameterResult, Source};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Error loading an overrides file.
#[derive(Error, Debug)]
pub enum OverridesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid overrides file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// `layer -> parameter -> value`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StaticOverrides {
    layers: IndexMap<String, IndexMap<String, JsonValue>>,
}

impl StaticOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, OverridesError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OverridesError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn set(
        mut self,
        layer: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.layers
            .entry(layer.into())
            .or_default()
            .insert(name.into(), value.into());
        self
    }

    pub fn layer(&self, slug: &str) -> Option<&IndexMap<String, JsonValue>> {
        self.layers.get(slug)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.values().all(IndexMap::is_empty)
    }
}

/// Applies [`StaticOverrides`] to a layer.
///
/// Overrides naming a parameter the layer does not declare are a schema
/// violation. Overrides for layers the command does not use are ignored, so
/// one overrides file can serve every command.
#[derive(Debug, Clone)]
pub struct StaticOverrideStep {
    overrides: Arc<StaticOverrides>,
}

impl StaticOverrideStep {
    pub fn new(overrides: Arc<StaticOverrides>) -> Self {
        Self { overrides }
    }
}

impl ParseStep for StaticOverrideStep {
    fn name(&self) -> &str {
        "static-overrides"
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> ParameterResult<()> {
        let Some(values) = self.overrides.layer(&ctx.layer.slug) else {
            return Ok(());
        };
        for (name, json) in values {
            let definition = ctx
                .layer
                .get(name)
                .cloned()
                .ok_or_else(|| ParameterError::unknown_parameter(&ctx.layer.slug, name))?;
            let value = definition.coerce_json(json)?;
            if ctx.resolve(name, value, Source::Static) {
                debug!(layer = %ctx.layer.slug, parameter = %name, "static override applied");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml() {
        let overrides = StaticOverrides::from_yaml_str("default:\n  limit: 5\ndb:\n  host: x\n").unwrap();
        assert_eq!(overrides.layer("default").unwrap()["limit"], JsonValue::from(5));
        assert!(!overrides.is_empty());
        assert!(StaticOverrides::from_yaml_str("").unwrap().is_empty());
    }

    #[test]
    fn test_from_yaml_rejects_wrong_shape() {
        assert!(StaticOverrides::from_yaml_str("- a\n- b\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.yaml");
        std::fs::write(&path, "default:\n  name: fixed\n").unwrap();
        let overrides = StaticOverrides::from_file(&path).unwrap();
        assert_eq!(overrides, StaticOverrides::new().set("default", "name", "fixed"));
    }
}
