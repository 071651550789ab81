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

//! Named command registry.

use indexmap::IndexMap;
use parka_core::{Command, ParameterResult};
use serde_json::{json, Value as JsonValue};
use tracing::warn;

/// Commands served by the router, in registration order.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: IndexMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `command` under its description name, replacing any command
    /// already registered under that name.
    ///
    /// Fails when the command's layers declare a parameter twice or carry a
    /// default that its own type rejects.
    pub fn register(&mut self, command: Command) -> ParameterResult<&mut Self> {
        command.layers().validate()?;
        let name = command.name().to_string();
        if self.commands.insert(name.clone(), command).is_some() {
            warn!(command = %name, "command registered twice, keeping the last one");
        }
        Ok(self)
    }

    pub fn with(mut self, command: Command) -> ParameterResult<Self> {
        self.register(command)?;
        Ok(self)
    }

    /// A clone of the command, ready to move into a context.
    pub fn get(&self, name: &str) -> Option<Command> {
        self.commands.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// One JSON object per command: name, description, kind and parameters.
    pub fn summaries(&self) -> JsonValue {
        JsonValue::Array(self.iter().map(summary).collect())
    }
}

fn summary(command: &Command) -> JsonValue {
    let description = command.description();
    let layers: Vec<JsonValue> = description
        .layers
        .iter()
        .map(|layer| {
            let parameters: Vec<JsonValue> = layer
                .definitions
                .iter()
                .map(|d| {
                    json!({
                        "name": d.name,
                        "type": d.parameter_type.as_str(),
                        "required": d.required,
                        "help": d.help,
                    })
                })
                .collect();
            json!({ "slug": layer.slug, "name": layer.name, "parameters": parameters })
        })
        .collect();
    json!({
        "name": description.name,
        "short": description.short,
        "kind": command.kind(),
        "layers": layers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parka_core::{ParameterDefinition, ParameterLayers, ParameterType};
    use parka_test::fixtures;
    use std::sync::Arc;

    #[test]
    fn test_register_and_get() {
        let (numbers, _) = fixtures::numbers_command();
        let registry = CommandRegistry::new()
            .with(numbers)
            .unwrap()
            .with(Command::Writer(Arc::new(fixtures::EchoWriter::new(["hi"]))))
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("numbers").unwrap().kind(), "rows");
        assert_eq!(registry.get("echo").unwrap().kind(), "writer");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_name_keeps_last() {
        let (first, _) = fixtures::numbers_command();
        let mut registry = CommandRegistry::new();
        registry
            .register(first)
            .unwrap()
            .register(Command::Rows(Arc::new(fixtures::RaggedCommand::new())))
            .unwrap();
        registry.register(Command::Writer(Arc::new(fixtures::EchoWriter::new(["a"])))).unwrap();
        registry.register(Command::Rows(Arc::new(fixtures::RaggedCommand::new()))).unwrap();
        assert_eq!(registry.len(), 3);
        let names: Vec<&str> = registry.iter().map(Command::name).collect();
        assert_eq!(names, vec!["numbers", "ragged", "echo"]);
    }

    #[test]
    fn test_register_rejects_default_outside_choices() {
        let layers = ParameterLayers::new().with_defaults(vec![ParameterDefinition::new(
            "mode",
            ParameterType::Choice,
        )
        .with_choices(["a", "b"])
        .with_default("zzz")]);
        let command = Command::Bare(Arc::new(fixtures::CountingBare::new(layers)));

        let mut registry = CommandRegistry::new();
        let err = registry.register(command).unwrap_err();
        assert_eq!(err.parameter(), Some("mode"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate_parameter() {
        let layers = ParameterLayers::new().with_defaults(vec![
            ParameterDefinition::new("count", ParameterType::Integer),
            ParameterDefinition::new("count", ParameterType::String),
        ]);
        let command = Command::Bare(Arc::new(fixtures::CountingBare::new(layers)));
        assert!(CommandRegistry::new().with(command).is_err());
    }

    #[test]
    fn test_summaries_list_parameters() {
        let (numbers, _) = fixtures::numbers_command();
        let summaries = CommandRegistry::new().with(numbers).unwrap().summaries();
        let first = &summaries[0];
        assert_eq!(first["name"], "numbers");
        assert_eq!(first["kind"], "rows");
        assert_eq!(first["layers"][0]["parameters"][0]["name"], "count");
        assert_eq!(first["layers"][0]["parameters"][0]["type"], "integer");
    }
}
