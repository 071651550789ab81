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

//! Demo commands served by the `parka` binary.
//!
//! One command per shape, plus a few that exercise the parameter system:
//! layered parameters with a secret, and an object parsed from an upload.

use crate::registry::CommandRegistry;
use async_trait::async_trait;
use parka_core::{
    BareCommand, Command, CommandDescription, CommandError, LayoutSection, ParameterDefinition,
    ParameterLayer, ParameterLayers, ParameterResult, ParameterType, ParsedLayers, Row,
    RowCommand, RowSink, TextSink, Value, WriterCommand,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Every demo command.
pub fn registry() -> ParameterResult<CommandRegistry> {
    CommandRegistry::new()
        .with(Command::Rows(Arc::new(Numbers::new())))?
        .with(Command::Rows(Arc::new(Params::new())))?
        .with(Command::Rows(Arc::new(InspectConfig::new())))?
        .with(Command::Writer(Arc::new(Greet::new())))?
        .with(Command::Bare(Arc::new(Touch::new())))
}

// ==================== numbers ====================

/// `count` rows of `{n, square, even}`, optionally slowed down or failing
/// part way.
#[derive(Debug)]
pub struct Numbers {
    description: CommandDescription,
}

impl Numbers {
    pub fn new() -> Self {
        let layers = ParameterLayers::new().with_defaults(vec![
            ParameterDefinition::new("count", ParameterType::Integer)
                .with_help("Number of rows")
                .with_default(10i64),
            ParameterDefinition::new("delay_ms", ParameterType::Integer)
                .with_help("Pause between rows, in milliseconds")
                .with_default(0i64),
            ParameterDefinition::new("fail_after", ParameterType::Integer)
                .with_help("Fail once this many rows were sent"),
        ]);
        Self {
            description: CommandDescription::new("numbers", "Count upwards")
                .with_long(
                    "Emits `count` rows.\n\n\
                     Set `delay_ms` to watch rows stream in, or `fail_after` to see \
                     how a failure part way through is reported.",
                )
                .with_layers(layers),
        }
    }
}

impl Default for Numbers {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowCommand for Numbers {
    fn description(&self) -> &CommandDescription {
        &self.description
    }

    async fn run(&self, layers: &ParsedLayers, sink: RowSink) -> Result<(), CommandError> {
        let flags = layers.default_layer();
        let count = flags.and_then(|l| l.get_int("count")).unwrap_or(10);
        let delay = flags.and_then(|l| l.get_int("delay_ms")).unwrap_or(0);
        let fail_after = flags.and_then(|l| l.get_int("fail_after"));

        for n in 1..=count {
            if fail_after == Some(n - 1) {
                return Err(CommandError::failed(format!("gave up after {} rows", n - 1)));
            }
            sink.send(
                Row::new()
                    .with("n", n)
                    .with("square", n * n)
                    .with("even", n % 2 == 0),
            )
            .await?;
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay.unsigned_abs())).await;
            }
        }
        Ok(())
    }
}

// ==================== params ====================

/// Echoes every resolved parameter with its source. Secrets are masked.
#[derive(Debug)]
pub struct Params {
    description: CommandDescription,
}

impl Params {
    pub fn new() -> Self {
        let layers = ParameterLayers::new()
            .with_defaults(vec![
                ParameterDefinition::new("name", ParameterType::String)
                    .with_help("Who is asking")
                    .with_default("world"),
                ParameterDefinition::new("format", ParameterType::Choice)
                    .with_choices(["short", "long"])
                    .with_default("short"),
                ParameterDefinition::new("tags", ParameterType::StringList),
                ParameterDefinition::new("since", ParameterType::Date),
            ])
            .with_layer(
                ParameterLayer::new("db", "Database")
                    .with_description("Connection settings")
                    .with_definition(
                        ParameterDefinition::new("host", ParameterType::String)
                            .with_default("localhost"),
                    )
                    .with_definition(
                        ParameterDefinition::new("port", ParameterType::Integer).with_default(5432i64),
                    )
                    .with_definition(ParameterDefinition::new("password", ParameterType::Secret)),
            );
        let layout = vec![
            LayoutSection::new("Query", "default", ["name", "format", "tags", "since"]),
            LayoutSection::new("Database", "db", ["host", "port", "password"])
                .with_description("Usually set through static overrides"),
        ];
        Self {
            description: CommandDescription::new("params", "Show resolved parameters")
                .with_layers(layers)
                .with_layout(layout),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowCommand for Params {
    fn description(&self) -> &CommandDescription {
        &self.description
    }

    async fn run(&self, layers: &ParsedLayers, sink: RowSink) -> Result<(), CommandError> {
        for layer in layers.iter() {
            for parameter in layer.iter() {
                sink.send(
                    Row::new()
                        .with("layer", layer.slug.as_str())
                        .with("name", parameter.name())
                        .with("value", parameter.redacted_value())
                        .with("source", parameter.source.as_str()),
                )
                .await?;
            }
        }
        Ok(())
    }
}

// ==================== inspect-config ====================

/// One row per top-level key of an uploaded JSON or YAML object.
#[derive(Debug)]
pub struct InspectConfig {
    description: CommandDescription,
}

impl InspectConfig {
    pub fn new() -> Self {
        let layers = ParameterLayers::new().with_defaults(vec![
            ParameterDefinition::new("config", ParameterType::ObjectFromFile)
                .with_help("A .json or .yaml file")
                .required(),
        ]);
        Self {
            description: CommandDescription::new("inspect-config", "List the keys of a config file")
                .with_layers(layers),
        }
    }
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowCommand for InspectConfig {
    fn description(&self) -> &CommandDescription {
        &self.description
    }

    async fn run(&self, layers: &ParsedLayers, sink: RowSink) -> Result<(), CommandError> {
        let config = layers
            .value(parka_core::DEFAULT_SLUG, "config")
            .and_then(Value::as_object)
            .ok_or_else(|| CommandError::failed("config is not an object"))?;
        for (key, value) in config {
            sink.send(
                Row::new()
                    .with("key", key.as_str())
                    .with("kind", value.kind())
                    .with("value", value.to_cell_string()),
            )
            .await?;
        }
        Ok(())
    }
}

// ==================== greet ====================

/// Writes a greeting `times` times.
#[derive(Debug)]
pub struct Greet {
    description: CommandDescription,
}

impl Greet {
    pub fn new() -> Self {
        let layers = ParameterLayers::new().with_defaults(vec![
            ParameterDefinition::new("name", ParameterType::String).with_default("world"),
            ParameterDefinition::new("times", ParameterType::Integer).with_default(1i64),
        ]);
        Self {
            description: CommandDescription::new("greet", "Say hello").with_layers(layers),
        }
    }
}

impl Default for Greet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WriterCommand for Greet {
    fn description(&self) -> &CommandDescription {
        &self.description
    }

    async fn run(&self, layers: &ParsedLayers, sink: TextSink) -> Result<(), CommandError> {
        let flags = layers.default_layer();
        let name = flags.and_then(|l| l.get_str("name")).unwrap_or("world");
        let times = flags.and_then(|l| l.get_int("times")).unwrap_or(1);
        for _ in 0..times {
            sink.writeln(format!("Hello, {}!", name)).await?;
        }
        Ok(())
    }
}

// ==================== touch ====================

/// Logs that it ran.
#[derive(Debug)]
pub struct Touch {
    description: CommandDescription,
}

impl Touch {
    pub fn new() -> Self {
        let layers = ParameterLayers::new().with_defaults(vec![ParameterDefinition::new(
            "target",
            ParameterType::String,
        )
        .with_default("everything")]);
        Self {
            description: CommandDescription::new("touch", "Run for side effects only").with_layers(layers),
        }
    }
}

impl Default for Touch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BareCommand for Touch {
    fn description(&self) -> &CommandDescription {
        &self.description
    }

    async fn run(&self, layers: &ParsedLayers) -> Result<(), CommandError> {
        let target = layers
            .default_layer()
            .and_then(|l| l.get_str("target"))
            .unwrap_or("everything");
        info!(target = %target, "touched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_every_shape() {
        let registry = registry().unwrap();
        let kinds: Vec<&str> = registry.iter().map(Command::kind).collect();
        assert_eq!(kinds, vec!["rows", "rows", "rows", "writer", "bare"]);
    }

    #[test]
    fn test_layouts_are_valid() {
        for command in registry().unwrap().iter() {
            parka_render::FormLayout::from_description(command.description()).unwrap();
        }
    }
}
