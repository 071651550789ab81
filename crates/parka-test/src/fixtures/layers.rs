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

//! Parameter layer fixtures.

use parka_core::{ParameterDefinition, ParameterLayer, ParameterLayers, ParameterType};

/// The `default` layer used by [`sample_layers`].
///
/// | name     | type          | notes              |
/// |----------|---------------|--------------------|
/// | `limit`  | integer       | default 10         |
/// | `choice` | choice        | `a`, `b`           |
/// | `tags`   | integer-list  |                    |
/// | `since`  | date          |                    |
/// | `config` | object-from-file |                 |
/// | `notes`  | string-list-from-file |            |
pub fn default_definitions() -> Vec<ParameterDefinition> {
    vec![
        ParameterDefinition::new("limit", ParameterType::Integer)
            .with_help("Maximum number of rows")
            .with_default(10i64),
        ParameterDefinition::new("choice", ParameterType::Choice).with_choices(["a", "b"]),
        ParameterDefinition::new("tags", ParameterType::IntegerList),
        ParameterDefinition::new("since", ParameterType::Date),
        ParameterDefinition::new("config", ParameterType::ObjectFromFile),
        ParameterDefinition::new("notes", ParameterType::StringListFromFile),
    ]
}

/// A `db` layer with defaults and a secret.
pub fn db_layer() -> ParameterLayer {
    ParameterLayer::new("db", "Database")
        .with_description("Connection settings")
        .with_definition(
            ParameterDefinition::new("host", ParameterType::String).with_default("localhost"),
        )
        .with_definition(ParameterDefinition::new("port", ParameterType::Integer).with_default(5432i64))
        .with_definition(ParameterDefinition::new("password", ParameterType::Secret))
}

/// `default` plus `db`.
pub fn sample_layers() -> ParameterLayers {
    ParameterLayers::new()
        .with_defaults(default_definitions())
        .with_layer(db_layer())
}

/// Like [`sample_layers`] but `name` is required.
pub fn layers_with_required() -> ParameterLayers {
    let mut definitions = default_definitions();
    definitions.push(ParameterDefinition::new("name", ParameterType::String).required());
    ParameterLayers::new()
        .with_defaults(definitions)
        .with_layer(db_layer())
}

/// Layers for [`crate::fixtures::NumbersCommand`].
pub fn numbers_layers() -> ParameterLayers {
    ParameterLayers::new().with_defaults(vec![
        ParameterDefinition::new("count", ParameterType::Integer)
            .with_help("Number of rows to emit")
            .with_default(3i64),
        ParameterDefinition::new("fail_after", ParameterType::Integer)
            .with_help("Fail after this many rows"),
        ParameterDefinition::new("choice", ParameterType::Choice).with_choices(["a", "b"]),
    ])
}
