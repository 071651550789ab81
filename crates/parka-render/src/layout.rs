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

//! Form layouts derived from a command's parameter schema.

use parka_core::{
    CommandDescription, ParameterDefinition, ParameterError, ParameterResult, ParameterType,
    ParsedLayers, Value,
};
use serde::Serialize;

/// One input in a form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub name: String,
    pub layer: String,
    /// HTML input kind: `text`, `number`, `checkbox`, `date`, `select`,
    /// `password`, `file` or `textarea`.
    pub input: &'static str,
    pub multiple: bool,
    pub required: bool,
    pub help: String,
    pub choices: Vec<String>,
    /// Current value as form text; never set for secrets.
    pub value: Option<String>,
}

impl FormField {
    fn from_definition(layer: &str, definition: &ParameterDefinition) -> Self {
        let t = definition.parameter_type;
        let input = match t {
            ParameterType::Integer | ParameterType::Float => "number",
            ParameterType::Bool => "checkbox",
            ParameterType::Date => "date",
            ParameterType::Choice | ParameterType::ChoiceList => "select",
            ParameterType::Secret => "password",
            ParameterType::ObjectFromFile
            | ParameterType::ObjectListFromFile
            | ParameterType::StringFromFile
            | ParameterType::StringFromFiles
            | ParameterType::StringListFromFile
            | ParameterType::File
            | ParameterType::FileList => "file",
            ParameterType::KeyValue => "textarea",
            _ => "text",
        };
        let value = match t {
            ParameterType::Secret => None,
            _ => definition.default.as_ref().map(form_text),
        };
        Self {
            name: definition.name.clone(),
            layer: layer.to_string(),
            input,
            multiple: t.is_list(),
            required: definition.required,
            help: definition.help.clone(),
            choices: definition.choices.clone(),
            value,
        }
    }
}

fn form_text(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v.to_cell_string()))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_cell_string(),
    }
}

/// A titled group of fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSection {
    pub title: String,
    pub description: String,
    pub fields: Vec<FormField>,
}

/// The form shown above a command's output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormLayout {
    pub sections: Vec<FormSection>,
}

impl FormLayout {
    /// Build the layout for `description`.
    ///
    /// With declared layout sections, every referenced layer and parameter
    /// must exist; otherwise one section per layer is derived.
    pub fn from_description(description: &CommandDescription) -> ParameterResult<Self> {
        if description.layout.is_empty() {
            return Ok(Self::derived(description));
        }

        let mut sections = Vec::with_capacity(description.layout.len());
        for declared in &description.layout {
            let layer = description
                .layers
                .get(&declared.layer)
                .ok_or_else(|| ParameterError::UnknownLayer(declared.layer.clone()))?;
            let fields = declared
                .parameters
                .iter()
                .map(|name| {
                    layer
                        .get(name)
                        .map(|d| FormField::from_definition(&layer.slug, d))
                        .ok_or_else(|| ParameterError::unknown_parameter(&layer.slug, name))
                })
                .collect::<ParameterResult<Vec<_>>>()?;
            sections.push(FormSection {
                title: declared.title.clone(),
                description: declared.description.clone(),
                fields,
            });
        }
        Ok(Self { sections })
    }

    fn derived(description: &CommandDescription) -> Self {
        let sections = description
            .layers
            .iter()
            .filter(|layer| !layer.definitions.is_empty())
            .map(|layer| FormSection {
                title: layer.name.clone(),
                description: layer.description.clone(),
                fields: layer
                    .definitions
                    .iter()
                    .map(|d| FormField::from_definition(&layer.slug, d))
                    .collect(),
            })
            .collect();
        Self { sections }
    }

    /// Fill field values from resolved parameters.
    pub fn with_values(mut self, parsed: &ParsedLayers) -> Self {
        for field in self.sections.iter_mut().flat_map(|s| s.fields.iter_mut()) {
            if field.input == "password" || field.input == "file" {
                continue;
            }
            if let Some(value) = parsed.value(&field.layer, &field.name) {
                field.value = Some(form_text(value));
            }
        }
        self
    }

    pub fn field(&self, layer: &str, name: &str) -> Option<&FormField> {
        self.sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .find(|f| f.layer == layer && f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parka_core::{LayoutSection, ParsedLayer, Source};
    use parka_test::fixtures;
    use std::sync::Arc;

    fn description() -> CommandDescription {
        CommandDescription::new("sample", "Sample").with_layers(fixtures::sample_layers())
    }

    #[test]
    fn test_derived_sections_per_layer() {
        let layout = FormLayout::from_description(&description()).unwrap();
        assert_eq!(layout.sections.len(), 2);
        assert_eq!(layout.sections[1].title, "Database");

        let limit = layout.field("default", "limit").unwrap();
        assert_eq!(limit.input, "number");
        assert_eq!(limit.value.as_deref(), Some("10"));
        assert!(layout.field("default", "tags").unwrap().multiple);
        assert_eq!(layout.field("db", "password").unwrap().input, "password");
    }

    #[test]
    fn test_declared_sections() {
        let description = description().with_layout(vec![
            LayoutSection::new("Connection", "db", ["host", "port"]),
            LayoutSection::new("Paging", "default", ["limit"]),
        ]);
        let layout = FormLayout::from_description(&description).unwrap();
        assert_eq!(layout.sections[0].fields.len(), 2);
        assert_eq!(layout.sections[1].fields[0].name, "limit");
    }

    #[test]
    fn test_unknown_parameter_in_layout() {
        let description =
            description().with_layout(vec![LayoutSection::new("Bad", "db", ["hostname"])]);
        let err = FormLayout::from_description(&description).unwrap_err();
        assert!(err.is_schema_violation());
        assert_eq!(err.parameter(), Some("hostname"));
    }

    #[test]
    fn test_unknown_layer_in_layout() {
        let description = description().with_layout(vec![LayoutSection::new("Bad", "auth", ["x"])]);
        assert!(matches!(
            FormLayout::from_description(&description),
            Err(ParameterError::UnknownLayer(_))
        ));
    }

    #[test]
    fn test_values_from_parsed_layers_skip_secrets() {
        let layers = fixtures::sample_layers();
        let db = layers.get("db").unwrap();
        let mut parsed_db = ParsedLayer::new("db");
        parsed_db.set(Arc::clone(db.get("host").unwrap()), Value::from("db1"), Source::Query);
        parsed_db.set(Arc::clone(db.get("password").unwrap()), Value::from("pw"), Source::Query);
        let mut parsed = ParsedLayers::new();
        parsed.insert(parsed_db);

        let layout = FormLayout::from_description(&description()).unwrap().with_values(&parsed);
        assert_eq!(layout.field("db", "host").unwrap().value.as_deref(), Some("db1"));
        assert_eq!(layout.field("db", "password").unwrap().value, None);
    }
}
