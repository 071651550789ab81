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

//! Parameter definitions and per-type coercion.
//!
//! A [`ParameterDefinition`] is built once when a command is registered and
//! is shared read-only (behind an `Arc`) by every request afterwards. It
//! knows how to turn three kinds of raw input into a typed [`Value`]:
//!
//! - string literals from a query string or form ([`parse_strings`])
//! - JSON values from a request body or a static override ([`coerce_json`])
//! - materialized file content ([`parse_files`])
//!
//! [`parse_strings`]: ParameterDefinition::parse_strings
//! [`coerce_json`]: ParameterDefinition::coerce_json
//! [`parse_files`]: ParameterDefinition::parse_files

use crate::error::{ParameterError, ParameterResult};
use crate::files::FileContent;
use crate::types::ParameterType;
use crate::value::Value;
use chrono::{DateTime, NaiveDate};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Schema entry for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub help: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl ParameterDefinition {
    /// Create an optional parameter with no default.
    pub fn new(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            help: String::new(),
            required: false,
            default: None,
            choices: Vec::new(),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Coerce string literals.
    ///
    /// Scalars accept exactly one literal. List types coerce each literal
    /// with the element type; comma splitting is the caller's job.
    pub fn parse_strings(&self, raw: &[String]) -> ParameterResult<Value> {
        let t = self.parameter_type;
        if t.is_file_backed() {
            return Err(ParameterError::invalid_value(
                &self.name,
                raw.join(","),
                "requires file content",
            ));
        }

        if t.is_list() {
            return match t {
                ParameterType::KeyValue => {
                    let mut map = IndexMap::new();
                    for item in raw {
                        let (k, v) = self.split_key_value(item)?;
                        map.insert(k, Value::String(v));
                    }
                    Ok(Value::Object(map))
                }
                _ => {
                    let element = t.element_type().unwrap_or(ParameterType::String);
                    raw.iter()
                        .map(|s| self.parse_scalar(element, s))
                        .collect::<ParameterResult<Vec<_>>>()
                        .map(Value::List)
                }
            };
        }

        match raw {
            [single] => self.parse_scalar(t, single),
            [] => Err(ParameterError::invalid_value(&self.name, "", "no value given")),
            many => Err(ParameterError::invalid_value(
                &self.name,
                many.join(","),
                "expected a single value",
            )),
        }
    }

    /// Coerce a JSON value from a request body or a static override.
    ///
    /// Arrays map to list types. A bare scalar for a list type is treated as
    /// a one-element list. File-backed types take their content directly:
    /// strings for string types, objects or arrays of objects for object
    /// types.
    pub fn coerce_json(&self, json: &JsonValue) -> ParameterResult<Value> {
        let t = self.parameter_type;
        match t {
            ParameterType::KeyValue => match json {
                JsonValue::Object(map) => Ok(Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Value::String(json_literal(v))))
                        .collect(),
                )),
                JsonValue::Array(items) => {
                    let raw: Vec<String> = items.iter().map(json_literal).collect();
                    self.parse_strings(&raw)
                }
                JsonValue::String(s) => self.parse_strings(&[s.clone()]),
                other => Err(self.type_mismatch(other, "expected key:value pairs")),
            },
            ParameterType::ObjectFromFile => match json {
                JsonValue::Object(_) => Ok(Value::from(json.clone())),
                other => Err(self.type_mismatch(other, "expected an object")),
            },
            ParameterType::ObjectListFromFile => match json {
                JsonValue::Object(_) => Ok(Value::List(vec![Value::from(json.clone())])),
                JsonValue::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        JsonValue::Object(_) => Ok(Value::from(item.clone())),
                        other => Err(self.type_mismatch(other, "expected a list of objects")),
                    })
                    .collect::<ParameterResult<Vec<_>>>()
                    .map(Value::List),
                other => Err(self.type_mismatch(other, "expected a list of objects")),
            },
            ParameterType::StringFromFile => match json {
                JsonValue::String(s) => Ok(Value::String(s.clone())),
                other => Err(self.type_mismatch(other, "expected file content")),
            },
            ParameterType::StringFromFiles | ParameterType::StringListFromFile => {
                self.coerce_json_list(json, |item| match item {
                    JsonValue::String(s) => Ok(Value::String(s.clone())),
                    other => Err(self.type_mismatch(other, "expected a string")),
                })
            }
            ParameterType::File => match json {
                JsonValue::Object(_) => Ok(Value::from(json.clone())),
                other => Err(self.type_mismatch(other, "expected file content")),
            },
            ParameterType::FileList => self.coerce_json_list(json, |item| match item {
                JsonValue::Object(_) => Ok(Value::from(item.clone())),
                other => Err(self.type_mismatch(other, "expected file content")),
            }),
            _ if t.is_list() => {
                let element = t.element_type().unwrap_or(ParameterType::String);
                self.coerce_json_list(json, |item| self.coerce_json_scalar(element, item))
            }
            _ => self.coerce_json_scalar(t, json),
        }
    }

    /// Build a value from materialized file content.
    pub fn parse_files(&self, files: &[FileContent]) -> ParameterResult<Value> {
        let name = self.name.as_str();
        match self.parameter_type {
            ParameterType::StringFromFile => {
                let file = self.single_file(files)?;
                Ok(Value::String(file.text(name)?.to_string()))
            }
            ParameterType::StringFromFiles => files
                .iter()
                .map(|f| f.text(name).map(|s| Value::String(s.to_string())))
                .collect::<ParameterResult<Vec<_>>>()
                .map(Value::List),
            ParameterType::StringListFromFile => {
                let mut lines = Vec::new();
                for file in files {
                    lines.extend(
                        file.text(name)?
                            .lines()
                            .filter(|l| !l.trim().is_empty())
                            .map(|l| Value::String(l.to_string())),
                    );
                }
                Ok(Value::List(lines))
            }
            ParameterType::ObjectFromFile => {
                let file = self.single_file(files)?;
                match file.parse_structured(name)? {
                    obj @ Value::Object(_) => Ok(obj),
                    other => Err(ParameterError::malformed_file(
                        name,
                        &file.filename,
                        format!("expected an object, found {}", other.kind()),
                    )),
                }
            }
            ParameterType::ObjectListFromFile => {
                let mut objects = Vec::new();
                for file in files {
                    match file.parse_structured(name)? {
                        obj @ Value::Object(_) => objects.push(obj),
                        Value::List(items) => {
                            for item in items {
                                if !matches!(item, Value::Object(_)) {
                                    return Err(ParameterError::malformed_file(
                                        name,
                                        &file.filename,
                                        format!("expected a list of objects, found {}", item.kind()),
                                    ));
                                }
                                objects.push(item);
                            }
                        }
                        other => {
                            return Err(ParameterError::malformed_file(
                                name,
                                &file.filename,
                                format!("expected a list of objects, found {}", other.kind()),
                            ))
                        }
                    }
                }
                Ok(Value::List(objects))
            }
            ParameterType::File => {
                let file = self.single_file(files)?;
                file_value(name, file)
            }
            ParameterType::FileList => files
                .iter()
                .map(|f| file_value(name, f))
                .collect::<ParameterResult<Vec<_>>>()
                .map(Value::List),
            other => Err(ParameterError::invalid_value(
                name,
                files
                    .iter()
                    .map(|f| f.filename.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                format!("{} parameters do not accept files", other),
            )),
        }
    }

    /// Check that an already typed value fits this definition.
    ///
    /// Used for declared defaults at registration time.
    pub fn validate(&self, value: &Value) -> ParameterResult<()> {
        let t = self.parameter_type;
        if value.is_null() {
            return Ok(());
        }
        let ok = match t {
            ParameterType::String
            | ParameterType::Secret
            | ParameterType::StringFromFile
            | ParameterType::Choice => matches!(value, Value::String(_)),
            ParameterType::Integer => matches!(value, Value::Int(_)),
            ParameterType::Float => matches!(value, Value::Float(_) | Value::Int(_)),
            ParameterType::Bool => matches!(value, Value::Bool(_)),
            ParameterType::Date => matches!(value, Value::Date(_)),
            ParameterType::KeyValue | ParameterType::ObjectFromFile | ParameterType::File => {
                matches!(value, Value::Object(_))
            }
            _ => matches!(value, Value::List(_)),
        };
        if !ok {
            return Err(ParameterError::invalid_value(
                &self.name,
                value.to_string(),
                format!("expected {}, found {}", t, value.kind()),
            ));
        }

        if t.has_choices() {
            let items: Vec<&Value> = match value {
                Value::List(items) => items.iter().collect(),
                single => vec![single],
            };
            for item in items {
                let literal = item.to_string();
                if !self.choices.iter().any(|c| *c == literal) {
                    return Err(ParameterError::invalid_choice(
                        &self.name,
                        literal,
                        &self.choices,
                    ));
                }
            }
        }
        Ok(())
    }

    fn parse_scalar(&self, t: ParameterType, raw: &str) -> ParameterResult<Value> {
        match t {
            ParameterType::String | ParameterType::Secret => Ok(Value::String(raw.to_string())),
            ParameterType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ParameterError::invalid_value(&self.name, raw, "expected an integer")),
            ParameterType::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ParameterError::invalid_value(&self.name, raw, "expected a number")),
            ParameterType::Bool => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| ParameterError::invalid_value(&self.name, raw, "expected a boolean")),
            ParameterType::Date => parse_date(raw).map(Value::Date).ok_or_else(|| {
                ParameterError::invalid_value(&self.name, raw, "expected a date (YYYY-MM-DD)")
            }),
            ParameterType::Choice => {
                if self.choices.iter().any(|c| c == raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(ParameterError::invalid_choice(&self.name, raw, &self.choices))
                }
            }
            other => Err(ParameterError::invalid_value(
                &self.name,
                raw,
                format!("{} is not a scalar type", other),
            )),
        }
    }

    fn coerce_json_scalar(&self, t: ParameterType, json: &JsonValue) -> ParameterResult<Value> {
        match (t, json) {
            (_, JsonValue::String(s)) => self.parse_scalar(t, s),
            (ParameterType::String | ParameterType::Secret, JsonValue::Number(_) | JsonValue::Bool(_)) => {
                Ok(Value::String(json.to_string()))
            }
            (ParameterType::Integer, JsonValue::Number(n)) => n
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| self.type_mismatch(json, "expected an integer")),
            (ParameterType::Float, JsonValue::Number(n)) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| self.type_mismatch(json, "expected a number")),
            (ParameterType::Bool, JsonValue::Bool(b)) => Ok(Value::Bool(*b)),
            (ParameterType::Choice, JsonValue::Number(_) | JsonValue::Bool(_)) => {
                self.parse_scalar(t, &json.to_string())
            }
            _ => Err(self.type_mismatch(json, format!("expected {}", t))),
        }
    }

    fn coerce_json_list<F>(&self, json: &JsonValue, element: F) -> ParameterResult<Value>
    where
        F: Fn(&JsonValue) -> ParameterResult<Value>,
    {
        match json {
            JsonValue::Array(items) => items
                .iter()
                .map(&element)
                .collect::<ParameterResult<Vec<_>>>()
                .map(Value::List),
            JsonValue::Null => Ok(Value::List(Vec::new())),
            single => element(single).map(|v| Value::List(vec![v])),
        }
    }

    fn split_key_value(&self, item: &str) -> ParameterResult<(String, String)> {
        match item.split_once(':') {
            Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
            _ => Err(ParameterError::invalid_value(
                &self.name,
                item,
                "expected key:value",
            )),
        }
    }

    fn single_file<'a>(&self, files: &'a [FileContent]) -> ParameterResult<&'a FileContent> {
        match files {
            [single] => Ok(single),
            [] => Err(ParameterError::invalid_value(&self.name, "", "no file given")),
            many => Err(ParameterError::invalid_value(
                &self.name,
                many.iter()
                    .map(|f| f.filename.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                "expected a single file",
            )),
        }
    }

    fn type_mismatch(&self, json: &JsonValue, reason: impl Into<String>) -> ParameterError {
        ParameterError::invalid_value(&self.name, json_literal(json), reason)
    }
}

fn file_value(parameter: &str, file: &FileContent) -> ParameterResult<Value> {
    let mut map = IndexMap::new();
    map.insert("name".to_string(), Value::String(file.filename.clone()));
    map.insert(
        "path".to_string(),
        Value::String(file.path.display().to_string()),
    );
    map.insert("size".to_string(), Value::Int(file.bytes.len() as i64));
    map.insert(
        "content".to_string(),
        Value::String(file.text(parameter)?.to_string()),
    );
    Ok(Value::Object(map))
}

/// Literal text of a JSON value for error messages: strings are unquoted.
fn json_literal(json: &JsonValue) -> String {
    match json {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}
