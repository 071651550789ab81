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

//! Raw request input, independent of the web framework.

use parka_core::ParameterType;
use serde_json::{Map, Value as JsonValue};
use url::form_urlencoded;

/// A file part from a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// Form field name.
    pub field: String,
    /// Client-side filename.
    pub filename: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(field: impl Into<String>, filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            field: field.into(),
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Everything a request can contribute to parameter resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInput {
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub files: Vec<UploadedFile>,
    pub json: Option<Map<String, JsonValue>>,
}

impl RequestInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw query string (`a=1&b[]=2`).
    pub fn from_query_string(query: &str) -> Self {
        Self {
            query: decode_pairs(query),
            ..Self::default()
        }
    }

    /// Decode an `application/x-www-form-urlencoded` body.
    pub fn from_urlencoded_form(body: &str) -> Self {
        Self {
            form: decode_pairs(body),
            ..Self::default()
        }
    }

    /// Use a JSON object as the body.
    pub fn from_json(body: Map<String, JsonValue>) -> Self {
        Self {
            json: Some(body),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    /// Merge query pairs into an existing input (a POST may carry both).
    pub fn with_query_string(mut self, query: &str) -> Self {
        self.query.extend(decode_pairs(query));
        self
    }

    /// Uploaded files for `name` or `name[]`, in upload order.
    pub fn files_for(&self, name: &str) -> Vec<&UploadedFile> {
        self.files
            .iter()
            .filter(|f| f.field == name || is_bracketed(&f.field, name))
            .collect()
    }

    /// JSON body value for `name`; `null` counts as absent.
    pub fn json_value(&self, name: &str) -> Option<&JsonValue> {
        self.json
            .as_ref()
            .and_then(|body| body.get(name))
            .filter(|v| !v.is_null())
    }
}

fn decode_pairs(raw: &str) -> Vec<(String, String)> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn is_bracketed(key: &str, name: &str) -> bool {
    key.strip_suffix("[]") == Some(name)
}

/// Raw string values for `name` among `pairs`.
///
/// `name[]` entries are taken verbatim. A plain `name` entry is split on
/// commas when `split_lists` is set and the type is a list. Empty strings are
/// ignored; `None` means the parameter was not supplied.
pub fn collect_values(
    pairs: &[(String, String)],
    name: &str,
    parameter_type: ParameterType,
    split_lists: bool,
) -> Option<Vec<String>> {
    let mut values = Vec::new();
    for (key, value) in pairs {
        if is_bracketed(key, name) {
            if !value.is_empty() {
                values.push(value.clone());
            }
        } else if key == name {
            if split_lists && parameter_type.is_list() {
                values.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
            } else if !value.is_empty() {
                values.push(value.clone());
            }
        }
    }
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// First `<name>.filename` hint among `pairs`.
pub fn filename_hint<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    let key = format!("{}.filename", name);
    pairs
        .iter()
        .find(|(k, v)| *k == key && !v.is_empty())
        .map(|(_, v)| v.as_str())
}
