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

//! File content handed to file-backed parameters.

use crate::error::{ParameterError, ParameterResult};
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// Structured content format, chosen from a filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredFormat {
    Json,
    Yaml,
}

impl StructuredFormat {
    /// Sniff the format from `filename`.
    ///
    /// Only `.json`, `.yaml` and `.yml` are recognized (case-insensitive).
    pub fn from_filename(parameter: &str, filename: &str) -> ParameterResult<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(ParameterError::UnsupportedFile {
                name: parameter.to_string(),
                filename: filename.to_string(),
            }),
        }
    }

    /// Guess the format of inline content that came without a filename.
    pub fn sniff_content(content: &str) -> Self {
        match content.trim_start().chars().next() {
            Some('{') | Some('[') => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// Conventional extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    /// Parse `content` into a value.
    pub fn parse(&self, parameter: &str, filename: &str, content: &str) -> ParameterResult<Value> {
        let json: JsonValue = match self {
            Self::Json => serde_json::from_str(content)
                .map_err(|e| ParameterError::malformed_file(parameter, filename, e))?,
            Self::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ParameterError::malformed_file(parameter, filename, e))?,
        };
        Ok(Value::from(json))
    }
}

/// A file materialized on disk for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct FileContent {
    /// Name the client gave the file (upload filename or hint).
    pub filename: String,
    /// Location of the temp file holding the content.
    pub path: PathBuf,
    /// The raw content.
    pub bytes: Vec<u8>,
}

impl FileContent {
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
            bytes,
        }
    }

    /// Content decoded as UTF-8.
    pub fn text(&self, parameter: &str) -> ParameterResult<&str> {
        std::str::from_utf8(&self.bytes)
            .map_err(|e| ParameterError::malformed_file(parameter, &self.filename, e))
    }

    /// Parse structured content, sniffing the format from the filename.
    pub fn parse_structured(&self, parameter: &str) -> ParameterResult<Value> {
        let format = StructuredFormat::from_filename(parameter, &self.filename)?;
        format.parse(parameter, &self.filename, self.text(parameter)?)
    }
}
