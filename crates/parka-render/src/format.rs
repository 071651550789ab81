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

//! Output formats and content negotiation.

use crate::error::{RenderError, RenderResult};
use std::fmt;
use std::str::FromStr;

/// A negotiated output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Json,
    Csv,
    Tsv,
    Markdown,
    Ascii,
    Yaml,
    Html,
    Sse,
}

impl OutputFormat {
    /// Formats that can be requested by name on the data and download routes.
    pub const TABULAR: [OutputFormat; 6] = [
        OutputFormat::Json,
        OutputFormat::Csv,
        OutputFormat::Tsv,
        OutputFormat::Markdown,
        OutputFormat::Ascii,
        OutputFormat::Yaml,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Markdown => "markdown",
            Self::Ascii => "ascii",
            Self::Yaml => "yaml",
            Self::Html => "html",
            Self::Sse => "sse",
        }
    }

    /// Look up a format by name or file extension.
    pub fn from_name(name: &str) -> RenderResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "markdown" | "md" => Ok(Self::Markdown),
            "ascii" | "table" | "txt" | "text" => Ok(Self::Ascii),
            "yaml" | "yml" => Ok(Self::Yaml),
            "html" | "htm" => Ok(Self::Html),
            "sse" => Ok(Self::Sse),
            _ => Err(RenderError::UnknownFormat(name.to_string())),
        }
    }

    /// `Content-Type` header value.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Tsv => "text/tab-separated-values; charset=utf-8",
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Ascii => "text/plain; charset=utf-8",
            Self::Yaml => "application/yaml",
            Self::Html => "text/html; charset=utf-8",
            Self::Sse => "text/event-stream",
        }
    }

    /// File extension for downloads, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Markdown => "md",
            Self::Ascii => "txt",
            Self::Yaml => "yaml",
            Self::Html => "html",
            Self::Sse => "txt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
