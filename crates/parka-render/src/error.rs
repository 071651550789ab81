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

//! Error types for rendering.

use thiserror::Error;

/// Rendering error.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The requested output format is not known.
    #[error("unknown output format '{0}'")]
    UnknownFormat(String),

    /// No template with this name exists.
    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    /// Template compilation or evaluation failed.
    #[error("template '{name}' failed: {message}")]
    Template { name: String, message: String },

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error while writing output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A form layout references something the command does not declare.
    #[error(transparent)]
    Parameter(#[from] parka_core::ParameterError),
}

impl RenderError {
    pub fn template(name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Template {
            name: name.into(),
            message: err.to_string(),
        }
    }
}

/// Result type for rendering.
pub type RenderResult<T> = Result<T, RenderError>;
