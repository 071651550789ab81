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

//! Error types for parameter resolution and command execution.
//!
//! Resolution errors fall into four groups:
//!
//! - **Schema violations**: a static override or layout references a
//!   parameter or layer the command never declared. These are programming or
//!   deployment mistakes and map to server errors.
//! - **Missing required parameters**: nothing set a required parameter.
//! - **Invalid values**: coercion or validation failed for a literal.
//! - **Unsupported file content**: an unknown extension or a malformed
//!   JSON/YAML payload.

use thiserror::Error;

/// Error raised while resolving parameters.
///
/// # Examples
///
/// ```
/// use parka_core::ParameterError;
///
/// let err = ParameterError::invalid_choice("choice", "bogus", &["a".to_string(), "b".to_string()]);
/// assert_eq!(err.parameter(), Some("choice"));
/// assert!(err.to_string().contains("bogus"));
/// assert!(err.is_client_error());
/// ```
#[derive(Error, Debug)]
pub enum ParameterError {
    /// A static override or layout section references an undeclared parameter.
    #[error("unknown parameter '{name}' in layer '{layer}'")]
    UnknownParameter { layer: String, name: String },

    /// A layer slug that the command does not declare.
    #[error("unknown parameter layer '{0}'")]
    UnknownLayer(String),

    /// A required parameter had no source.
    #[error("missing required parameter '{name}' in layer '{layer}'")]
    MissingRequired { layer: String, name: String },

    /// A literal could not be coerced to the parameter type.
    #[error("invalid value '{value}' for parameter '{name}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    /// A literal is not part of the declared choice set.
    #[error("invalid value '{value}' for parameter '{name}': expected one of {}", choices.join(", "))]
    InvalidChoice {
        name: String,
        value: String,
        choices: Vec<String>,
    },

    /// The file extension cannot be sniffed to a structured format.
    #[error("unsupported file '{filename}' for parameter '{name}': expected .json, .yaml or .yml")]
    UnsupportedFile { name: String, filename: String },

    /// The file content could not be parsed.
    #[error("malformed file '{filename}' for parameter '{name}': {reason}")]
    MalformedFile {
        name: String,
        filename: String,
        reason: String,
    },

    /// I/O error while materializing file content.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParameterError {
    /// Create an invalid value error.
    pub fn invalid_value(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid choice error.
    pub fn invalid_choice(name: impl Into<String>, value: impl Into<String>, choices: &[String]) -> Self {
        Self::InvalidChoice {
            name: name.into(),
            value: value.into(),
            choices: choices.to_vec(),
        }
    }

    /// Create a missing required parameter error.
    pub fn missing(layer: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingRequired {
            layer: layer.into(),
            name: name.into(),
        }
    }

    /// Create an unknown parameter error.
    pub fn unknown_parameter(layer: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownParameter {
            layer: layer.into(),
            name: name.into(),
        }
    }

    /// Create a malformed file error.
    pub fn malformed_file(
        name: impl Into<String>,
        filename: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::MalformedFile {
            name: name.into(),
            filename: filename.into(),
            reason: reason.to_string(),
        }
    }

    /// Name of the parameter involved, if any.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::UnknownParameter { name, .. }
            | Self::MissingRequired { name, .. }
            | Self::InvalidValue { name, .. }
            | Self::InvalidChoice { name, .. }
            | Self::UnsupportedFile { name, .. }
            | Self::MalformedFile { name, .. } => Some(name),
            Self::UnknownLayer(_) | Self::Io(_) => None,
        }
    }

    /// Whether the request (rather than the deployment) is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingRequired { .. }
                | Self::InvalidValue { .. }
                | Self::InvalidChoice { .. }
                | Self::UnsupportedFile { .. }
                | Self::MalformedFile { .. }
        )
    }

    /// Whether this is a schema violation.
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Self::UnknownParameter { .. } | Self::UnknownLayer(_))
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownParameter { .. } | Self::UnknownLayer(_) => "schema_violation",
            Self::MissingRequired { .. } => "missing_parameter",
            Self::InvalidValue { .. } | Self::InvalidChoice { .. } => "invalid_value",
            Self::UnsupportedFile { .. } | Self::MalformedFile { .. } => "unsupported_file",
            Self::Io(_) => "io_error",
        }
    }
}

/// Result type for parameter operations.
pub type ParameterResult<T> = Result<T, ParameterError>;

/// Error reported by a command's business logic.
///
/// Cloneable so the pipeline can both record it for the response and hand it
/// to an inline error panel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// The command failed.
    #[error("{0}")]
    Failed(String),

    /// The command was cancelled (client gone, timeout, sibling failure).
    #[error("command cancelled")]
    Cancelled,
}

impl CommandError {
    /// Create a failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        Self::Failed(err.to_string())
    }
}

impl From<ParameterError> for CommandError {
    fn from(err: ParameterError) -> Self {
        Self::Failed(err.to_string())
    }
}
