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

//! Server errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parka_core::ParameterError;
use parka_params::OverridesError;
use parka_render::RenderError;
use parka_stream::ExecError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// Anything a request can fail with.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No command is registered under this name.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Parameter resolution failed.
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Output format, layout or template failure.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Execution failed before any output was sent.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// A page template named by the request does not exist.
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    /// The request body type is not accepted.
    #[error("unsupported content type '{0}'")]
    UnsupportedMediaType(String),

    /// The request body could not be read or decoded.
    #[error("invalid request body: {0}")]
    BadRequest(String),

    /// The static overrides file could not be loaded.
    #[error("failed to load static overrides: {0}")]
    Overrides(#[from] OverridesError),

    /// I/O error (binding, reading configuration).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    fn parameter_error(&self) -> Option<&ParameterError> {
        match self {
            Self::Parameter(e) | Self::Render(RenderError::Parameter(e)) => Some(e),
            _ => None,
        }
    }

    /// HTTP status for this error.
    ///
    /// Bad input is a client error; schema violations mean the deployment is
    /// misconfigured and map to 500.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Parameter(e) | Self::Render(RenderError::Parameter(e)) => {
                if e.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            Self::UnknownCommand(_) | Self::UnknownTemplate(_) => StatusCode::NOT_FOUND,
            Self::Render(RenderError::UnknownFormat(_)) => StatusCode::BAD_REQUEST,
            Self::Exec(ExecError::TimedOut(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Exec(ExecError::WrongKind { .. }) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Render(_) | Self::Exec(_) | Self::Overrides(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parameter(e) | Self::Render(RenderError::Parameter(e)) => e.code(),
            Self::UnknownCommand(_) => "unknown_command",
            Self::UnknownTemplate(_) => "unknown_template",
            Self::Render(RenderError::UnknownFormat(_)) => "unknown_format",
            Self::Render(RenderError::TemplateNotFound(_) | RenderError::Template { .. }) => {
                "template_error"
            }
            Self::Render(_) => "render_error",
            Self::Exec(ExecError::TimedOut(_)) => "timeout",
            Self::Exec(ExecError::WrongKind { .. }) => "wrong_command_kind",
            Self::Exec(_) => "execution_failed",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::BadRequest(_) => "bad_request",
            Self::Overrides(_) => "config_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Parameter named by the error, if any.
    pub fn parameter(&self) -> Option<&str> {
        self.parameter_error().and_then(ParameterError::parameter)
    }
}

pub(crate) fn api_error_response(status: StatusCode, err: &ServerError) -> Response {
    let mut body = json!({
        "code": err.code(),
        "message": err.to_string(),
    });
    if let Some(parameter) = err.parameter() {
        body["parameter"] = json!(parameter);
    }
    (status, Json(json!({ "error": body }))).into_response()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), code = self.code(), error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), code = self.code(), error = %self, "request rejected");
        }
        api_error_response(status, &self)
    }
}
