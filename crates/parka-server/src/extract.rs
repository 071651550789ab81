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

//! Request body decoding into [`RequestInput`].

use crate::error::ServerError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, Method};
use parka_params::{RequestInput, UploadedFile};
use serde_json::Value as JsonValue;
use tracing::trace;

/// Which parser a request is resolved with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Query,
    Form,
    Json,
}

fn content_type(req: &Request) -> String {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Decode `req` into parameter input.
///
/// GET and HEAD read the query string. Other methods read the body by content
/// type: multipart and urlencoded forms, or a JSON object. A body-less POST
/// falls back to the query string.
pub async fn request_input(req: Request, max_body: usize) -> Result<(RequestInput, InputKind), ServerError> {
    let query = req.uri().query().unwrap_or_default().to_string();
    if req.method() == Method::GET || req.method() == Method::HEAD {
        return Ok((RequestInput::from_query_string(&query), InputKind::Query));
    }

    let kind = content_type(&req);
    trace!(content_type = %kind, "decoding request body");
    match kind.as_str() {
        "" => Ok((RequestInput::from_query_string(&query), InputKind::Query)),
        "multipart/form-data" => {
            let input = multipart_input(req).await?;
            Ok((input.with_query_string(&query), InputKind::Form))
        }
        "application/x-www-form-urlencoded" => {
            let body = read_body(req, max_body).await?;
            let text = std::str::from_utf8(&body)
                .map_err(|e| ServerError::BadRequest(format!("form body is not UTF-8: {e}")))?;
            let input = RequestInput::from_urlencoded_form(text).with_query_string(&query);
            Ok((input, InputKind::Form))
        }
        "application/json" => {
            let body = read_body(req, max_body).await?;
            let object = match serde_json::from_slice::<JsonValue>(&body) {
                Ok(JsonValue::Object(map)) => map,
                Ok(other) => {
                    return Err(ServerError::BadRequest(format!(
                        "JSON body must be an object, got {}",
                        json_kind(&other)
                    )))
                }
                Err(e) => return Err(ServerError::BadRequest(format!("malformed JSON body: {e}"))),
            };
            let input = RequestInput::from_json(object).with_query_string(&query);
            Ok((input, InputKind::Json))
        }
        other => Err(ServerError::UnsupportedMediaType(other.to_string())),
    }
}

async fn read_body(req: Request, max_body: usize) -> Result<bytes::Bytes, ServerError> {
    axum::body::to_bytes(req.into_body(), max_body)
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))
}

async fn multipart_input(req: Request) -> Result<RequestInput, ServerError> {
    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let mut input = RequestInput::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.body_text()))?;
                trace!(field = %name, filename = %filename, size = content.len(), "received upload");
                input = input.with_file(UploadedFile::new(name, filename, content.to_vec()));
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.body_text()))?;
                input = input.with_form(name, value);
            }
        }
    }
    Ok(input)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
