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

//! Request input builders.

use parka_params::{RequestInput, UploadedFile};
use serde_json::Value as JsonValue;

/// Input from a raw query string.
pub fn query(raw: &str) -> RequestInput {
    RequestInput::from_query_string(raw)
}

/// Input from a JSON object body.
///
/// # Panics
///
/// Panics if `body` is not an object.
pub fn json(body: JsonValue) -> RequestInput {
    match body {
        JsonValue::Object(map) => RequestInput::from_json(map),
        other => panic!("fixture JSON body must be an object, got {}", other),
    }
}

/// Input from urlencoded form fields.
pub fn form(fields: &[(&str, &str)]) -> RequestInput {
    fields
        .iter()
        .fold(RequestInput::new(), |input, (k, v)| input.with_form(*k, *v))
}

/// Input carrying one uploaded file.
pub fn upload(field: &str, filename: &str, content: &str) -> RequestInput {
    RequestInput::new().with_file(UploadedFile::new(field, filename, content.as_bytes()))
}
