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

//! Parameter resolution pipeline for Parka.
//!
//! A [`Parser`] reconciles a command's declared [`ParameterLayers`] with the
//! sources a request offers: query string, form fields, uploaded files, a
//! JSON body, operator-provided [`StaticOverrides`] and declared defaults.
//!
//! Precedence, highest first:
//!
//! 1. static override
//! 2. the request source chosen for the route (query, form or JSON)
//! 3. declared default
//! 4. absence, only if the parameter is optional
//!
//! # Example
//!
//! ```
//! use parka_core::{ParameterDefinition, ParameterLayers, ParameterType, TempFileManager, Value};
//! use parka_params::{Parser, RequestInput};
//!
//! let layers = ParameterLayers::new().with_defaults(vec![
//!     ParameterDefinition::new("ids", ParameterType::IntegerList),
//!     ParameterDefinition::new("limit", ParameterType::Integer).with_default(10i64),
//! ]);
//! let input = RequestInput::from_query_string("ids[]=1&ids[]=2");
//! let temp = TempFileManager::new();
//!
//! let parsed = Parser::for_query().resolve(&layers, &input, &temp).unwrap();
//! assert_eq!(parsed.value("default", "ids"), Some(&Value::from(vec![1i64, 2])));
//! assert_eq!(parsed.value("default", "limit"), Some(&Value::Int(10)));
//! ```
//!
//! [`ParameterLayers`]: parka_core::ParameterLayers

mod ingest;
mod input;
mod overrides;
mod parser;
mod step;
mod steps;

// Re-export public API
pub use ingest::{ingest_inline, materialize};
pub use input::{collect_values, filename_hint, RequestInput, UploadedFile};
pub use overrides::{OverridesError, StaticOverrideStep, StaticOverrides};
pub use parser::Parser;
pub use step::{ParseStep, StepContext};
pub use steps::{DefaultsStep, FilteredStep, FormStep, JsonBodyStep, QueryStep, StopStep};
