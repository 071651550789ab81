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

//! HTTP server for Parka commands.
//!
//! Registers typed commands and exposes each of them under several routes:
//! structured data in any tabular format, server-sent events, plain text,
//! HTML pages with a parameter form, and file downloads. See [`app`] for the
//! route table.
//!
//! # Example
//!
//! ```no_run
//! use parka_server::{demo, serve, ServerConfig};
//!
//! # async fn run() -> Result<(), parka_server::ServerError> {
//! let registry = demo::registry()?;
//! serve(ServerConfig::default(), registry).await
//! # }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod extract;
pub mod registry;

pub use app::{router, serve, AppState, FORMAT_KEY, TEMPLATE_KEY};
pub use config::ServerConfig;
pub use error::ServerError;
pub use extract::{request_input, InputKind};
pub use registry::CommandRegistry;
