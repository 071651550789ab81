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

//! Command-line interface for the `parka` binary.

use crate::config::{ServerConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};
use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Parka - typed commands over HTTP
#[derive(Debug, Parser)]
#[command(name = "parka")]
#[command(author, version, about = "Parka - typed commands over HTTP", long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "PARKA_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Serve the registered commands over HTTP
    Serve(ServeArgs),

    /// List the registered commands as JSON
    Commands,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "PARKA_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to bind
    #[arg(short, long, env = "PARKA_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory of templates overriding the built-in ones
    #[arg(long, env = "PARKA_TEMPLATE_DIR")]
    pub template_dir: Option<PathBuf>,

    /// YAML file of static parameter overrides
    #[arg(long, env = "PARKA_OVERRIDES")]
    pub overrides: Option<PathBuf>,

    /// Rows buffered between a command and its formatter
    #[arg(long, default_value_t = 64)]
    pub row_buffer: usize,

    /// Output chunks buffered ahead of the client
    #[arg(long, default_value_t = 16)]
    pub output_buffer: usize,

    /// Cancel executions after this many seconds
    #[arg(long, env = "PARKA_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Largest accepted request body in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

impl ServeArgs {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            template_dir: self.template_dir,
            overrides_file: self.overrides,
            row_buffer: self.row_buffer,
            output_buffer: self.output_buffer,
            timeout: self.timeout_secs.map(Duration::from_secs),
            max_body_bytes: self.max_body_bytes,
        }
    }
}
