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

//! Parka server binary.
//!
//! # Usage
//!
//! ```bash
//! # Serve the demo commands on 127.0.0.1:8080
//! parka serve
//!
//! # Custom templates, static overrides and a per-request timeout
//! parka serve --template-dir templates/ --overrides overrides.yaml --timeout-secs 30
//!
//! # List the registered commands
//! parka commands
//!
//! # Debug logging
//! RUST_LOG=debug parka serve
//! ```

use clap::Parser;
use parka_server::cli::{Cli, CliCommand};
use parka_server::{demo, serve};
use std::process::ExitCode;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "parka_server=info".parse::<Directive>() {
        filter = filter.add_directive(directive);
    }
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let registry = match demo::registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: invalid command declaration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    match cli.command {
        CliCommand::Commands => match serde_json::to_string_pretty(&registry.summaries()) {
            Ok(listing) => {
                println!("{}", listing);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        CliCommand::Serve(args) => {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    eprintln!("Error: failed to start runtime: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            match runtime.block_on(serve(args.into_config(), registry)) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
