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

//! Server configuration.

use parka_stream::PipelineConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default request body limit (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for [`crate::serve`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: IpAddr,

    /// Port to bind.
    pub port: u16,

    /// Directory of templates overriding the built-in ones.
    ///
    /// Files named like a built-in template (`base.html`, `command.html`,
    /// `index.html`) replace it; other `*.html` files become available as
    /// custom page templates. Reloadable at runtime.
    pub template_dir: Option<PathBuf>,

    /// YAML file of static parameter overrides (`layer -> name -> value`).
    pub overrides_file: Option<PathBuf>,

    /// Rows buffered between a command and its formatter.
    pub row_buffer: usize,

    /// Output units buffered ahead of the client.
    pub output_buffer: usize,

    /// Cancel executions running longer than this.
    pub timeout: Option<Duration>,

    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            template_dir: None,
            overrides_file: None,
            row_buffer: pipeline.row_buffer,
            output_buffer: pipeline.output_buffer,
            timeout: pipeline.timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Channel sizes and limits for the execution pipeline. Buffers are at
    /// least one slot.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            row_buffer: self.row_buffer.max(1),
            output_buffer: self.output_buffer.max(1),
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.pipeline_config(), PipelineConfig::default());
    }

    #[test]
    fn test_zero_buffers_are_clamped() {
        let config = ServerConfig {
            row_buffer: 0,
            output_buffer: 0,
            ..Default::default()
        };
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.row_buffer, 1);
        assert_eq!(pipeline.output_buffer, 1);
    }
}
