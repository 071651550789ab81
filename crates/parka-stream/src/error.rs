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

//! Error types for command execution.

use parka_core::CommandError;
use parka_render::RenderError;
use std::time::Duration;
use thiserror::Error;

/// Execution error.
///
/// Errors travel through the output channel as well as out of tasks, so
/// every variant carries plain text and the type is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    /// The command returned an error.
    #[error("command failed: {0}")]
    Command(String),

    /// Formatting or template rendering failed.
    #[error("rendering failed: {0}")]
    Render(String),

    /// I/O failure while materializing output.
    #[error("IO error: {0}")]
    Io(String),

    /// The execution was cancelled.
    #[error("execution cancelled")]
    Cancelled,

    /// The configured execution timeout elapsed.
    #[error("execution timed out after {0:?}")]
    TimedOut(Duration),

    /// The response consumer went away.
    #[error("client disconnected")]
    Disconnected,

    /// The command's kind cannot serve this output.
    #[error("command '{command}' is a {kind} command; {expected} required")]
    WrongKind {
        command: String,
        kind: &'static str,
        expected: &'static str,
    },

    /// A pipeline task panicked or was aborted.
    #[error("task '{task}' failed: {message}")]
    Task { task: String, message: String },
}

impl ExecError {
    /// Whether this error only reflects a stop requested from outside.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Disconnected)
    }
}

impl From<CommandError> for ExecError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Cancelled => Self::Cancelled,
            other => Self::Command(other.to_string()),
        }
    }
}

impl From<RenderError> for ExecError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Self::Disconnected,
            other => Self::Render(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ExecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for execution.
pub type ExecResult<T> = Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_error() {
        assert_eq!(ExecError::from(CommandError::Cancelled), ExecError::Cancelled);
        let err = ExecError::from(CommandError::failed("boom"));
        assert!(matches!(err, ExecError::Command(ref m) if m.contains("boom")));
        assert!(!err.is_cancellation());
    }

    #[test]
    fn test_broken_pipe_is_disconnect() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert_eq!(ExecError::from(RenderError::Io(io)), ExecError::Disconnected);
    }
}
