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

//! Shared test fixtures and utilities for Parka crates.
//!
//! # Quick Start
//!
//! ```rust
//! use parka_test::fixtures;
//!
//! let layers = fixtures::sample_layers();
//! let input = fixtures::query("limit=5&choice=a");
//! let (command, numbers) = fixtures::numbers_command();
//! assert_eq!(command.name(), "numbers");
//! assert_eq!(numbers.runs(), 0);
//! # let _ = (layers, input);
//! ```

pub mod fixtures;

use parka_core::Row;

/// Column values of `rows` for `column`, as JSON.
pub fn column(rows: &[Row], column: &str) -> Vec<serde_json::Value> {
    rows.iter()
        .map(|r| r.get(column).map(|v| v.to_json()).unwrap_or(serde_json::Value::Null))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parka_core::{CommandError, ParsedLayers, RowCommand, RowSink};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    async fn collect(command: &dyn RowCommand, layers: &ParsedLayers) -> (Vec<Row>, Result<(), CommandError>) {
        let (tx, mut rx) = mpsc::channel(16);
        let sink = RowSink::new(tx, CancellationToken::new());
        let result = command.run(layers, sink).await;
        let mut rows = Vec::new();
        while let Some(row) = rx.recv().await {
            rows.push(row);
        }
        (rows, result)
    }

    #[tokio::test]
    async fn test_numbers_defaults_to_three_rows() {
        let command = fixtures::NumbersCommand::new();
        let (rows, result) = collect(&command, &ParsedLayers::new()).await;
        assert!(result.is_ok());
        assert_eq!(column(&rows, "n"), vec![1, 2, 3]);
        assert_eq!(command.runs(), 1);
    }

    #[tokio::test]
    async fn test_ragged_rows() {
        let command = fixtures::RaggedCommand::new();
        let (rows, _) = collect(&command, &ParsedLayers::new()).await;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].columns().collect::<Vec<_>>(), vec!["b", "c"]);
    }
}
