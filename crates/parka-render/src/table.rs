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

//! Buffered table rendering.

use crate::error::RenderResult;
use crate::format::OutputFormat;
use crate::formatter::{ascii_line, ascii_rule, formatter_for};
use parka_core::{ColumnSet, Row, Value};
use std::io::Write;

/// How columns are chosen for a buffered table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnPolicy {
    /// Columns of the first row; later extra fields are dropped.
    FirstRow,
    /// Union of all rows' columns in first-seen order.
    #[default]
    Union,
}

impl ColumnPolicy {
    pub fn columns(&self, rows: &[Row]) -> ColumnSet {
        match (self, rows.first()) {
            (_, None) => ColumnSet::empty(),
            (Self::FirstRow, Some(first)) => ColumnSet::from_row(first),
            (Self::Union, Some(_)) => ColumnSet::union_of(rows),
        }
    }
}

/// Render `rows` completely into `out`.
///
/// ASCII output is aligned to the widest cell of each column; every other
/// format goes through its streaming formatter.
pub fn write_table<W: Write>(
    format: OutputFormat,
    rows: &[Row],
    policy: ColumnPolicy,
    mut out: W,
) -> RenderResult<()> {
    let columns = policy.columns(rows);
    if format == OutputFormat::Ascii {
        out.write_all(aligned_ascii(rows, &columns).as_bytes())?;
        return Ok(out.flush()?);
    }

    let mut formatter = formatter_for(format);
    if let Some(header) = formatter.begin(&columns)? {
        out.write_all(header.as_bytes())?;
    }
    for row in rows {
        out.write_all(formatter.row(row, &columns)?.as_bytes())?;
    }
    if let Some(trailer) = formatter.finish()? {
        out.write_all(trailer.as_bytes())?;
    }
    Ok(out.flush()?)
}

/// Render `rows` completely into a string.
pub fn render_table(format: OutputFormat, rows: &[Row], policy: ColumnPolicy) -> RenderResult<String> {
    let mut buffer = Vec::with_capacity(rows.len() * 32 + 64);
    write_table(format, rows, policy, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn aligned_ascii(rows: &[Row], columns: &ColumnSet) -> String {
    if columns.is_empty() {
        return String::new();
    }
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.project(columns).map(Value::to_cell_string).collect())
        .collect();
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let header: Vec<&str> = columns.iter().collect();
    let mut out = ascii_line(&header, &widths);
    out.push_str(&ascii_rule(&widths));
    for row in &cells {
        let refs: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&ascii_line(&refs, &widths));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ragged() -> Vec<Row> {
        vec![
            Row::new().with("a", 1i64).with("b", 2i64),
            Row::new().with("b", 3i64).with("c", "long value"),
        ]
    }

    #[test]
    fn test_union_columns_for_csv() {
        let out = render_table(OutputFormat::Csv, &ragged(), ColumnPolicy::Union).unwrap();
        assert_eq!(out, "a,b,c\n1,2,\n,3,long value\n");
    }

    #[test]
    fn test_first_row_policy_drops_extra() {
        let out = render_table(OutputFormat::Csv, &ragged(), ColumnPolicy::FirstRow).unwrap();
        assert_eq!(out, "a,b\n1,2\n,3\n");
    }

    #[test]
    fn test_aligned_ascii() {
        let out = render_table(OutputFormat::Ascii, &ragged(), ColumnPolicy::Union).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "| a | b | c          |");
        assert_eq!(lines[3], "|   | 3 | long value |");
    }

    #[test]
    fn test_empty_rows() {
        assert_eq!(render_table(OutputFormat::Json, &[], ColumnPolicy::Union).unwrap(), "[]");
        assert_eq!(render_table(OutputFormat::Ascii, &[], ColumnPolicy::Union).unwrap(), "");
    }

    #[test]
    fn test_write_table_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.yaml");
        let file = std::fs::File::create(&path).unwrap();
        write_table(OutputFormat::Yaml, &ragged(), ColumnPolicy::Union, file).unwrap();
        let parsed: serde_json::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[1]["c"], "long value");
        assert!(parsed[0]["c"].is_null());
    }
}
