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

//! Incremental row formatters.
//!
//! A [`RowFormatter`] turns one row at a time into a unit of wire text, so
//! output can be flushed while the command is still running. The calling
//! sequence is always:
//!
//! ```text
//! begin(columns) -> row(r1) -> row(r2) -> ... -> finish() | error(msg)
//! ```
//!
//! `begin` receives the columns of the first row (or an empty set when the
//! command produced nothing). Rows are projected onto those columns: extra
//! fields are dropped and missing ones render empty.

use crate::error::RenderResult;
use crate::format::OutputFormat;
use parka_core::{ColumnSet, Row, Value};

/// Serializes rows for one output format.
pub trait RowFormatter: Send {
    /// Text emitted before the first row.
    fn begin(&mut self, columns: &ColumnSet) -> RenderResult<Option<String>>;

    /// Text for one row.
    fn row(&mut self, row: &Row, columns: &ColumnSet) -> RenderResult<String>;

    /// Text emitted after the last row.
    fn finish(&mut self) -> RenderResult<Option<String>>;

    /// Inline error unit, if the format has one.
    fn error(&mut self, _message: &str) -> Option<String> {
        None
    }
}

/// The streaming formatter for `format`.
pub fn formatter_for(format: OutputFormat) -> Box<dyn RowFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonArrayFormatter::new()),
        OutputFormat::Csv => Box::new(DelimitedFormatter::new(b',')),
        OutputFormat::Tsv => Box::new(DelimitedFormatter::new(b'\t')),
        OutputFormat::Markdown => Box::new(MarkdownFormatter::new()),
        OutputFormat::Ascii => Box::new(AsciiFormatter::new()),
        OutputFormat::Yaml => Box::new(YamlFormatter::new()),
        OutputFormat::Html => Box::new(HtmlRowsFormatter),
        OutputFormat::Sse => Box::new(SseFormatter),
    }
}

fn projected_json(row: &Row, columns: &ColumnSet) -> serde_json::Value {
    serde_json::Value::Object(
        columns
            .iter()
            .zip(row.project(columns))
            .map(|(c, v)| (c.to_string(), v.to_json()))
            .collect(),
    )
}

// ==================== JSON ====================

/// A JSON array of objects, one element per row.
#[derive(Debug, Default)]
pub struct JsonArrayFormatter {
    rows: usize,
}

impl JsonArrayFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowFormatter for JsonArrayFormatter {
    fn begin(&mut self, _columns: &ColumnSet) -> RenderResult<Option<String>> {
        Ok(Some("[".to_string()))
    }

    fn row(&mut self, row: &Row, columns: &ColumnSet) -> RenderResult<String> {
        let json = serde_json::to_string(&projected_json(row, columns))?;
        self.rows += 1;
        Ok(if self.rows == 1 {
            format!("\n{}", json)
        } else {
            format!(",\n{}", json)
        })
    }

    fn finish(&mut self) -> RenderResult<Option<String>> {
        Ok(Some(if self.rows == 0 { "]".into() } else { "\n]".into() }))
    }
}

/// Comma-separated JSON objects for inlining in a page script.
///
/// Produces no brackets; the template supplies them. `</` is escaped so a
/// value cannot close the surrounding `<script>` element.
#[derive(Debug, Default)]
pub struct DataTablesFormatter {
    rows: usize,
}

impl DataTablesFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowFormatter for DataTablesFormatter {
    fn begin(&mut self, _columns: &ColumnSet) -> RenderResult<Option<String>> {
        Ok(None)
    }

    fn row(&mut self, row: &Row, columns: &ColumnSet) -> RenderResult<String> {
        let json = serde_json::to_string(&projected_json(row, columns))?.replace("</", "<\\/");
        self.rows += 1;
        Ok(if self.rows == 1 { json } else { format!(",{}", json) })
    }

    fn finish(&mut self) -> RenderResult<Option<String>> {
        Ok(None)
    }
}

// ==================== Delimited ====================

/// CSV or TSV through the `csv` crate.
///
/// Each unit is written by a fresh writer so its bytes can be handed out
/// as soon as the record is complete.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedFormatter {
    delimiter: u8,
}

impl DelimitedFormatter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    fn record<I, T>(&self, fields: I) -> RenderResult<String>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(Vec::new());
        writer.write_record(fields)?;
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl RowFormatter for DelimitedFormatter {
    fn begin(&mut self, columns: &ColumnSet) -> RenderResult<Option<String>> {
        if columns.is_empty() {
            return Ok(None);
        }
        self.record(columns.iter()).map(Some)
    }

    fn row(&mut self, row: &Row, columns: &ColumnSet) -> RenderResult<String> {
        let record: Vec<String> = row.project(columns).map(Value::to_cell_string).collect();
        self.record(&record)
    }

    fn finish(&mut self) -> RenderResult<Option<String>> {
        Ok(None)
    }
}

// ==================== Markdown / ASCII ====================

fn markdown_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

/// A GitHub-flavored Markdown table.
#[derive(Debug, Default)]
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl RowFormatter for MarkdownFormatter {
    fn begin(&mut self, columns: &ColumnSet) -> RenderResult<Option<String>> {
        if columns.is_empty() {
            return Ok(None);
        }
        let header: Vec<String> = columns.iter().map(markdown_cell).collect();
        let rule: Vec<&str> = columns.iter().map(|_| "---").collect();
        Ok(Some(format!(
            "| {} |\n| {} |\n",
            header.join(" | "),
            rule.join(" | ")
        )))
    }

    fn row(&mut self, row: &Row, columns: &ColumnSet) -> RenderResult<String> {
        let cells: Vec<String> = row
            .project(columns)
            .map(|v| markdown_cell(&v.to_cell_string()))
            .collect();
        Ok(format!("| {} |\n", cells.join(" | ")))
    }

    fn finish(&mut self) -> RenderResult<Option<String>> {
        Ok(None)
    }

    fn error(&mut self, message: &str) -> Option<String> {
        Some(format!("\n**Error:** {}\n", message))
    }
}

/// A plain text table.
///
/// Streaming output cannot know later widths, so columns are padded to the
/// header width only. [`crate::render_table`] produces a fully aligned table
/// for buffered output.
#[derive(Debug, Default)]
pub struct AsciiFormatter {
    widths: Vec<usize>,
}

impl AsciiFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowFormatter for AsciiFormatter {
    fn begin(&mut self, columns: &ColumnSet) -> RenderResult<Option<String>> {
        if columns.is_empty() {
            return Ok(None);
        }
        self.widths = columns.iter().map(|c| c.chars().count()).collect();
        let header: Vec<&str> = columns.iter().collect();
        Ok(Some(ascii_line(&header, &self.widths) + &ascii_rule(&self.widths)))
    }

    fn row(&mut self, row: &Row, columns: &ColumnSet) -> RenderResult<String> {
        let cells: Vec<String> = row.project(columns).map(Value::to_cell_string).collect();
        let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
        Ok(ascii_line(&cells, &self.widths))
    }

    fn finish(&mut self) -> RenderResult<Option<String>> {
        Ok(None)
    }

    fn error(&mut self, message: &str) -> Option<String> {
        Some(format!("\nerror: {}\n", message))
    }
}

pub(crate) fn ascii_line(cells: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let width = widths.get(i).copied().unwrap_or(0);
            format!("{:<width$}", c, width = width)
        })
        .collect();
    format!("| {} |\n", padded.join(" | "))
}

pub(crate) fn ascii_rule(widths: &[usize]) -> String {
    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    format!("|-{}-|\n", dashes.join("-+-"))
}

// ==================== YAML ====================

/// A YAML sequence of mappings.
#[derive(Debug, Default)]
pub struct YamlFormatter {
    rows: usize,
}

impl YamlFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowFormatter for YamlFormatter {
    fn begin(&mut self, _columns: &ColumnSet) -> RenderResult<Option<String>> {
        Ok(None)
    }

    fn row(&mut self, row: &Row, columns: &ColumnSet) -> RenderResult<String> {
        self.rows += 1;
        Ok(serde_yaml::to_string(&[projected_json(row, columns)])?)
    }

    fn finish(&mut self) -> RenderResult<Option<String>> {
        Ok(if self.rows == 0 {
            Some("[]\n".to_string())
        } else {
            None
        })
    }

    fn error(&mut self, message: &str) -> Option<String> {
        Some(format!("# error: {}\n", message.replace('\n', " ")))
    }
}

// ==================== HTML / SSE ====================

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// `<tr>` fragments for a server-rendered table body.
///
/// Errors are shown by the page's error panel, not inline.
#[derive(Debug, Default)]
pub struct HtmlRowsFormatter;

impl RowFormatter for HtmlRowsFormatter {
    fn begin(&mut self, _columns: &ColumnSet) -> RenderResult<Option<String>> {
        Ok(None)
    }

    fn row(&mut self, row: &Row, columns: &ColumnSet) -> RenderResult<String> {
        let mut out = String::from("<tr>");
        for value in row.project(columns) {
            out.push_str("<td>");
            out.push_str(&escape_html(&value.to_cell_string()));
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
        Ok(out)
    }

    fn finish(&mut self) -> RenderResult<Option<String>> {
        Ok(None)
    }
}

/// Server-Sent Events: `data: <json-row>\n\n` per row.
#[derive(Debug, Default)]
pub struct SseFormatter;

impl RowFormatter for SseFormatter {
    fn begin(&mut self, _columns: &ColumnSet) -> RenderResult<Option<String>> {
        Ok(None)
    }

    fn row(&mut self, row: &Row, columns: &ColumnSet) -> RenderResult<String> {
        Ok(format!(
            "data: {}\n\n",
            serde_json::to_string(&projected_json(row, columns))?
        ))
    }

    fn finish(&mut self) -> RenderResult<Option<String>> {
        Ok(None)
    }

    fn error(&mut self, message: &str) -> Option<String> {
        let payload = serde_json::json!({ "error": message });
        Some(format!("event: error\ndata: {}\n\n", payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Row> {
        vec![
            Row::new().with("n", 1i64).with("name", "a,b"),
            Row::new().with("n", 2i64).with("extra", true),
        ]
    }

    fn run(format: OutputFormat) -> String {
        let rows = rows();
        let columns = ColumnSet::from_row(&rows[0]);
        let mut formatter = formatter_for(format);
        let mut out = String::new();
        if let Some(header) = formatter.begin(&columns).unwrap() {
            out.push_str(&header);
        }
        for row in &rows {
            out.push_str(&formatter.row(row, &columns).unwrap());
        }
        if let Some(trailer) = formatter.finish().unwrap() {
            out.push_str(&trailer);
        }
        out
    }

    #[test]
    fn test_json_array_uses_first_row_columns() {
        let out = run(OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([{"n": 1, "name": "a,b"}, {"n": 2, "name": null}])
        );
    }

    #[test]
    fn test_json_array_empty() {
        let mut formatter = JsonArrayFormatter::new();
        let begin = formatter.begin(&ColumnSet::empty()).unwrap().unwrap();
        let end = formatter.finish().unwrap().unwrap();
        assert_eq!(format!("{}{}", begin, end), "[]");
    }

    #[test]
    fn test_csv_quotes_and_header() {
        assert_eq!(run(OutputFormat::Csv), "n,name\n1,\"a,b\"\n2,\n");
        assert_eq!(run(OutputFormat::Tsv), "n\tname\n1\ta,b\n2\t\n");
    }

    #[test]
    fn test_csv_units_are_complete_records() {
        let columns = ColumnSet::new(["a", "b"]);
        let mut formatter = DelimitedFormatter::new(b',');
        let header = formatter.begin(&columns).unwrap().unwrap();
        let first = formatter.row(&Row::new().with("a", "x\ny").with("b", 1i64), &columns).unwrap();
        let second = formatter.row(&Row::new().with("a", "z"), &columns).unwrap();
        assert_eq!(header, "a,b\n");
        assert_eq!(first, "\"x\ny\",1\n");
        assert_eq!(second, "z,\n");
    }

    #[test]
    fn test_markdown() {
        let out = run(OutputFormat::Markdown);
        assert!(out.starts_with("| n | name |\n| --- | --- |\n"));
        assert!(out.contains("| 1 | a,b |\n"));
    }

    #[test]
    fn test_ascii_header_and_rule() {
        let out = run(OutputFormat::Ascii);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "| n | name |");
        assert_eq!(lines[1], "|---+------|");
        assert_eq!(lines[2], "| 1 | a,b  |");
    }

    #[test]
    fn test_yaml_sequence() {
        let out = run(OutputFormat::Yaml);
        let parsed: serde_json::Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(parsed[1]["n"], 2);
        assert_eq!(YamlFormatter::new().finish().unwrap().as_deref(), Some("[]\n"));
    }

    #[test]
    fn test_sse_framing_and_error() {
        let out = run(OutputFormat::Sse);
        assert!(out.starts_with("data: {\"n\":1,\"name\":\"a,b\"}\n\n"));
        assert_eq!(out.matches("\n\n").count(), 2);

        let err = SseFormatter.error("boom").unwrap();
        assert_eq!(err, "event: error\ndata: {\"error\":\"boom\"}\n\n");
    }

    #[test]
    fn test_html_rows_escape() {
        let columns = ColumnSet::new(["v"]);
        let row = Row::new().with("v", "<b>&</b>");
        let out = HtmlRowsFormatter.row(&row, &columns).unwrap();
        assert_eq!(out, "<tr><td>&lt;b&gt;&amp;&lt;/b&gt;</td></tr>\n");
    }

    #[test]
    fn test_datatables_fragments() {
        let columns = ColumnSet::new(["v"]);
        let mut formatter = DataTablesFormatter::new();
        let first = formatter.row(&Row::new().with("v", "</script>"), &columns).unwrap();
        let second = formatter.row(&Row::new().with("v", "x"), &columns).unwrap();
        assert_eq!(first, r#"{"v":"<\/script>"}"#);
        assert_eq!(second, r#",{"v":"x"}"#);
    }

    #[test]
    fn test_error_units() {
        assert!(formatter_for(OutputFormat::Json).error("x").is_none());
        assert!(formatter_for(OutputFormat::Csv).error("x").is_none());
        assert!(formatter_for(OutputFormat::Ascii).error("x").unwrap().contains("x"));
    }
}
