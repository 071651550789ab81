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

//! Producer and streaming formatter stages for row commands.

use crate::error::{ExecError, ExecResult};
use crate::pipeline::{abort, emit, emit_opt, Unit};
use parka_core::{ColumnSet, CommandError, ParsedLayers, Row, RowCommand, RowSink};
use parka_render::{RenderResult, RowFormatter};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Run `command`, sending its rows to `rows`.
///
/// A command failure is recorded in `failure` and the stage still succeeds,
/// so rows already sent are delivered before the failure is reported.
pub(crate) async fn produce(
    command: Arc<dyn RowCommand>,
    layers: Arc<ParsedLayers>,
    rows: mpsc::Sender<Row>,
    failure: oneshot::Sender<ExecError>,
    cancel: CancellationToken,
) -> ExecResult<()> {
    let name = command.description().name.clone();
    let sink = RowSink::new(rows, cancel);
    match command.run(&layers, sink).await {
        Ok(()) => Ok(()),
        Err(CommandError::Cancelled) => {
            debug!(command = %name, "command cancelled");
            Err(ExecError::Cancelled)
        }
        Err(err) => {
            error!(command = %name, error = %err, "command failed");
            let _ = failure.send(ExecError::from(err));
            Ok(())
        }
    }
}

async fn checked<T>(out: &mpsc::Sender<Unit>, result: RenderResult<T>) -> ExecResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => Err(abort(out, ExecError::from(err)).await),
    }
}

/// Drain `rows` through `formatter` into `out`.
///
/// Columns are fixed by the first row. On command failure the formatter's
/// error unit is appended when output has already started and the format
/// has one; otherwise the failure itself is sent, which either fails the
/// response before it starts or truncates it.
pub(crate) async fn format(
    mut rows: mpsc::Receiver<Row>,
    failure: oneshot::Receiver<ExecError>,
    mut formatter: Box<dyn RowFormatter>,
    out: mpsc::Sender<Unit>,
    cancel: CancellationToken,
) -> ExecResult<()> {
    let mut columns: Option<ColumnSet> = None;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecError::Cancelled),
            row = rows.recv() => row,
        };
        let Some(row) = next else { break };

        let current = match &columns {
            Some(current) => current.clone(),
            None => {
                let first = ColumnSet::from_row(&row);
                let header = checked(&out, formatter.begin(&first)).await?;
                emit_opt(&out, header).await?;
                columns = Some(first.clone());
                first
            }
        };
        let unit = checked(&out, formatter.row(&row, &current)).await?;
        emit(&out, unit).await?;
    }

    match failure.await {
        Err(_) => {
            if columns.is_none() {
                let header = checked(&out, formatter.begin(&ColumnSet::empty())).await?;
                emit_opt(&out, header).await?;
            }
            let trailer = checked(&out, formatter.finish()).await?;
            emit_opt(&out, trailer).await
        }
        Ok(err) => {
            let message = match &err {
                ExecError::Command(message) => message.clone(),
                other => other.to_string(),
            };
            match formatter.error(&message) {
                Some(unit) if columns.is_some() => emit(&out, unit).await?,
                _ => {
                    abort(&out, err.clone()).await;
                }
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parka_render::{formatter_for, OutputFormat};

    async fn run_format(rows: Vec<Row>, failure: Option<ExecError>, output: OutputFormat) -> (Vec<Unit>, ExecResult<()>) {
        let (row_tx, row_rx) = mpsc::channel(8);
        let (failure_tx, failure_rx) = oneshot::channel();
        let (out_tx, mut out_rx) = mpsc::channel(32);
        for row in rows {
            row_tx.send(row).await.unwrap();
        }
        drop(row_tx);
        match failure {
            Some(err) => failure_tx.send(err).unwrap(),
            None => drop(failure_tx),
        }

        let result = format(row_rx, failure_rx, formatter_for(output), out_tx, CancellationToken::new()).await;
        let mut units = Vec::new();
        while let Some(unit) = out_rx.recv().await {
            units.push(unit);
        }
        (units, result)
    }

    fn text(units: &[Unit]) -> String {
        units
            .iter()
            .filter_map(|u| u.as_ref().ok())
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_json_units_in_order() {
        let rows = vec![Row::new().with("n", 1i64), Row::new().with("n", 2i64)];
        let (units, result) = run_format(rows, None, OutputFormat::Json).await;
        assert!(result.is_ok());
        assert_eq!(units.len(), 4);
        assert_eq!(text(&units), "[\n{\"n\":1},\n{\"n\":2}\n]");
    }

    #[tokio::test]
    async fn test_empty_output_still_valid() {
        let (units, result) = run_format(Vec::new(), None, OutputFormat::Json).await;
        assert!(result.is_ok());
        assert_eq!(text(&units), "[]");
    }

    #[tokio::test]
    async fn test_failure_before_rows_is_first_unit() {
        let err = ExecError::Command("no rows".into());
        let (units, result) = run_format(Vec::new(), Some(err.clone()), OutputFormat::Sse).await;
        assert_eq!(result, Err(err.clone()));
        assert_eq!(units, vec![Err(err)]);
    }

    #[tokio::test]
    async fn test_failure_after_rows_uses_error_unit() {
        let rows = vec![Row::new().with("n", 1i64)];
        let err = ExecError::Command("late".into());
        let (units, result) = run_format(rows, Some(err), OutputFormat::Sse).await;
        assert!(result.is_err());
        let body = text(&units);
        assert!(body.starts_with("data: {\"n\":1}\n\n"));
        assert!(body.ends_with("event: error\ndata: {\"error\":\"late\"}\n\n"));
        assert!(units.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_failure_after_rows_truncates_csv() {
        let rows = vec![Row::new().with("n", 1i64)];
        let err = ExecError::Command("late".into());
        let (units, _) = run_format(rows, Some(err.clone()), OutputFormat::Csv).await;
        assert_eq!(text(&units), "n\n1\n");
        assert_eq!(units.last(), Some(&Err(err)));
    }

    #[tokio::test]
    async fn test_cancelled_formatter_stops() {
        let (_row_tx, row_rx) = mpsc::channel::<Row>(1);
        let (_failure_tx, failure_rx) = oneshot::channel();
        let (out_tx, _out_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = format(row_rx, failure_rx, formatter_for(OutputFormat::Json), out_tx, cancel).await;
        assert_eq!(result, Err(ExecError::Cancelled));
    }
}
