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

//! HTML page stages.
//!
//! The formatter turns rows into fragments and announces the column set on
//! a one-shot rendezvous. The renderer waits for that rendezvous, then runs
//! the template on the blocking pool; the template's row loop pulls
//! fragments straight from the formatter's channel.

use crate::error::{ExecError, ExecResult};
use crate::pipeline::Unit;
use bytes::Bytes;
use parka_core::{ColumnSet, Row};
use parka_render::{
    render_page, DataTablesFormatter, ErrorPanel, HtmlRowsFormatter, Page, PageMode, RowFormatter,
    RowSource, TemplateResolver,
};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const FLUSH_THRESHOLD: usize = 8 * 1024;

/// What the renderer learns before it starts the template.
#[derive(Debug)]
pub(crate) enum Rendezvous {
    Columns(ColumnSet),
    Empty,
    Failed(ExecError),
}

pub(crate) fn fragment_formatter(mode: PageMode) -> Box<dyn RowFormatter> {
    match mode {
        PageMode::Table => Box::new(HtmlRowsFormatter),
        PageMode::DataTables => Box::new(DataTablesFormatter::new()),
    }
}

/// Format rows into page fragments.
///
/// Failures that happen after the columns were announced go to the page's
/// error panel; earlier ones travel through the rendezvous.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn format_fragments(
    mut rows: mpsc::Receiver<Row>,
    failure: oneshot::Receiver<ExecError>,
    mut formatter: Box<dyn RowFormatter>,
    columns_tx: oneshot::Sender<Rendezvous>,
    units: mpsc::Sender<String>,
    panel: ErrorPanel,
    cancel: CancellationToken,
) -> ExecResult<()> {
    let mut columns_tx = Some(columns_tx);
    let mut columns: Option<ColumnSet> = None;

    let report = |columns_tx: &mut Option<oneshot::Sender<Rendezvous>>, err: ExecError| {
        match columns_tx.take() {
            Some(tx) => {
                let _ = tx.send(Rendezvous::Failed(err.clone()));
            }
            None => panel.set(panel_message(&err)),
        }
        err
    };

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
                if let Some(tx) = columns_tx.take() {
                    let _ = tx.send(Rendezvous::Columns(first.clone()));
                }
                if let Some(header) = formatter
                    .begin(&first)
                    .map_err(|e| report(&mut columns_tx, e.into()))?
                {
                    send_unit(&units, header).await?;
                }
                columns = Some(first.clone());
                first
            }
        };
        let unit = formatter
            .row(&row, &current)
            .map_err(|e| report(&mut columns_tx, e.into()))?;
        send_unit(&units, unit).await?;
    }

    if let Ok(err) = failure.await {
        return Err(report(&mut columns_tx, err));
    }
    if let Some(tx) = columns_tx.take() {
        let _ = tx.send(Rendezvous::Empty);
    }
    if let Some(trailer) = formatter
        .finish()
        .map_err(|e| report(&mut columns_tx, e.into()))?
    {
        send_unit(&units, trailer).await?;
    }
    Ok(())
}

fn panel_message(err: &ExecError) -> String {
    match err {
        ExecError::Command(message) => message.clone(),
        other => other.to_string(),
    }
}

async fn send_unit(units: &mpsc::Sender<String>, unit: String) -> ExecResult<()> {
    if unit.is_empty() {
        return Ok(());
    }
    units.send(unit).await.map_err(|_| ExecError::Disconnected)
}

/// Buffered writer feeding the response channel from a blocking thread.
#[derive(Debug, Clone)]
struct ChannelWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
    tx: mpsc::Sender<Unit>,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<Unit>) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::with_capacity(FLUSH_THRESHOLD))),
            tx,
        }
    }

    fn drain(&self) -> io::Result<()> {
        let chunk = {
            let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
            if buffer.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *buffer)
        };
        self.tx
            .blocking_send(Ok(Bytes::from(chunk)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let pending = {
            let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
            buffer.extend_from_slice(data);
            buffer.len()
        };
        if pending >= FLUSH_THRESHOLD {
            self.drain()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain()
    }
}

/// Fragments pulled by the template's row loop.
///
/// Whatever the template wrote so far is flushed before waiting for the next
/// fragment, so the page grows as rows arrive.
#[derive(Debug)]
struct ChannelRows {
    units: Mutex<mpsc::Receiver<String>>,
    writer: ChannelWriter,
}

impl RowSource for ChannelRows {
    fn next_unit(&self) -> Option<String> {
        let mut units = self.units.lock().unwrap_or_else(|e| e.into_inner());
        match units.try_recv() {
            Ok(unit) => return Some(unit),
            Err(mpsc::error::TryRecvError::Disconnected) => return None,
            Err(mpsc::error::TryRecvError::Empty) => {}
        }
        self.writer.drain().ok()?;
        units.blocking_recv()
    }
}

/// Render the page once the columns are known. Runs on the blocking pool.
pub(crate) fn render_streamed(
    resolver: Arc<dyn TemplateResolver>,
    page: Page,
    columns: oneshot::Receiver<Rendezvous>,
    units: mpsc::Receiver<String>,
    panel: ErrorPanel,
    out: mpsc::Sender<Unit>,
) -> ExecResult<()> {
    let page = match columns.blocking_recv() {
        Ok(Rendezvous::Columns(columns)) => page.with_columns(&columns),
        Ok(Rendezvous::Empty) => page,
        Ok(Rendezvous::Failed(err)) => {
            let _ = out.blocking_send(Err(err.clone()));
            return Err(err);
        }
        Err(_) => return Err(ExecError::Cancelled),
    };

    let mut writer = ChannelWriter::new(out.clone());
    let rows = ChannelRows {
        units: Mutex::new(units),
        writer: writer.clone(),
    };
    let rendered = render_page(resolver.as_ref(), &page, rows, &panel, writer.clone())
        .map_err(ExecError::from)
        .and_then(|()| writer.flush().map_err(|_| ExecError::Disconnected));

    match rendered {
        Ok(()) => {
            debug!(command = %page.command, "page rendered");
            Ok(())
        }
        Err(_) if out.is_closed() => Err(ExecError::Disconnected),
        Err(err) => {
            let _ = out.blocking_send(Err(err.clone()));
            Err(err)
        }
    }
}
