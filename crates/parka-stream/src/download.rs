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

//! Download materialization: buffer every row, write a file, serve it.

use crate::error::{ExecError, ExecResult};
use crate::group::TaskGroup;
use crate::pipeline::PipelineConfig;
use crate::rows;
use bytes::Bytes;
use futures::Stream;
use parka_core::{ParsedLayers, Row, RowCommand, TempFileManager};
use parka_render::{write_table, ColumnPolicy, OutputFormat};
use std::io::BufWriter;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A rendered file ready to be served as an attachment.
///
/// The file is deleted once the body stream (or the download itself) is
/// dropped.
#[derive(Debug)]
pub struct Download {
    filename: String,
    format: OutputFormat,
    path: PathBuf,
    size: u64,
    file: tokio::fs::File,
    temp: TempFileManager,
}

impl Download {
    /// Suggested attachment name, `<command>.<extension>`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// `Content-Disposition` header value.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename.replace('"', ""))
    }

    /// File contents as a byte stream.
    pub fn into_stream(self) -> DownloadBody {
        DownloadBody {
            reader: ReaderStream::new(self.file),
            _temp: self.temp,
        }
    }
}

/// Body stream of a [`Download`].
///
/// Owns the temp file registry, so the file is deleted when the body is
/// dropped, whether or not it was read to the end.
#[derive(Debug)]
pub struct DownloadBody {
    reader: ReaderStream<tokio::fs::File>,
    _temp: TempFileManager,
}

impl Stream for DownloadBody {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.reader).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.reader.size_hint()
    }
}

async fn collect_rows(
    command: Arc<dyn RowCommand>,
    layers: Arc<ParsedLayers>,
    config: &PipelineConfig,
) -> ExecResult<Vec<Row>> {
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let mut group = TaskGroup::new(cancel.clone());
    let (row_tx, mut row_rx) = mpsc::channel(config.row_buffer);
    let (failure_tx, failure_rx) = oneshot::channel();
    group.spawn(
        "producer",
        rows::produce(command, layers, row_tx, failure_tx, cancel),
    );

    let mut rows = Vec::new();
    while let Some(row) = row_rx.recv().await {
        rows.push(row);
    }
    group.wait().await?;
    if let Ok(err) = failure_rx.await {
        return Err(err);
    }
    Ok(rows)
}

pub(crate) async fn materialize(
    command: Arc<dyn RowCommand>,
    layers: &ParsedLayers,
    format: OutputFormat,
    config: &PipelineConfig,
) -> ExecResult<Download> {
    let name = command.description().name.clone();
    let layers = Arc::new(layers.clone());
    let rows = match config.timeout {
        Some(limit) => tokio::time::timeout(limit, collect_rows(command, layers, config))
            .await
            .map_err(|_| ExecError::TimedOut(limit))??,
        None => collect_rows(command, layers, config).await?,
    };

    let filename = format!("{}.{}", name, format.extension());
    let temp = TempFileManager::new();
    let path = temp.create(&filename, b"")?;
    let target = path.clone();
    let row_count = rows.len();
    let size = tokio::task::spawn_blocking(move || -> ExecResult<u64> {
        let file = std::fs::File::create(&target)?;
        write_table(format, &rows, ColumnPolicy::Union, BufWriter::new(file))?;
        Ok(std::fs::metadata(&target)?.len())
    })
    .await
    .map_err(|e| ExecError::Task {
        task: "download".to_string(),
        message: e.to_string(),
    })??;

    let file = tokio::fs::File::open(&path).await?;
    debug!(command = %name, rows = row_count, bytes = size, "download materialized");
    Ok(Download {
        filename,
        format,
        path,
        size,
        file,
        temp,
    })
}
