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

//! Writer command stages: raw text passes straight through.

use crate::error::{ExecError, ExecResult};
use crate::pipeline::{abort, emit, Unit};
use parka_core::{CommandError, ParsedLayers, TextSink, WriterCommand};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::error;

pub(crate) async fn produce(
    command: Arc<dyn WriterCommand>,
    layers: Arc<ParsedLayers>,
    chunks: mpsc::Sender<String>,
    failure: oneshot::Sender<ExecError>,
    cancel: CancellationToken,
) -> ExecResult<()> {
    let sink = TextSink::new(chunks, cancel);
    match command.run(&layers, sink).await {
        Ok(()) => Ok(()),
        Err(CommandError::Cancelled) => Err(ExecError::Cancelled),
        Err(err) => {
            error!(command = %command.description().name, error = %err, "command failed");
            let _ = failure.send(ExecError::from(err));
            Ok(())
        }
    }
}

/// Forward chunks; a late failure becomes a text trailer.
pub(crate) async fn pass_through(
    mut chunks: mpsc::Receiver<String>,
    failure: oneshot::Receiver<ExecError>,
    out: mpsc::Sender<Unit>,
    cancel: CancellationToken,
) -> ExecResult<()> {
    let mut written = false;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecError::Cancelled),
            chunk = chunks.recv() => chunk,
        };
        let Some(chunk) = next else { break };
        written |= !chunk.is_empty();
        emit(&out, chunk).await?;
    }

    match failure.await {
        Err(_) => Ok(()),
        Ok(err) if written => {
            emit(&out, format!("\nerror: {}\n", err)).await?;
            Err(err)
        }
        Ok(err) => Err(abort(&out, err).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trailer_after_output() {
        let (chunk_tx, chunk_rx) = mpsc::channel(4);
        let (failure_tx, failure_rx) = oneshot::channel();
        let (out_tx, mut out_rx) = mpsc::channel(8);
        chunk_tx.send("hello\n".to_string()).await.unwrap();
        drop(chunk_tx);
        failure_tx.send(ExecError::Command("broken".into())).unwrap();

        let result = pass_through(chunk_rx, failure_rx, out_tx, CancellationToken::new()).await;
        assert!(result.is_err());

        let mut body = String::new();
        while let Some(unit) = out_rx.recv().await {
            body.push_str(&String::from_utf8_lossy(&unit.unwrap()));
        }
        assert_eq!(body, "hello\n\nerror: command failed: broken\n");
    }
}
