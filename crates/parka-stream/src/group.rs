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

//! A group of pipeline tasks sharing one cancellation token.

use crate::error::{ExecError, ExecResult};
use std::future::Future;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Tasks of one execution.
///
/// The first task to fail cancels the shared token so its siblings stop;
/// [`TaskGroup::wait`] reports that first failure.
#[derive(Debug)]
pub struct TaskGroup {
    tasks: JoinSet<(&'static str, ExecResult<()>)>,
    cancel: CancellationToken,
}

impl TaskGroup {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            cancel,
        }
    }

    /// The group's cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Spawn an async stage.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ExecResult<()>> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let result = task.await;
            if result.is_err() {
                cancel.cancel();
            }
            (name, result)
        });
    }

    /// Spawn a stage that blocks, on the blocking pool.
    pub fn spawn_blocking<F>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce() -> ExecResult<()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tasks.spawn_blocking(move || {
            let result = task();
            if result.is_err() {
                cancel.cancel();
            }
            (name, result)
        });
    }

    /// Wait for every task; returns the first real failure.
    ///
    /// Cancellations caused by an earlier failure never mask that failure.
    pub async fn wait(mut self) -> ExecResult<()> {
        let mut first: Option<ExecError> = None;
        while let Some(joined) = self.tasks.join_next().await {
            let failure = match joined {
                Ok((name, Ok(()))) => {
                    trace!(task = name, "task finished");
                    continue;
                }
                Ok((name, Err(err))) => {
                    debug!(task = name, error = %err, "task failed");
                    err
                }
                Err(join) => ExecError::Task {
                    task: "pipeline".to_string(),
                    message: join.to_string(),
                },
            };
            self.cancel.cancel();
            first = match first {
                Some(prev) if prev.is_cancellation() && !failure.is_cancellation() => Some(failure),
                Some(prev) => Some(prev),
                None => Some(failure),
            };
        }
        first.map_or(Ok(()), Err)
    }
}
