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

//! The parse step abstraction.

use crate::input::RequestInput;
use parka_core::{
    ParameterDefinition, ParameterLayer, ParameterResult, ParsedLayer, Source, TempFileManager,
    Value,
};
use std::sync::Arc;

/// One stage of parameter resolution.
///
/// A step looks at the definitions still pending in a layer, resolves the
/// ones it has a value for, and consumes them so later steps never see them.
pub trait ParseStep: Send + Sync {
    /// Step identifier, used in logs.
    fn name(&self) -> &str;

    /// Apply the step to one layer.
    fn apply(&self, ctx: &mut StepContext<'_>) -> ParameterResult<()>;
}

/// Mutable view of one layer's resolution state.
pub struct StepContext<'a> {
    pub layer: &'a ParameterLayer,
    pub input: &'a RequestInput,
    pub temp_files: &'a TempFileManager,
    parsed: &'a mut ParsedLayer,
    pending: Vec<Arc<ParameterDefinition>>,
    sealed: bool,
}

impl<'a> StepContext<'a> {
    pub fn new(
        layer: &'a ParameterLayer,
        parsed: &'a mut ParsedLayer,
        input: &'a RequestInput,
        temp_files: &'a TempFileManager,
    ) -> Self {
        Self {
            layer,
            input,
            temp_files,
            parsed,
            pending: layer.definitions.clone(),
            sealed: false,
        }
    }

    /// Definitions not consumed yet, in declaration order.
    pub fn pending(&self) -> &[Arc<ParameterDefinition>] {
        &self.pending
    }

    /// Snapshot of the pending definitions, for steps that resolve while
    /// iterating.
    pub fn pending_snapshot(&self) -> Vec<Arc<ParameterDefinition>> {
        self.pending.clone()
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.iter().any(|d| d.name == name)
    }

    /// Set `name` and consume its definition.
    ///
    /// Returns false if the definition was already consumed.
    pub fn resolve(&mut self, name: &str, value: Value, source: Source) -> bool {
        match self.pending.iter().position(|d| d.name == name) {
            Some(idx) => {
                let definition = self.pending.remove(idx);
                self.parsed.set(definition, value, source);
                true
            }
            None => false,
        }
    }

    /// Consume every pending definition without setting a value.
    pub fn consume_all(&mut self) -> Vec<Arc<ParameterDefinition>> {
        std::mem::take(&mut self.pending)
    }

    /// Stop further steps from running on this layer.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// The values resolved so far.
    pub fn parsed(&self) -> &ParsedLayer {
        &*self.parsed
    }

    /// Hide pending definitions matching `hide` until [`restore`] is called.
    ///
    /// [`restore`]: StepContext::restore
    pub fn hide<F>(&mut self, hide: F) -> Vec<Arc<ParameterDefinition>>
    where
        F: Fn(&ParameterDefinition) -> bool,
    {
        let (hidden, visible) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|d| hide(&**d));
        self.pending = visible;
        hidden
    }

    /// Put hidden definitions back, keeping declaration order.
    pub fn restore(&mut self, hidden: Vec<Arc<ParameterDefinition>>) {
        if hidden.is_empty() {
            return;
        }
        self.pending.extend(hidden);
        let layer = self.layer;
        self.pending.sort_by_key(|d| {
            layer
                .definitions
                .iter()
                .position(|x| Arc::ptr_eq(x, d))
                .unwrap_or(usize::MAX)
        });
    }
}
