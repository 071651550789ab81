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

//! Template lookup.

use crate::error::{RenderError, RenderResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

/// Name of the base layout template.
pub const BASE_TEMPLATE: &str = "base.html";
/// Name of the command page template.
pub const COMMAND_TEMPLATE: &str = "command.html";
/// Name of the command index template.
pub const INDEX_TEMPLATE: &str = "index.html";

const BUILTIN: [(&str, &str); 3] = [
    (BASE_TEMPLATE, include_str!("../templates/base.html")),
    (COMMAND_TEMPLATE, include_str!("../templates/command.html")),
    (INDEX_TEMPLATE, include_str!("../templates/index.html")),
];

/// Source of page templates.
///
/// Built once at startup and shared by all requests.
pub trait TemplateResolver: Send + Sync {
    /// Template source for `name`.
    fn resolve(&self, name: &str) -> RenderResult<String>;

    /// Names of every available template.
    fn names(&self) -> Vec<String>;

    /// Re-read templates from their backing store; returns how many were
    /// loaded.
    fn reload(&self) -> RenderResult<usize>;
}

/// Built-in templates, optionally overridden from a directory.
///
/// Any `*.html` file in the override directory replaces the built-in
/// template of the same name or adds a new one.
#[derive(Debug, Default)]
pub struct TemplateStore {
    override_dir: Option<PathBuf>,
    overrides: RwLock<BTreeMap<String, String>>,
}

impl TemplateStore {
    /// Built-in templates only.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Built-in templates overridden from `dir`.
    pub fn with_override_dir(dir: impl Into<PathBuf>) -> RenderResult<Self> {
        let store = Self {
            override_dir: Some(dir.into()),
            overrides: RwLock::new(BTreeMap::new()),
        };
        store.reload()?;
        Ok(store)
    }

    pub fn override_dir(&self) -> Option<&Path> {
        self.override_dir.as_deref()
    }

    fn read_dir(dir: &Path) -> RenderResult<BTreeMap<String, String>> {
        let mut loaded = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_html = path.extension().and_then(|e| e.to_str()) == Some("html");
            if !is_html || !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                loaded.insert(name.to_string(), std::fs::read_to_string(&path)?);
            }
        }
        Ok(loaded)
    }
}

impl TemplateResolver for TemplateStore {
    fn resolve(&self, name: &str) -> RenderResult<String> {
        let overrides = self.overrides.read().unwrap_or_else(|e| e.into_inner());
        if let Some(source) = overrides.get(name) {
            return Ok(source.clone());
        }
        BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, source)| source.to_string())
            .ok_or_else(|| RenderError::TemplateNotFound(name.to_string()))
    }

    fn names(&self) -> Vec<String> {
        let overrides = self.overrides.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = BUILTIN.iter().map(|(n, _)| n.to_string()).collect();
        for name in overrides.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    fn reload(&self) -> RenderResult<usize> {
        let Some(dir) = &self.override_dir else {
            debug!("no template override directory configured");
            return Ok(0);
        };
        let loaded = Self::read_dir(dir)?;
        let count = loaded.len();
        *self.overrides.write().unwrap_or_else(|e| e.into_inner()) = loaded;
        info!(dir = %dir.display(), templates = count, "templates loaded");
        Ok(count)
    }
}
