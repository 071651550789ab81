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

//! Rows and column sets.

use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::sync::Arc;

/// An ordered mapping from column name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    fields: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Values projected onto `columns`; missing columns become `Null`.
    pub fn project<'a>(&'a self, columns: &'a ColumnSet) -> impl Iterator<Item = &'a Value> + 'a {
        static NULL: Value = Value::Null;
        columns
            .iter()
            .map(move |c| self.fields.get(c).unwrap_or(&NULL))
    }

    /// The row as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl From<IndexMap<String, Value>> for Row {
    fn from(fields: IndexMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// An ordered, immutable list of column names.
///
/// Cloning is cheap; the names are shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColumnSet {
    names: Arc<[String]>,
}

impl ColumnSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Columns of `row`, in its field order.
    pub fn from_row(row: &Row) -> Self {
        Self::new(row.columns())
    }

    /// Union of the columns of `rows`, in first-seen order.
    pub fn union_of<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let mut seen: IndexSet<&str> = IndexSet::new();
        for row in rows {
            seen.extend(row.columns());
        }
        Self::new(seen)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }
}
