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

//! Parameter type tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The type of a parameter.
///
/// Names use kebab-case both in serialized form and in [`FromStr`], so
/// `"integer-list"` parses to [`ParameterType::IntegerList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterType {
    String,
    /// A string that is never echoed back in debug output.
    Secret,
    Integer,
    Float,
    Bool,
    Date,
    Choice,
    ChoiceList,
    StringList,
    IntegerList,
    FloatList,
    /// `key:value` pairs collected into an object.
    KeyValue,
    StringFromFile,
    StringFromFiles,
    StringListFromFile,
    ObjectFromFile,
    ObjectListFromFile,
    File,
    FileList,
}

const ALL_TYPES: [ParameterType; 19] = [
    ParameterType::String,
    ParameterType::Secret,
    ParameterType::Integer,
    ParameterType::Float,
    ParameterType::Bool,
    ParameterType::Date,
    ParameterType::Choice,
    ParameterType::ChoiceList,
    ParameterType::StringList,
    ParameterType::IntegerList,
    ParameterType::FloatList,
    ParameterType::KeyValue,
    ParameterType::StringFromFile,
    ParameterType::StringFromFiles,
    ParameterType::StringListFromFile,
    ParameterType::ObjectFromFile,
    ParameterType::ObjectListFromFile,
    ParameterType::File,
    ParameterType::FileList,
];

impl ParameterType {
    /// All parameter types.
    pub fn all() -> &'static [ParameterType] {
        &ALL_TYPES
    }

    /// Kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Secret => "secret",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::Choice => "choice",
            Self::ChoiceList => "choice-list",
            Self::StringList => "string-list",
            Self::IntegerList => "integer-list",
            Self::FloatList => "float-list",
            Self::KeyValue => "key-value",
            Self::StringFromFile => "string-from-file",
            Self::StringFromFiles => "string-from-files",
            Self::StringListFromFile => "string-list-from-file",
            Self::ObjectFromFile => "object-from-file",
            Self::ObjectListFromFile => "object-list-from-file",
            Self::File => "file",
            Self::FileList => "file-list",
        }
    }

    /// Whether the parameter takes several raw inputs (`name[]=a&name[]=b`).
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Self::ChoiceList
                | Self::StringList
                | Self::IntegerList
                | Self::FloatList
                | Self::KeyValue
                | Self::StringFromFiles
                | Self::FileList
        )
    }

    /// Whether the value is ingested from file content.
    pub fn is_file_backed(&self) -> bool {
        matches!(
            self,
            Self::StringFromFile
                | Self::StringFromFiles
                | Self::StringListFromFile
                | Self::ObjectFromFile
                | Self::ObjectListFromFile
                | Self::File
                | Self::FileList
        )
    }

    /// Whether file content must be parsed as JSON or YAML.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::ObjectFromFile | Self::ObjectListFromFile)
    }

    /// Whether values come from a declared choice set.
    pub fn has_choices(&self) -> bool {
        matches!(self, Self::Choice | Self::ChoiceList)
    }

    /// Element type for list types.
    pub fn element_type(&self) -> Option<ParameterType> {
        match self {
            Self::ChoiceList => Some(Self::Choice),
            Self::StringList => Some(Self::String),
            Self::IntegerList => Some(Self::Integer),
            Self::FloatList => Some(Self::Float),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_TYPES
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown parameter type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for t in ParameterType::all() {
            assert_eq!(t.as_str().parse::<ParameterType>().unwrap(), *t);
        }
        assert!("nope".parse::<ParameterType>().is_err());
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ParameterType::ObjectListFromFile).unwrap();
        assert_eq!(json, "\"object-list-from-file\"");
    }

    #[test]
    fn test_classification() {
        assert!(ParameterType::IntegerList.is_list());
        assert!(!ParameterType::Integer.is_list());
        assert!(ParameterType::FileList.is_list());
        assert!(ParameterType::FileList.is_file_backed());
        assert!(ParameterType::ObjectFromFile.is_structured());
        assert!(!ParameterType::StringFromFile.is_structured());
        assert_eq!(
            ParameterType::IntegerList.element_type(),
            Some(ParameterType::Integer)
        );
        assert_eq!(ParameterType::KeyValue.element_type(), None);
    }
}
