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

//! Materializing file-backed parameter content.

use parka_core::{
    FileContent, ParameterDefinition, ParameterResult, StructuredFormat, TempFileManager, Value,
};

/// Write `content` to a temp file registered with `temp_files`.
///
/// Without a filename hint, structured parameters get a name whose extension
/// is guessed from the content and other parameters get a `.txt` name.
pub fn materialize(
    definition: &ParameterDefinition,
    temp_files: &TempFileManager,
    hint: Option<&str>,
    content: &[u8],
) -> ParameterResult<FileContent> {
    let filename = match hint {
        Some(hint) => hint.to_string(),
        None if definition.parameter_type.is_structured() => {
            let text = String::from_utf8_lossy(content);
            let format = StructuredFormat::sniff_content(&text);
            format!("{}.{}", definition.name, format.extension())
        }
        None => format!("{}.txt", definition.name),
    };
    let path = temp_files.create(&filename, content)?;
    Ok(FileContent::new(filename, path, content.to_vec()))
}

/// Materialize several inline contents sharing one hint and parse them.
pub fn ingest_inline(
    definition: &ParameterDefinition,
    temp_files: &TempFileManager,
    hint: Option<&str>,
    contents: &[String],
) -> ParameterResult<Value> {
    let files = contents
        .iter()
        .map(|c| materialize(definition, temp_files, hint, c.as_bytes()))
        .collect::<ParameterResult<Vec<_>>>()?;
    definition.parse_files(&files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parka_core::ParameterType;

    #[test]
    fn test_inline_structured_content_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempFileManager::in_dir(dir.path());
        let def = ParameterDefinition::new("config", ParameterType::ObjectFromFile);

        let value = ingest_inline(&def, &temp, None, &["{\"a\": 1}".to_string()]).unwrap();
        assert_eq!(value.as_object().unwrap().get("a"), Some(&Value::Int(1)));

        let value = ingest_inline(&def, &temp, None, &["a: 2".to_string()]).unwrap();
        assert_eq!(value.as_object().unwrap().get("a"), Some(&Value::Int(2)));
        assert_eq!(temp.len(), 2);
    }

    #[test]
    fn test_hint_drives_format() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempFileManager::in_dir(dir.path());
        let def = ParameterDefinition::new("config", ParameterType::ObjectFromFile);

        let err = ingest_inline(&def, &temp, Some("config.toml"), &["a = 1".to_string()]).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
        // The file was still registered and will be cleaned up.
        assert_eq!(temp.len(), 1);
    }
}
