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

//! Property-based tests for the resolution pipeline.

use parka_core::{TempFileManager, Value};
use parka_params::{Parser, RequestInput, StaticOverrides};
use parka_test::fixtures;
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    /// Property: `tags[]=a&tags[]=b` resolves exactly like `tags=a,b`
    #[test]
    fn prop_bracket_equals_comma(tags in prop::collection::vec(-1000i64..1000, 1..8)) {
        let bracket: String = tags
            .iter()
            .map(|t| format!("tags[]={}", t))
            .collect::<Vec<_>>()
            .join("&");
        let comma = format!(
            "tags={}",
            tags.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(",")
        );

        let temp = TempFileManager::new();
        let layers = fixtures::sample_layers();
        let a = Parser::for_query().resolve(&layers, &RequestInput::from_query_string(&bracket), &temp).unwrap();
        let b = Parser::for_query().resolve(&layers, &RequestInput::from_query_string(&comma), &temp).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.value("default", "tags"), Some(&Value::from(tags)));
    }

    /// Property: a static override always wins over the query value
    #[test]
    fn prop_static_beats_query(query_limit in any::<i32>(), static_limit in any::<i32>()) {
        let temp = TempFileManager::new();
        let overrides = StaticOverrides::new().set("default", "limit", static_limit);
        let parser = Parser::for_query().with_static_overrides(Arc::new(overrides));
        let input = RequestInput::from_query_string(&format!("limit={}", query_limit));
        let parsed = parser.resolve(&fixtures::sample_layers(), &input, &temp).unwrap();
        prop_assert_eq!(parsed.value("default", "limit"), Some(&Value::Int(static_limit as i64)));
    }

    /// Property: resolving twice yields equal results
    #[test]
    fn prop_idempotent(limit in any::<i64>(), choice in prop::sample::select(vec!["a", "b"])) {
        let temp = TempFileManager::new();
        let input = RequestInput::from_query_string(&format!("limit={}&choice={}", limit, choice));
        let layers = fixtures::sample_layers();
        let first = Parser::for_query().resolve(&layers, &input, &temp).unwrap();
        let second = Parser::for_query().resolve(&layers, &input, &temp).unwrap();
        prop_assert_eq!(first, second);
    }
}
