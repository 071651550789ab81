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

//! End-to-end pipeline tests over the fixture commands.

use futures::StreamExt;
use parka_core::{Command, CommandContext, TempFileManager};
use parka_params::Parser;
use parka_render::{OutputFormat, Page, PageMode, TemplateResolver, TemplateStore};
use parka_stream::{ExecError, Pipeline, PipelineConfig};
use parka_test::fixtures::{self, CountingBare, EchoWriter, EndlessCommand, RaggedCommand};
use std::sync::Arc;
use std::time::Duration;

fn context(command: Command, query: &str) -> (CommandContext, Arc<TempFileManager>) {
    let temp = Arc::new(TempFileManager::new());
    let ctx = Parser::for_query()
        .build_context(command, &fixtures::query(query), Arc::clone(&temp))
        .unwrap();
    (ctx, temp)
}

fn resolver() -> Arc<dyn TemplateResolver> {
    Arc::new(TemplateStore::builtin())
}

async fn body_text(units: Vec<parka_stream::Unit>) -> (String, Option<ExecError>) {
    let mut text = String::new();
    for unit in units {
        match unit {
            Ok(bytes) => text.push_str(&String::from_utf8_lossy(&bytes)),
            Err(err) => return (text, Some(err)),
        }
    }
    (text, None)
}

// ==================== Row streaming ====================

#[tokio::test]
async fn test_streams_exactly_n_rows() {
    let (command, numbers) = fixtures::numbers_command();
    let (ctx, _) = context(command, "count=5");

    let stream = Pipeline::default()
        .stream_rows(ctx, OutputFormat::Json)
        .await
        .unwrap();
    assert_eq!(stream.content_type(), "application/json");
    let body = stream.collect_bytes().await.unwrap();

    let rows: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 5);
    assert_eq!(rows[4]["square"], 25);
    assert_eq!(numbers.runs(), 1);
}

#[tokio::test]
async fn test_units_arrive_in_emission_order() {
    let (command, _) = fixtures::numbers_command();
    let (ctx, _) = context(command, "count=4");

    let stream = Pipeline::default()
        .stream_rows(ctx, OutputFormat::Sse)
        .await
        .unwrap();
    let units: Vec<_> = stream.collect().await;
    let (text, err) = body_text(units).await;
    assert!(err.is_none());

    let ns: Vec<i64> = text
        .split("\n\n")
        .filter(|frame| !frame.is_empty())
        .map(|frame| {
            let json: serde_json::Value =
                serde_json::from_str(frame.trim_start_matches("data: ")).unwrap();
            json["n"].as_i64().unwrap()
        })
        .collect();
    assert_eq!(ns, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_failure_after_k_rows_delivers_k_rows_then_error_event() {
    let (command, _) = fixtures::numbers_command();
    let (ctx, _) = context(command, "count=5&fail_after=2");

    let stream = Pipeline::default()
        .stream_rows(ctx, OutputFormat::Sse)
        .await
        .unwrap();
    let (text, err) = body_text(stream.collect().await).await;
    assert!(err.is_none());
    assert_eq!(text.matches("data: {\"n\"").count(), 2);
    assert!(text.ends_with("event: error\ndata: {\"error\":\"failed after 2 rows\"}\n\n"));
}

#[tokio::test]
async fn test_failure_after_rows_truncates_json() {
    let (command, _) = fixtures::numbers_command();
    let (ctx, _) = context(command, "count=5&fail_after=1");

    let stream = Pipeline::default()
        .stream_rows(ctx, OutputFormat::Json)
        .await
        .unwrap();
    let (text, err) = body_text(stream.collect().await).await;
    assert!(text.starts_with("[\n{\"n\":1"));
    assert!(!text.ends_with(']'));
    assert_eq!(err, Some(ExecError::Command("failed after 1 rows".into())));
}

#[tokio::test]
async fn test_failure_before_output_is_an_error() {
    let (command, numbers) = fixtures::numbers_command();
    let (ctx, _) = context(command, "fail_after=0");

    let err = Pipeline::default()
        .stream_rows(ctx, OutputFormat::Csv)
        .await
        .unwrap_err();
    assert_eq!(err, ExecError::Command("failed after 0 rows".into()));
    assert_eq!(numbers.runs(), 1);
}

#[tokio::test]
async fn test_streaming_columns_come_from_first_row() {
    let (ctx, _) = context(Command::Rows(Arc::new(RaggedCommand::new())), "");
    let body = Pipeline::default()
        .stream_rows(ctx, OutputFormat::Csv)
        .await
        .unwrap()
        .collect_bytes()
        .await
        .unwrap();
    assert_eq!(String::from_utf8(body).unwrap(), "a,b\n1,2\n,3\n5,\n");
}

// ==================== Cancellation ====================

#[tokio::test]
async fn test_dropping_the_body_cancels_the_command() {
    let endless = Arc::new(EndlessCommand::new(Duration::from_millis(5)));
    let (ctx, _) = context(Command::Rows(endless.clone()), "");

    let mut stream = Pipeline::default()
        .stream_rows(ctx, OutputFormat::Sse)
        .await
        .unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    drop(stream);

    for _ in 0..200 {
        if endless.saw_cancellation() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(endless.saw_cancellation());
}

#[tokio::test]
async fn test_timeout_ends_the_body_with_an_error() {
    let endless = Arc::new(EndlessCommand::new(Duration::from_millis(5)));
    let (ctx, _) = context(Command::Rows(endless.clone()), "");
    let pipeline = Pipeline::new(PipelineConfig {
        timeout: Some(Duration::from_millis(60)),
        ..PipelineConfig::default()
    });

    let stream = pipeline.stream_rows(ctx, OutputFormat::Sse).await.unwrap();
    let err = stream.collect_bytes().await.unwrap_err();
    assert_eq!(err, ExecError::TimedOut(Duration::from_millis(60)));
    assert!(endless.saw_cancellation());
}

// ==================== Temp files ====================

#[tokio::test]
async fn test_temp_files_removed_after_execution() {
    let (command, _) = fixtures::numbers_command();
    let (ctx, temp) = context(command, "count=2");
    let path = temp.create("upload.json", b"{}").unwrap();
    assert!(path.exists());

    Pipeline::default()
        .stream_rows(ctx, OutputFormat::Json)
        .await
        .unwrap()
        .collect_bytes()
        .await
        .unwrap();
    assert!(!path.exists());
    assert!(temp.is_empty());
}

#[tokio::test]
async fn test_temp_files_removed_after_failure() {
    let (command, _) = fixtures::numbers_command();
    let (ctx, temp) = context(command, "fail_after=0");
    let path = temp.create("upload.yaml", b"a: 1").unwrap();

    assert!(Pipeline::default()
        .stream_rows(ctx, OutputFormat::Json)
        .await
        .is_err());
    for _ in 0..100 {
        if !path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!path.exists());
}

// ==================== HTML pages ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_table_page_streams_rows() {
    let (command, _) = fixtures::numbers_command();
    let page = Page::for_command(command.description(), PageMode::Table).unwrap();
    let (ctx, _) = context(command, "count=3");

    let stream = Pipeline::default()
        .stream_page(ctx, page, resolver())
        .await
        .unwrap();
    assert!(stream.content_type().starts_with("text/html"));
    let html = String::from_utf8(stream.collect_bytes().await.unwrap()).unwrap();

    assert_eq!(html.matches("<tr><td>").count(), 3);
    assert!(html.contains("<th>square</th>"));
    assert!(html.contains(r#"name="count" value="3""#));
    assert!(!html.contains(r#"<div class="parka-error">"#));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_datatables_page_inlines_rows() {
    let (command, _) = fixtures::numbers_command();
    let page = Page::for_command(command.description(), PageMode::DataTables).unwrap();
    let (ctx, _) = context(command, "count=2");

    let html = Pipeline::default()
        .stream_page(ctx, page, resolver())
        .await
        .unwrap()
        .collect_bytes()
        .await
        .unwrap();
    let html = String::from_utf8(html).unwrap();
    assert!(html.contains(r#"var data = [{"n":1,"square":1,"label":"row 1"},{"n":2"#));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_page_failure_after_rows_shows_panel() {
    let (command, _) = fixtures::numbers_command();
    let page = Page::for_command(command.description(), PageMode::Table).unwrap();
    let (ctx, _) = context(command, "count=4&fail_after=2");

    let html = Pipeline::default()
        .stream_page(ctx, page, resolver())
        .await
        .unwrap()
        .collect_bytes()
        .await
        .unwrap();
    let html = String::from_utf8(html).unwrap();
    assert_eq!(html.matches("<tr><td>").count(), 2);
    assert!(html.contains(r#"<div class="parka-error">failed after 2 rows</div>"#));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_page_failure_before_rows_is_an_error() {
    let (command, _) = fixtures::numbers_command();
    let page = Page::for_command(command.description(), PageMode::Table).unwrap();
    let (ctx, _) = context(command, "fail_after=0");

    let err = Pipeline::default()
        .stream_page(ctx, page, resolver())
        .await
        .unwrap_err();
    assert_eq!(err, ExecError::Command("failed after 0 rows".into()));
}

// ==================== Writer and bare commands ====================

#[tokio::test]
async fn test_writer_text_passes_through() {
    let command = Command::Writer(Arc::new(EchoWriter::new(["one", "two"])));
    let (ctx, _) = context(command, "");
    let stream = Pipeline::default().stream_text(ctx).await.unwrap();
    assert!(stream.content_type().starts_with("text/plain"));
    assert_eq!(stream.collect_bytes().await.unwrap(), b"one\ntwo\n");
}

#[tokio::test]
async fn test_writer_failure_appends_trailer() {
    let command = Command::Writer(Arc::new(EchoWriter::new(["one"]).failing()));
    let (ctx, _) = context(command, "");
    let body = Pipeline::default()
        .stream_text(ctx)
        .await
        .unwrap()
        .collect_bytes()
        .await
        .unwrap();
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "one\n\nerror: command failed: writer failed\n"
    );
}

#[tokio::test]
async fn test_bare_command_runs_once() {
    let bare = Arc::new(CountingBare::new(fixtures::numbers_layers()));
    let (ctx, _) = context(Command::Bare(bare.clone()), "");
    Pipeline::default().run_bare(ctx).await.unwrap();
    assert_eq!(bare.runs(), 1);
}

#[tokio::test]
async fn test_wrong_kind_is_rejected() {
    let bare = Arc::new(CountingBare::new(fixtures::numbers_layers()));
    let (ctx, _) = context(Command::Bare(bare.clone()), "");
    let err = Pipeline::default()
        .stream_rows(ctx, OutputFormat::Json)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::WrongKind { kind: "bare", .. }));
    assert_eq!(bare.runs(), 0);
}

// ==================== Downloads ====================

#[tokio::test]
async fn test_download_uses_union_of_columns() {
    let (ctx, _) = context(Command::Rows(Arc::new(RaggedCommand::new())), "");
    let download = Pipeline::default()
        .download(ctx, OutputFormat::Csv)
        .await
        .unwrap();
    assert_eq!(download.filename(), "ragged.csv");
    assert_eq!(
        download.content_disposition(),
        "attachment; filename=\"ragged.csv\""
    );
    let path = download.path().to_path_buf();

    let chunks: Vec<_> = download.into_stream().collect().await;
    let body: Vec<u8> = chunks
        .into_iter()
        .flat_map(|c| c.unwrap().to_vec())
        .collect();
    assert_eq!(String::from_utf8(body).unwrap(), "a,b,c\n1,2,\n,3,4\n5,,\n");
    assert!(!path.exists());
}

#[tokio::test]
async fn test_download_file_lives_until_body_is_dropped() {
    let (ctx, _) = context(Command::Rows(Arc::new(RaggedCommand::new())), "");
    let download = Pipeline::default()
        .download(ctx, OutputFormat::Csv)
        .await
        .unwrap();
    let path = download.path().to_path_buf();

    let mut body = download.into_stream();
    assert!(path.exists());
    let first = body.next().await.unwrap().unwrap();
    assert!(first.starts_with(b"a,b,c\n"));
    assert!(path.exists());

    drop(body);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_download_failure_produces_no_file() {
    let (command, _) = fixtures::numbers_command();
    let (ctx, _) = context(command, "count=3&fail_after=1");
    let err = Pipeline::default()
        .download(ctx, OutputFormat::Yaml)
        .await
        .unwrap_err();
    assert_eq!(err, ExecError::Command("failed after 1 rows".into()));
}
