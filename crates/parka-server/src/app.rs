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

//! Router, shared state and handlers.
//!
//! | Route                     | Output                                    |
//! |---------------------------|-------------------------------------------|
//! | `/`                       | HTML index of commands                    |
//! | `/data/{cmd}`             | rows as `?_format=` (default JSON)        |
//! | `/text/{cmd}`             | writer text, or rows as an ASCII table    |
//! | `/streaming/{cmd}`        | rows as server-sent events                |
//! | `/html/{cmd}`             | form plus rows in a table                 |
//! | `/datatables/{cmd}`       | form plus rows in a DataTables grid       |
//! | `/download/{cmd}.{ext}`   | rows materialized as a file attachment    |
//! | `/api/commands`           | command summaries as JSON                 |
//! | `/api/templates/reload`   | re-read the template override directory   |
//!
//! Every command route accepts GET (query string) and POST (form, multipart
//! or JSON body). Parameters are fully resolved before the command runs, so
//! invalid input never reaches a command.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::extract::{request_input, InputKind};
use crate::registry::CommandRegistry;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, Request, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parka_core::{Command, CommandContext, CommandDescription, TempFileManager};
use parka_params::{Parser, RequestInput, StaticOverrides};
use parka_render::{
    render_index, OutputFormat, Page, PageMode, RenderError, TemplateResolver, TemplateStore,
};
use parka_stream::{ExecutionStream, Pipeline};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Query key selecting the output format on `/data`.
pub const FORMAT_KEY: &str = "_format";

/// Query key selecting a custom page template on `/html` and `/datatables`.
pub const TEMPLATE_KEY: &str = "_template";

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<CommandRegistry>,
    templates: Arc<dyn TemplateResolver>,
    pipeline: Pipeline,
    query_parser: Parser,
    form_parser: Parser,
    json_parser: Parser,
    max_body_bytes: usize,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("commands", &self.registry.len())
            .field("templates", &self.templates.names())
            .field("pipeline", &self.pipeline)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl AppState {
    /// Built-in templates, default pipeline, no static overrides.
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            templates: Arc::new(TemplateStore::builtin()),
            pipeline: Pipeline::default(),
            query_parser: Parser::for_query(),
            form_parser: Parser::for_form(),
            json_parser: Parser::for_json(),
            max_body_bytes: ServerConfig::default().max_body_bytes,
        }
    }

    /// State for `config`: loads the template directory and overrides file.
    pub fn from_config(config: &ServerConfig, registry: CommandRegistry) -> Result<Self, ServerError> {
        let mut state = Self::new(registry)
            .with_pipeline(Pipeline::new(config.pipeline_config()))
            .with_max_body_bytes(config.max_body_bytes);
        if let Some(dir) = &config.template_dir {
            let store = TemplateStore::with_override_dir(dir.clone())?;
            info!(dir = %dir.display(), templates = store.names().len(), "loaded template overrides");
            state = state.with_templates(Arc::new(store));
        }
        if let Some(path) = &config.overrides_file {
            let overrides = StaticOverrides::from_file(path)?;
            info!(file = %path.display(), "loaded static overrides");
            state = state.with_static_overrides(Arc::new(overrides));
        }
        Ok(state)
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateResolver>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Apply `overrides` ahead of every request's own input.
    pub fn with_static_overrides(mut self, overrides: Arc<StaticOverrides>) -> Self {
        self.query_parser = self.query_parser.with_static_overrides(overrides.clone());
        self.form_parser = self.form_parser.with_static_overrides(overrides.clone());
        self.json_parser = self.json_parser.with_static_overrides(overrides);
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    fn parser(&self, kind: InputKind) -> &Parser {
        match kind {
            InputKind::Query => &self.query_parser,
            InputKind::Form => &self.form_parser,
            InputKind::Json => &self.json_parser,
        }
    }

    fn command(&self, name: &str) -> Result<Command, ServerError> {
        self.registry
            .get(name)
            .ok_or_else(|| ServerError::UnknownCommand(name.to_string()))
    }

    /// Decode the request and resolve `command`'s parameters.
    async fn prepare(&self, command: Command, req: Request) -> Result<Prepared, ServerError> {
        let raw_query = req.uri().query().unwrap_or_default().to_string();
        let (input, kind) = request_input(req, self.max_body_bytes).await?;
        let temp_files = Arc::new(TempFileManager::new());
        let name = command.name().to_string();

        match self.parser(kind).build_context(command, &input, temp_files.clone()) {
            Ok(ctx) => {
                debug!(command = %name, input = ?kind, "parameters resolved");
                Ok(Prepared {
                    ctx,
                    input,
                    raw_query,
                })
            }
            Err(err) => {
                temp_files.close();
                Err(err.into())
            }
        }
    }
}

struct Prepared {
    ctx: CommandContext,
    input: RequestInput,
    raw_query: String,
}

impl Prepared {
    fn query_value(&self, key: &str) -> Option<&str> {
        self.input
            .query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Build the router for `state`.
pub fn router(state: AppState) -> Router {
    let max_body = state.max_body_bytes;
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(health))
        .route("/api/commands", get(list_commands))
        .route("/api/templates/reload", post(reload_templates))
        .route("/data/*command", get(data).post(data))
        .route("/text/*command", get(text).post(text))
        .route("/streaming/*command", get(streaming).post(streaming))
        .route("/html/*command", get(html_table).post(html_table))
        .route("/datatables/*command", get(datatables).post(datatables))
        .route("/download/*file", get(download).post(download))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.addr()` and serve `registry` until Ctrl-C.
pub async fn serve(config: ServerConfig, registry: CommandRegistry) -> Result<(), ServerError> {
    let state = AppState::from_config(&config, registry)?;
    let commands = state.registry().len();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!(addr = %listener.local_addr()?, commands, "parka listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("parka stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

fn stream_response(stream: ExecutionStream) -> Response {
    let content_type = stream.content_type();
    ([(header::CONTENT_TYPE, content_type)], Body::from_stream(stream)).into_response()
}

fn tabular_format(name: &str) -> Result<OutputFormat, ServerError> {
    let format = OutputFormat::from_name(name)?;
    if OutputFormat::TABULAR.contains(&format) {
        Ok(format)
    } else {
        Err(RenderError::UnknownFormat(name.to_string()).into())
    }
}

fn bare_done() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

// ==================== Index and API ====================

async fn index(State(state): State<AppState>) -> Result<Html<String>, ServerError> {
    let entries: Vec<(&CommandDescription, &str)> = state
        .registry
        .iter()
        .map(|c| (c.description(), c.kind()))
        .collect();
    Ok(Html(render_index(state.templates.as_ref(), &entries)?))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_commands(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.registry.summaries())
}

async fn reload_templates(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ServerError> {
    let count = state.templates.reload()?;
    info!(templates = count, "templates reloaded");
    Ok(Json(json!({ "templates": count })))
}

// ==================== Command routes ====================

async fn data(
    State(state): State<AppState>,
    Path(name): Path<String>,
    req: Request,
) -> Result<Response, ServerError> {
    let command = state.command(&name)?;
    let prepared = state.prepare(command, req).await?;
    let format = match prepared.query_value(FORMAT_KEY) {
        Some(name) => tabular_format(name),
        None => Ok(OutputFormat::Json),
    };
    let format = match format {
        Ok(format) => format,
        Err(err) => {
            prepared.ctx.close_temp_files();
            return Err(err);
        }
    };

    match prepared.ctx.command {
        Command::Rows(_) => Ok(stream_response(state.pipeline.stream_rows(prepared.ctx, format).await?)),
        Command::Writer(_) => Ok(stream_response(state.pipeline.stream_text(prepared.ctx).await?)),
        Command::Bare(_) => {
            state.pipeline.run_bare(prepared.ctx).await?;
            Ok(bare_done())
        }
    }
}

async fn text(
    State(state): State<AppState>,
    Path(name): Path<String>,
    req: Request,
) -> Result<Response, ServerError> {
    let command = state.command(&name)?;
    let prepared = state.prepare(command, req).await?;
    match prepared.ctx.command {
        Command::Rows(_) => Ok(stream_response(
            state.pipeline.stream_rows(prepared.ctx, OutputFormat::Ascii).await?,
        )),
        Command::Writer(_) => Ok(stream_response(state.pipeline.stream_text(prepared.ctx).await?)),
        Command::Bare(_) => {
            state.pipeline.run_bare(prepared.ctx).await?;
            Ok(bare_done())
        }
    }
}

async fn streaming(
    State(state): State<AppState>,
    Path(name): Path<String>,
    req: Request,
) -> Result<Response, ServerError> {
    let command = state.command(&name)?;
    let prepared = state.prepare(command, req).await?;
    let stream = state.pipeline.stream_rows(prepared.ctx, OutputFormat::Sse).await?;
    let mut response = stream_response(stream);
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
    Ok(response)
}

async fn html_table(
    State(state): State<AppState>,
    Path(name): Path<String>,
    req: Request,
) -> Result<Response, ServerError> {
    command_page(state, name, req, PageMode::Table).await
}

async fn datatables(
    State(state): State<AppState>,
    Path(name): Path<String>,
    req: Request,
) -> Result<Response, ServerError> {
    command_page(state, name, req, PageMode::DataTables).await
}

async fn command_page(state: AppState, name: String, req: Request, mode: PageMode) -> Result<Response, ServerError> {
    let command = state.command(&name)?;
    // Layout errors are deployment mistakes; report them before running anything.
    let mut page = Page::for_command(command.description(), mode)?;
    if let Some(template) = requested_template(&req) {
        match state.templates.resolve(&template) {
            Ok(_) => page = page.with_template(template),
            Err(RenderError::TemplateNotFound(_)) => return Err(ServerError::UnknownTemplate(template)),
            Err(err) => return Err(err.into()),
        }
    }
    let prepared = state.prepare(command, req).await?;
    let page = page.with_query(prepared.raw_query.clone());

    let stream = state
        .pipeline
        .stream_page(prepared.ctx, page, state.templates.clone())
        .await?;
    Ok(stream_response(stream))
}

fn requested_template(req: &Request) -> Option<String> {
    RequestInput::from_query_string(req.uri().query().unwrap_or_default())
        .query
        .into_iter()
        .find(|(key, _)| key == TEMPLATE_KEY)
        .map(|(_, value)| value)
}

async fn download(
    State(state): State<AppState>,
    Path(file): Path<String>,
    req: Request,
) -> Result<Response, ServerError> {
    let (name, extension) = file
        .rsplit_once('.')
        .ok_or_else(|| ServerError::BadRequest(format!("download '{file}' has no extension")))?;
    let format = tabular_format(extension)?;
    let command = state.command(name)?;
    let prepared = state.prepare(command, req).await?;

    let download = state.pipeline.download(prepared.ctx, format).await?;
    debug!(file = %download.filename(), size = download.size(), "sending download");
    let headers = [
        (header::CONTENT_TYPE, download.content_type().to_string()),
        (header::CONTENT_DISPOSITION, download.content_disposition()),
        (header::CONTENT_LENGTH, download.size().to_string()),
    ];
    Ok((headers, Body::from_stream(download.into_stream())).into_response())
}
