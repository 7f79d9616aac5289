// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Development server
//!
//! Serves the source directory as static files. HTML responses get the
//! live-reload client injected before `</body>`.

mod reload;

pub use reload::{LiveReload, ReloadEvent, ReloadKind};

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use colored::Colorize;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::errors::AssetflowError;
use crate::pipeline::ProjectConfig;

/// Route of the long-poll endpoint
pub const POLL_PATH: &str = "/__assetflow/poll";

/// Route of the client script
pub const CLIENT_PATH: &str = "/__assetflow/client.js";

const CLIENT_JS: &str = r#"(function () {
  var since = window.__assetflowSeq || 0;

  function inject(paths) {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    paths.forEach(function (path) {
      links.forEach(function (link) {
        var url = new URL(link.href, location.href);
        if (url.pathname.endsWith(path)) {
          url.searchParams.set('assetflow', Date.now());
          link.href = url.toString();
        }
      });
    });
  }

  function poll() {
    fetch('/__assetflow/poll?since=' + since, { cache: 'no-store' })
      .then(function (res) {
        if (res.status === 204) return [];
        if (!res.ok) throw new Error('HTTP ' + res.status);
        return res.json();
      })
      .then(function (events) {
        var reload = false;
        events.forEach(function (event) {
          since = Math.max(since, event.seq);
          if (event.type === 'reload') reload = true;
          else if (event.type === 'inject') inject(event.paths);
          else if (event.type === 'error') console.error('[assetflow] ' + event.task + ': ' + event.message);
        });
        if (reload) location.reload();
        else poll();
      })
      .catch(function () {
        setTimeout(poll, 1000);
      });
  }

  poll();
})();
"#;

#[derive(Clone)]
struct ServerState {
    reload: LiveReload,
    poll_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PollQuery {
    #[serde(default)]
    since: u64,
}

/// Static file server with live reload
pub struct DevServer {
    host: String,
    port: u16,
    root: PathBuf,
    state: ServerState,
}

impl DevServer {
    /// Configure the server for a project.
    ///
    /// The served directory is `server.root` when set, otherwise the source
    /// directory. The server never opens a browser.
    pub fn init(config: &ProjectConfig, project_root: &Path, reload: LiveReload) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            root: Self::served_root(config, project_root),
            state: ServerState {
                reload,
                poll_timeout: Duration::from_millis(config.server.poll_timeout_ms),
            },
        }
    }

    /// Absolute directory served for a project
    pub fn served_root(config: &ProjectConfig, project_root: &Path) -> PathBuf {
        project_root.join(config.server.root.as_ref().unwrap_or(&config.source_dir))
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        Router::new()
            .route(POLL_PATH, get(poll))
            .route(CLIENT_PATH, get(client_script))
            .fallback_service(ServeDir::new(&self.root))
            .layer(middleware::map_response_with_state(
                self.state.clone(),
                inject_client,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until the future is dropped
    pub async fn serve(self) -> Result<(), AssetflowError> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(|e| AssetflowError::Server {
                message: format!("cannot bind {}:{}: {}", self.host, self.port, e),
            })?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), AssetflowError> {
        let addr = listener.local_addr()?;
        println!(
            "{} {} at {}",
            "Serving".bold(),
            self.root.display(),
            format!("http://{}", addr).cyan()
        );
        tracing::info!(%addr, root = %self.root.display(), "dev server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| AssetflowError::Server {
                message: e.to_string(),
            })
    }
}

/// GET /__assetflow/poll?since=<seq>
async fn poll(State(state): State<ServerState>, Query(query): Query<PollQuery>) -> Response {
    let events = state.reload.wait_since(query.since, state.poll_timeout).await;
    if events.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(events).into_response()
    }
}

/// GET /__assetflow/client.js
async fn client_script() -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        CLIENT_JS,
    )
        .into_response()
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}

/// Insert `snippet` before the last `</body>`, or append it
pub fn inject_snippet(html: &str, snippet: &str) -> String {
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(index) => format!("{}{}{}", &html[..index], snippet, &html[index..]),
        None => format!("{}{}", html, snippet),
    }
}

fn client_snippet(seq: u64) -> String {
    format!(
        "<script>window.__assetflowSeq = {};</script><script src=\"{}\"></script>",
        seq, CLIENT_PATH
    )
}

async fn inject_client(State(state): State<ServerState>, response: Response) -> Response {
    // 206 bodies are byte ranges, not whole documents
    if response.status() != StatusCode::OK || !is_html(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "cannot read HTML response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let Ok(html) = std::str::from_utf8(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };

    let html = inject_snippet(html, &client_snippet(state.reload.current_seq()));
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Response::from_parts(parts, Body::from(html))
}
