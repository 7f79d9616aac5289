// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Dev server: static files, client injection and long polling

mod common;

use std::time::Duration;
use tokio::net::TcpListener;

use assetflow::pipeline::ProjectConfig;
use assetflow::server::{DevServer, LiveReload};

async fn start_test_server(root: &std::path::Path, poll_timeout_ms: u64) -> (String, LiveReload) {
    let mut config = ProjectConfig::default();
    config.server.poll_timeout_ms = poll_timeout_ms;

    let reload = LiveReload::new(&DevServer::served_root(&config, root));
    let server = DevServer::init(&config, root, reload.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        server.serve_on(listener).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    (url, reload)
}

fn site() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    common::write(
        tmp.path(),
        "app/index.html",
        "<html>\n<body>\n<p>Hello</p>\n</body>\n</html>\n",
    );
    common::write(tmp.path(), "app/css/main.min.css", "body{margin:0}");
    tmp
}

#[tokio::test]
async fn test_html_gets_client_script() {
    let tmp = site();
    let (url, reload) = start_test_server(tmp.path(), 1000).await;
    reload.stream(&[tmp.path().join("app/index.html")]);

    let response = reqwest::get(format!("{}/index.html", url)).await.unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();

    assert!(body.contains("<p>Hello</p>"));
    let script = r#"<script>window.__assetflowSeq = 1;</script><script src="/__assetflow/client.js"></script></body>"#;
    assert!(body.contains(script), "{body}");

    // Directory index is served too
    let index = reqwest::get(format!("{}/", url)).await.unwrap().text().await.unwrap();
    assert!(index.contains("/__assetflow/client.js"));
}

#[tokio::test]
async fn test_other_files_are_untouched() {
    let tmp = site();
    let (url, _reload) = start_test_server(tmp.path(), 1000).await;

    let css = reqwest::get(format!("{}/css/main.min.css", url))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(css, "body{margin:0}");

    let missing = reqwest::get(format!("{}/nope.html", url)).await.unwrap();
    assert_eq!(missing.status(), 404);

    let client = reqwest::get(format!("{}/__assetflow/client.js", url)).await.unwrap();
    assert_eq!(client.status(), 200);
    assert!(client.text().await.unwrap().contains("/__assetflow/poll?since="));
}

#[tokio::test]
async fn test_range_request_is_not_injected() {
    let tmp = site();
    let (url, _reload) = start_test_server(tmp.path(), 1000).await;

    let response = reqwest::Client::new()
        .get(format!("{}/index.html", url))
        .header("Range", "bytes=0-5")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 206);
    assert_eq!(response.text().await.unwrap(), "<html>");
}

#[tokio::test]
async fn test_poll_times_out_with_no_content() {
    let tmp = site();
    let (url, _reload) = start_test_server(tmp.path(), 100).await;

    let response = reqwest::get(format!("{}/__assetflow/poll?since=0", url))
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_poll_delivers_events() {
    let tmp = site();
    let (url, reload) = start_test_server(tmp.path(), 5000).await;

    let publisher = reload.clone();
    let css = tmp.path().join("app/css/main.min.css");
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        publisher.stream(&[css]);
    });

    let response = reqwest::get(format!("{}/__assetflow/poll?since=0", url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let events: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        events,
        serde_json::json!([{"seq": 1, "type": "inject", "paths": ["/css/main.min.css"]}])
    );

    // Already seen
    reload.error("templates", "unknown filter");
    let events: serde_json::Value = reqwest::get(format!("{}/__assetflow/poll?since=1", url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(events[0]["type"], "error");
    assert_eq!(events[0]["task"], "templates");
    assert_eq!(events.as_array().map(Vec::len), Some(1));
}

