// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Image adapter against an in-process compression service

mod common;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::time::Duration;

use assetflow::adapters::{Adapter, ImageAdapter, TaskContext};
use assetflow::pipeline::Mode;
use assetflow::AssetflowError;

/// Basic auth for `api:test-key`
const AUTH: &str = "Basic YXBpOnRlc3Qta2V5";

type Uploads = Arc<Mutex<Vec<Vec<u8>>>>;

async fn shrink(State(uploads): State<Uploads>, headers: HeaderMap, body: Bytes) -> Response {
    if headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some(AUTH) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Unauthorized",
                "message": "Credentials are invalid"
            })),
        )
            .into_response();
    }

    let id = {
        let mut uploads = uploads.lock().unwrap();
        uploads.push(body.to_vec());
        uploads.len() - 1
    };
    (
        StatusCode::CREATED,
        [(header::LOCATION, format!("/output/{}", id))],
        Json(serde_json::json!({ "input": { "size": body.len() } })),
    )
        .into_response()
}

/// Images named `big*` come back larger, everything else halved
async fn output(State(uploads): State<Uploads>, Path(id): Path<usize>) -> Response {
    let uploads = uploads.lock().unwrap();
    let Some(original) = uploads.get(id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let result = if original.starts_with(b"big") {
        [original.as_slice(), original.as_slice()].concat()
    } else {
        original[..original.len() / 2].to_vec()
    };
    result.into_response()
}

async fn start_test_server() -> String {
    let uploads: Uploads = Arc::default();
    let app = Router::new()
        .route("/shrink", post(shrink))
        .route("/output/:id", get(output))
        .with_state(uploads);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    url
}

fn context(root: &std::path::Path, key: &str) -> TaskContext {
    TaskContext {
        task: "images".into(),
        root: root.to_path_buf(),
        mode: Mode::Production,
        env: HashMap::from([("TINYPNG_API_KEY".to_string(), key.to_string())]),
    }
}

fn adapter(url: &str) -> ImageAdapter {
    ImageAdapter::new(
        vec!["app/img/**/*.{png,jpg,jpeg,webp}".to_string()],
        format!("{}/shrink", url),
        "TINYPNG_API_KEY".to_string(),
    )
}

#[tokio::test]
async fn test_compresses_in_place_when_smaller() {
    let url = start_test_server().await;
    let tmp = tempfile::tempdir().unwrap();
    common::write(tmp.path(), "app/img/photo.jpg", "0123456789abcdef");
    common::write(tmp.path(), "app/img/icons/big.png", "big-image");
    common::write(tmp.path(), "app/img/notes.txt", "not an image");

    let report = adapter(&url)
        .compress(&context(tmp.path(), "test-key"))
        .await
        .unwrap();

    assert_eq!(report.images.len(), 2);
    assert_eq!(report.replaced(), 1);
    assert_eq!(report.bytes_saved(), 8);

    assert_eq!(
        std::fs::read_to_string(tmp.path().join("app/img/photo.jpg")).unwrap(),
        "01234567"
    );
    // A larger result is discarded
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("app/img/icons/big.png")).unwrap(),
        "big-image"
    );
}

#[tokio::test]
async fn test_transform_summary() {
    let url = start_test_server().await;
    let tmp = tempfile::tempdir().unwrap();
    common::write(tmp.path(), "app/img/photo.webp", "0123456789abcdef");

    let output = adapter(&url)
        .transform(&context(tmp.path(), "test-key"))
        .await
        .unwrap();

    assert_eq!(output.written, vec![tmp.path().join("app/img/photo.webp")]);
    assert_eq!(output.summary.as_deref(), Some("1 images, saved 8 B"));
}

#[tokio::test]
async fn test_rejected_credential() {
    let url = start_test_server().await;
    let tmp = tempfile::tempdir().unwrap();
    common::write(tmp.path(), "app/img/photo.png", "0123456789abcdef");

    let err = adapter(&url)
        .compress(&context(tmp.path(), "wrong"))
        .await
        .unwrap_err();

    match err {
        AssetflowError::Compression { message, help } => {
            assert!(message.contains("HTTP 401"), "{message}");
            assert!(message.contains("Credentials are invalid"), "{message}");
            assert_eq!(help.as_deref(), Some("Check the value of TINYPNG_API_KEY"));
        }
        other => panic!("Expected compression error, got {other:?}"),
    }
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("app/img/photo.png")).unwrap(),
        "0123456789abcdef"
    );
}
