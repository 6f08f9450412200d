//! `GET /download-zip` against manifests on disk.

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use stowzip::server::{ServerState, create_router};

fn router(manifest_path: PathBuf) -> axum::Router {
    create_router(Arc::new(ServerState { manifest_path }))
}

async fn get(app: axum::Router) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/download-zip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn write_manifest(dir: &tempfile::TempDir, json: &str) -> PathBuf {
    let path = dir.path().join("toolkit.json");
    std::fs::write(&path, json).unwrap();
    path
}

#[tokio::test]
async fn serves_archive_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"{"components": [
            {"type": "skill", "slug": "foo", "name": "Foo",
             "files": [{"path": "SKILL.md", "content": "body"}]}
        ]}"#,
    );

    let (status, headers, body) = get(router(manifest)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        headers[header::CONTENT_LENGTH].to_str().unwrap(),
        body.len().to_string()
    );
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"claude-code-toolkit-"));
    assert!(disposition.ends_with(".zip\""));

    let mut archive = zip::ZipArchive::new(Cursor::new(body)).unwrap();
    assert_eq!(archive.len(), 2);
    assert_eq!(archive.by_index(0).unwrap().name(), "README.md");
    let mut skill = String::new();
    archive
        .by_name(".claude/skills/foo/SKILL.md")
        .unwrap()
        .read_to_string(&mut skill)
        .unwrap();
    assert!(skill.starts_with("---\n# Managed by GGPrompts - https://ggprompts.com/claude-code\n# Component: Foo\n"));
    assert!(skill.ends_with("body"));
}

#[tokio::test]
async fn null_files_get_a_default_file() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"{"components": [{"type": "command", "slug": "ship", "name": "Ship", "files": null}]}"#,
    );

    let (status, _, body) = get(router(manifest)).await;

    assert_eq!(status, StatusCode::OK);
    let mut archive = zip::ZipArchive::new(Cursor::new(body)).unwrap();
    let mut command = String::new();
    archive
        .by_name(".claude/commands/ship/ship.md")
        .unwrap()
        .read_to_string(&mut command)
        .unwrap();
    assert!(command.ends_with("# Ship\n\nNo content available."));
}

#[tokio::test]
async fn empty_selection_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"{"components": [{"type": "skill", "slug": "s", "name": "S", "enabled": false}]}"#,
    );

    let (status, _, body) = get(router(manifest)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "no enabled components in toolkit");
}

#[tokio::test]
async fn unreadable_manifest_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();

    let (status, _, body) = get(router(dir.path().join("missing.json"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Failed to fetch toolkit");
}

#[tokio::test]
async fn malformed_manifest_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, "{not json");

    let (status, _, _) = get(router(manifest)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
