//! HTTP integration tests for sessions, logs, assets and app storage.

mod common;

use axum::body::Body;
use axum::http::StatusCode;
use common::{unzip, zip_of, zip_with_declared_size, TestServer, TOKEN};
use fabric_server::content::compute_checksum;
use fabric_server::db::AssetRepository;
use serde_json::json;

// ============================================================================
// Auth, CORS and health
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let server = TestServer::new().await;
    let response = server.send("GET", "/health", None, &[], Body::empty()).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_missing_token_is_401_with_cors() {
    let server = TestServer::new().await;
    let response = server.send("GET", "/sessions", None, &[], Body::empty()).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], "Missing Authorization token");
    assert_eq!(response.headers["access-control-allow-origin"], "*");
    assert!(response.headers["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .contains("X-Fabric-Token"));
}

#[tokio::test]
async fn test_wrong_token_is_403() {
    let server = TestServer::new().await;
    let response = server.send("GET", "/sessions", Some("nope"), &[], Body::empty()).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["error"], "Invalid token");
}

#[tokio::test]
async fn test_alternate_token_header() {
    let server = TestServer::new().await;
    let response = server
        .send("GET", "/sessions", None, &[("X-Fabric-Token", TOKEN)], Body::empty())
        .await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_unset_secret_is_500() {
    let server = TestServer::with_config(|config| config.auth.token = None).await;
    let response = server.get("/sessions").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "Token configuration invalid");
}

#[tokio::test]
async fn test_preflight_and_unknown_route() {
    let server = TestServer::new().await;

    let preflight = server.send("OPTIONS", "/sessions", None, &[], Body::empty()).await;
    assert_eq!(preflight.status, StatusCode::NO_CONTENT);
    assert_eq!(preflight.headers["access-control-allow-methods"], "GET, POST, PUT, DELETE, OPTIONS");

    let missing = server.send("GET", "/nowhere", None, &[], Body::empty()).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json()["error"], "Not found");
    assert_eq!(missing.headers["access-control-allow-origin"], "*");
}

// ============================================================================
// Sessions and logs
// ============================================================================

#[tokio::test]
async fn test_create_and_get_session() {
    let server = TestServer::new().await;

    let (status, body) = server
        .json(
            "POST",
            "/sessions",
            Some(json!({ "appName": "ReportBot", "metadata": { "runId": "abc" } })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = body["sessionId"].as_str().unwrap();
    assert_eq!(session_id.len(), 20);

    let (status, body) = server.json("GET", &format!("/sessions/{}", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["id"], session_id);
    assert_eq!(body["session"]["appName"], "ReportBot");
    assert_eq!(body["session"]["metadata"], json!({ "runId": "abc" }));
    assert_eq!(body["metrics"], json!({ "logCount": 0, "assetCount": 0 }));
    assert!(body["session"].get("tenant").is_none());
}

#[tokio::test]
async fn test_session_hidden_from_other_tenant() {
    let owner = TestServer::new().await;
    let session_id = owner.create_session("ReportBot").await;

    // Same database, different secret: a different tenant
    let other = {
        let mut config = owner.state.config().clone();
        config.auth.token = Some("other-token".to_string());
        let state = fabric_server::state::AppState::new(config, owner.state.blobs().clone(), owner.state.db().clone());
        fabric_server::routes::create_router(state)
    };

    use tower::ServiceExt;
    let response = other
        .oneshot(
            axum::http::Request::builder()
                .uri(format!("/sessions/{}", session_id))
                .header("Authorization", "Bearer other-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_session_validation() {
    let server = TestServer::new().await;

    for payload in [
        json!({ "appName": "   " }),
        json!({ "appName": "x".repeat(129) }),
        json!({ "appName": "App", "metadata": [1, 2] }),
        json!({ "metadata": {} }),
    ] {
        let (status, body) = server.json("POST", "/sessions", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid payload");
    }
}

#[tokio::test]
async fn test_list_sessions_filter() {
    let server = TestServer::new().await;
    server.create_session("ReportBot").await;
    let slides = server.create_session("SlideBot").await;

    let (_, all) = server.json("GET", "/sessions?appName=all", None).await;
    assert_eq!(all["sessions"].as_array().unwrap().len(), 2);

    let (_, filtered) = server.json("GET", "/sessions?appName=SlideBot", None).await;
    let sessions = filtered["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["sessionId"], slides.as_str());
}

#[tokio::test]
async fn test_log_sequences() {
    let server = TestServer::new().await;
    let session_id = server.create_session("ReportBot").await;
    let uri = format!("/sessions/{}/logs", session_id);

    let (status, body) = server
        .json(
            "POST",
            &uri,
            Some(json!({ "entries": [{ "level": "info", "message": "Task completed" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inserted"], 1);

    server
        .json(
            "POST",
            &uri,
            Some(json!({ "entries": [{ "message": "second" }, { "level": "error", "message": "third", "context": { "k": 1 } }] })),
        )
        .await;

    let (status, body) = server.json("GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["id"], session_id.as_str());
    let entries = body["entries"].as_array().unwrap();
    let sequences: Vec<i64> = entries.iter().map(|e| e["sequence"].as_i64().unwrap()).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(entries[0]["message"], "Task completed");
    assert_eq!(entries[1]["level"], "info");
    assert_eq!(entries[2]["context"], json!({ "k": 1 }));

    let (_, session) = server.json("GET", &format!("/sessions/{}", session_id), None).await;
    assert_eq!(session["metrics"]["logCount"], 3);
}

#[tokio::test]
async fn test_log_validation() {
    let server = TestServer::new().await;
    let session_id = server.create_session("App").await;
    let uri = format!("/sessions/{}/logs", session_id);

    let (status, _) = server.json("POST", &uri, Some(json!({ "entries": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.json("POST", &uri, Some(json!({ "entries": [{ "message": "" }] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .json("POST", "/sessions/UNKNOWN0000000000000/logs", Some(json!({ "entries": [{ "message": "x" }] })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");

    // Unknown session wins over a malformed body
    let response = server
        .send(
            "POST",
            "/sessions/UNKNOWN0000000000000/logs",
            Some(TOKEN),
            &[("Content-Type", "application/json")],
            Body::from("{not json"),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let (status, body) = server.json("POST", &uri, Some(json!({ "entries": "nope" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid payload");
}

// ============================================================================
// Assets
// ============================================================================

#[tokio::test]
async fn test_asset_round_trip() {
    let server = TestServer::new().await;
    let session_id = server.create_session("ReportBot").await;
    let report: &[u8] = b"# Report\n";
    let index: &[u8] = b"<html><body>hi</body></html>";

    let (status, body) = server
        .upload_zip(
            &format!("/sessions/{}/assets", session_id),
            zip_of(&[("report.md", report), ("index.html", index)]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stored"], 2);

    let (status, body) = server.json("GET", &format!("/sessions/{}/assets", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let assets = body["assets"].as_array().unwrap();
    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0]["filename"], "index.html");
    assert_eq!(assets[1]["contentType"], "text/markdown");

    for asset in assets {
        let url = asset["downloadUrl"].as_str().unwrap();
        let download = server.get(url).await;
        assert_eq!(download.status, StatusCode::OK);
        assert_eq!(asset["checksum"], compute_checksum(&download.body).as_str());
        assert_eq!(asset["size"], download.body.len());
        assert_eq!(download.headers["content-type"], asset["contentType"].as_str().unwrap());
        assert!(download.headers["content-disposition"].to_str().unwrap().starts_with("inline;"));
    }

    let (_, session) = server.json("GET", &format!("/sessions/{}", session_id), None).await;
    assert_eq!(session["metrics"]["assetCount"], 2);
}

#[tokio::test]
async fn test_archive_matches_listing() {
    let server = TestServer::new().await;
    let session_id = server.create_session("ReportBot").await;

    let empty = server.get(&format!("/sessions/{}/assets/archive", session_id)).await;
    assert_eq!(empty.status, StatusCode::NOT_FOUND);
    assert_eq!(empty.json()["error"], "No assets found for session");

    server
        .upload_zip(
            &format!("/sessions/{}/assets", session_id),
            zip_of(&[("report.md", b"# R"), ("index.html", b"<p>")]),
        )
        .await;

    let archive = server.get(&format!("/sessions/{}/assets/archive", session_id)).await;
    assert_eq!(archive.status, StatusCode::OK);
    assert_eq!(archive.headers["content-type"], "application/zip");
    assert_eq!(
        archive.headers["content-disposition"],
        format!("attachment; filename=\"{}.zip\"", session_id).as_str()
    );

    let entries = unzip(&archive.body);
    assert_eq!(
        entries,
        vec![
            ("index.html".to_string(), b"<p>".to_vec()),
            ("report.md".to_string(), b"# R".to_vec()),
        ]
    );
}

#[tokio::test]
async fn test_traversal_rejected_without_rows() {
    let server = TestServer::new().await;
    let session_id = server.create_session("ReportBot").await;

    let (status, body) = server
        .upload_zip(
            &format!("/sessions/{}/assets", session_id),
            zip_of(&[("ok.txt", b"fine"), ("../../etc/passwd", b"root")]),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported entry path: ../../etc/passwd");
    assert!(AssetRepository::new(server.state.db()).list(&session_id).await.unwrap().is_empty());
    assert!(server.state.blobs().list("sessions/").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reupload_is_latest_wins() {
    let server = TestServer::new().await;
    let session_id = server.create_session("ReportBot").await;
    let uri = format!("/sessions/{}/assets", session_id);

    server.upload_zip(&uri, zip_of(&[("data.txt", b"one")])).await;
    server.upload_zip(&uri, zip_of(&[("data.txt", b"second version")])).await;

    let (_, body) = server.json("GET", &uri, None).await;
    let assets = body["assets"].as_array().unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0]["size"], 14);
    assert_eq!(assets[0]["checksum"], compute_checksum(b"second version").as_str());

    let download = server.get(&format!("{}/data.txt", uri)).await;
    assert_eq!(download.body, b"second version");
}

#[tokio::test]
async fn test_upload_guards() {
    let server = TestServer::with_config(|config| config.upload.max_upload_mb = 1).await;
    let session_id = server.create_session("App").await;
    let uri = format!("/sessions/{}/assets", session_id);

    let wrong_type = server
        .send("POST", &uri, Some(TOKEN), &[("Content-Type", "application/json")], Body::from("{}"))
        .await;
    assert_eq!(wrong_type.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let too_big = server
        .send(
            "POST",
            &uri,
            Some(TOKEN),
            &[("Content-Type", "application/zip")],
            Body::from(vec![0u8; 1024 * 1024 + 1]),
        )
        .await;
    assert_eq!(too_big.status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, body) = server.upload_zip(&uri, b"not a zip".to_vec()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid zip archive");

    let (status, body) = server.upload_zip(&uri, zip_of(&[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Zip archive contained no files");
}

#[tokio::test]
async fn test_decompressed_size_is_bounded() {
    let server = TestServer::with_config(|config| {
        config.upload.max_upload_mb = 1;
        config.upload.extract_ratio = 1;
    })
    .await;
    let session_id = server.create_session("App").await;
    let uri = format!("/sessions/{}/assets", session_id);

    // A couple of KiB on the wire, 2 MiB once inflated
    let zeros = vec![0u8; 2 * 1024 * 1024];
    let bomb = zip_of(&[("zeros.bin", zeros.as_slice())]);
    assert!(bomb.len() < 1024 * 1024);

    let (status, body) = server.upload_zip(&uri, bomb).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "Decompressed archive exceeds 1048576 byte limit");
    assert!(AssetRepository::new(server.state.db()).list(&session_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_declared_entry_size_is_not_trusted() {
    let server = TestServer::new().await;
    let session_id = server.create_session("App").await;
    let uri = format!("/sessions/{}/assets", session_id);

    let crafted = zip_with_declared_size("huge.txt", b"hello", 0xFFFF_FFF0);
    let (status, _) = server.upload_zip(&uri, crafted).await;
    assert!(status == StatusCode::OK || status == StatusCode::BAD_REQUEST, "{}", status);

    if status == StatusCode::OK {
        let download = server.get(&format!("{}/huge.txt", uri)).await;
        assert_eq!(download.body, b"hello");
    }

    let health = server.send("GET", "/health", None, &[], Body::empty()).await;
    assert_eq!(health.status, StatusCode::OK);
}

#[tokio::test]
async fn test_file_and_directory_with_same_name() {
    let server = TestServer::new().await;
    let session_id = server.create_session("App").await;
    let uri = format!("/sessions/{}/assets", session_id);

    let (status, body) = server.upload_zip(&uri, zip_of(&[("x", b"1"), ("x/y.txt", b"2")])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stored"], 2);

    let (status, body) = server.upload_zip(&uri, zip_of(&[("docs", b"d")])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stored"], 1);
    let (status, _) = server.upload_zip(&uri, zip_of(&[("docs/readme.md", b"r")])).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(server.get(&format!("{}/x", uri)).await.body, b"1");
    assert_eq!(server.get(&format!("{}/x%2Fy.txt", uri)).await.body, b"2");
    assert_eq!(server.get(&format!("{}/docs", uri)).await.body, b"d");
    assert_eq!(server.get(&format!("{}/docs/readme.md", uri)).await.body, b"r");

    let (_, listing) = server.json("GET", &uri, None).await;
    assert_eq!(listing["assets"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_duplicate_entry_paths_count_once() {
    let server = TestServer::new().await;
    let session_id = server.create_session("App").await;
    let uri = format!("/sessions/{}/assets", session_id);

    let (status, body) = server
        .upload_zip(&uri, zip_of(&[("a.txt", b"first"), ("./a.txt", b"second")]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stored"], 1);

    let (_, listing) = server.json("GET", &uri, None).await;
    let assets = listing["assets"].as_array().unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0]["checksum"], compute_checksum(b"second").as_str());
}

#[tokio::test]
async fn test_asset_lookup_errors() {
    let server = TestServer::new().await;
    let session_id = server.create_session("App").await;

    let missing = server.get(&format!("/sessions/{}/assets/nope.txt", session_id)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json()["error"], "Asset not found");

    let invalid = server.get(&format!("/sessions/{}/assets/..%2Fsecret", session_id)).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json()["error"], "Invalid asset name");
}

#[tokio::test]
async fn test_archive_with_missing_blob_is_500() {
    let server = TestServer::new().await;
    let session_id = server.create_session("App").await;
    server
        .upload_zip(&format!("/sessions/{}/assets", session_id), zip_of(&[("a.txt", b"a")]))
        .await;

    server
        .state
        .blobs()
        .delete(&format!("sessions/{}/a.txt", session_id))
        .await
        .unwrap();

    let archive = server.get(&format!("/sessions/{}/assets/archive", session_id)).await;
    assert_eq!(archive.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(archive.json()["error"], "Asset storage inconsistent");

    let single = server.get(&format!("/sessions/{}/assets/a.txt", session_id)).await;
    assert_eq!(single.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// App storage
// ============================================================================

#[tokio::test]
async fn test_app_log_pagination() {
    let server = TestServer::new().await;
    for i in 0..5 {
        let (status, body) = server
            .json("POST", "/apps/myapp/storage/logs", Some(json!({ "message": format!("log {}", i) })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["log"]["level"], "info");
    }

    let (status, page) = server.json("GET", "/apps/myapp/storage/logs?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["logs"].as_array().unwrap().len(), 2);
    assert!(page["nextCursor"].is_string());

    let mut seen = std::collections::HashSet::new();
    let mut uri = "/apps/myapp/storage/logs?limit=2".to_string();
    loop {
        let (_, page) = server.json("GET", &uri, None).await;
        let logs = page["logs"].as_array().unwrap();
        assert!(logs.len() <= 2);
        for log in logs {
            assert!(seen.insert(log["id"].as_str().unwrap().to_string()));
        }
        match page["nextCursor"].as_str() {
            Some(cursor) => uri = format!("/apps/myapp/storage/logs?limit=2&cursor={}", cursor),
            None => break,
        }
    }
    assert_eq!(seen.len(), 5);

    let (status, body) = server.json("GET", "/apps/myapp/storage/logs?cursor=bm9wZQ", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid cursor");

    let (status, _) = server.json("GET", "/apps/myapp/storage/logs?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_app_log_update_and_delete() {
    let server = TestServer::new().await;
    let (_, created) = server
        .json(
            "POST",
            "/apps/myapp/storage/logs",
            Some(json!({ "level": "info", "message": "hello", "metadata": { "a": 1 } })),
        )
        .await;
    let id = created["log"]["id"].as_str().unwrap().to_string();
    let uri = format!("/apps/myapp/storage/logs/{}", id);

    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let (status, updated) = server.json("PUT", &uri, Some(json!({ "message": "changed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["log"]["message"], "changed");
    assert_eq!(updated["log"]["metadata"], json!({ "a": 1 }));
    assert!(updated["log"]["updatedAt"].as_str().unwrap() > created["log"]["updatedAt"].as_str().unwrap());

    let (_, cleared) = server.json("PUT", &uri, Some(json!({ "metadata": null }))).await;
    assert!(cleared["log"]["metadata"].is_null());

    let (status, _) = server.json("PUT", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, fetched) = server.json("GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["log"]["id"], id.as_str());

    let (status, body) = server.json("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = server.json("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_app_name() {
    let server = TestServer::new().await;
    let (status, _) = server.json("GET", "/apps/bad%20name/storage/logs", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.json("GET", "/apps/../storage/objects", None).await;
    assert_ne!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_app_objects_lifecycle() {
    let server = TestServer::new().await;
    let base = "/apps/myapp/storage/objects";

    let (status, body) = server
        .upload_zip(base, zip_of(&[("cfg/settings.json", b"{}"), ("notes.txt", b"hi")]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stored"], 2);

    let put = server
        .send(
            "PUT",
            &format!("{}/raw.bin", base),
            Some(TOKEN),
            &[("X-Object-Metadata", r#"{"owner":"me"}"#)],
            Body::from(vec![1u8, 2, 3]),
        )
        .await;
    assert_eq!(put.status, StatusCode::OK);
    let object = &put.json()["object"];
    assert_eq!(object["filename"], "raw.bin");
    assert_eq!(object["metadata"], json!({ "owner": "me" }));
    assert_eq!(object["contentType"], "application/octet-stream");

    let (_, listing) = server.json("GET", base, None).await;
    let names: Vec<&str> = listing["objects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["filename"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["cfg/settings.json", "notes.txt", "raw.bin"]);
    assert_eq!(
        listing["objects"][0]["downloadUrl"],
        "/apps/myapp/storage/objects/cfg%2Fsettings.json"
    );

    let download = server.get(&format!("{}/notes.txt", base)).await;
    assert_eq!(download.body, b"hi");

    let archive = server.get(&format!("{}/archive", base)).await;
    assert_eq!(archive.status, StatusCode::OK);
    assert_eq!(archive.headers["content-disposition"], "attachment; filename=\"myapp.zip\"");
    assert_eq!(unzip(&archive.body).len(), 3);

    let (status, body) = server.json("DELETE", &format!("{}/notes.txt", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
    assert!(server.state.blobs().get("apps/myapp/objects/notes.txt").await.unwrap().is_none());

    let (status, _) = server.json("DELETE", &format!("{}/notes.txt", base), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_put_object_rejects_bad_metadata_header() {
    let server = TestServer::new().await;
    let response = server
        .send(
            "PUT",
            "/apps/myapp/storage/objects/a.txt",
            Some(TOKEN),
            &[("X-Object-Metadata", "[1,2]")],
            Body::from("x"),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
