mod common;

use std::time::Duration;

use common::{build_client, build_client_with_timeout, pair};
use futures::future::join_all;
use http::StatusCode;
use kobetsu_client::{ApiRequest, ClientError, Page, ResponseBody, TokenStore};
use mockito::{Matcher, Server};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn attaches_bearer_token_when_stored() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", "/factories")
        .match_header("authorization", "Bearer A1")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_body(r#"{"items": [{"id": 1, "name": "Okayama Plant"}], "total": 1}"#)
        .create_async()
        .await;

    let t = build_client(&server.url(), Some(pair("A1", "R1")));
    let body = t
        .client
        .send(ApiRequest::get("/factories"))
        .await
        .expect("request should succeed");

    m.assert_async().await;
    assert_eq!(body.into_json().unwrap()["total"], json!(1));
}

#[tokio::test]
async fn omits_authorization_without_token() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", "/health")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"status": "ok"}"#)
        .create_async()
        .await;

    let t = build_client(&server.url(), None);
    t.client
        .send(ApiRequest::get("/health"))
        .await
        .expect("unauthenticated request should succeed");

    m.assert_async().await;
}

#[tokio::test]
async fn refreshes_and_retries_with_new_token() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/kobetsu")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .with_body(r#"{"detail": "token expired"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .match_body(Matcher::Json(json!({ "refresh_token": "R1" })))
        .with_status(200)
        .with_body(r#"{"access_token": "A2", "refresh_token": "R2"}"#)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/kobetsu")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body(r#"{"items": [], "total": 0}"#)
        .expect(1)
        .create_async()
        .await;

    let t = build_client(&server.url(), Some(pair("A1", "R1")));
    let page: Page<Value> = t
        .client
        .send_json(ApiRequest::get("/kobetsu"))
        .await
        .expect("retried request should succeed");

    rejected.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
    assert_eq!(page, Page::default());
    assert_eq!(t.store.get().await.unwrap(), Some(pair("A2", "R2")));
    assert!(t.navigator.redirects().is_empty());
}

#[tokio::test]
async fn failed_refresh_clears_session_and_redirects() {
    let mut server = Server::new_async().await;
    let original = server
        .mock("GET", "/employees")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(401)
        .with_body(r#"{"detail": "refresh token revoked"}"#)
        .expect(1)
        .create_async()
        .await;

    let t = build_client(&server.url(), Some(pair("A1", "R1")));
    let err = t
        .client
        .send(ApiRequest::get("/employees"))
        .await
        .expect_err("request should fail");

    original.assert_async().await;
    refresh.assert_async().await;
    assert!(err.is_session_expired(), "unexpected error: {:?}", err);
    assert_eq!(t.store.access_token().await.unwrap(), None);
    assert_eq!(t.store.refresh_token().await.unwrap(), None);
    assert_eq!(t.navigator.redirects(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn retried_request_rejected_again_is_not_retried() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/lines/7")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_body(r#"{"access_token": "A2", "refresh_token": "R2"}"#)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/lines/7")
        .match_header("authorization", "Bearer A2")
        .with_status(401)
        .with_body(r#"{"detail": "not allowed"}"#)
        .expect(1)
        .create_async()
        .await;

    let t = build_client(&server.url(), Some(pair("A1", "R1")));
    let err = t
        .client
        .send(ApiRequest::get("/lines/7"))
        .await
        .expect_err("second 401 must surface");

    first.assert_async().await;
    refresh.assert_async().await;
    second.assert_async().await;
    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(body.contains("not allowed"));
        }
        other => panic!("expected the original 401, got {:?}", other),
    }
    assert_eq!(t.store.get().await.unwrap(), Some(pair("A2", "R2")));
    assert!(t.navigator.redirects().is_empty());
}

#[tokio::test]
async fn non_auth_errors_leave_session_alone() {
    let mut server = Server::new_async().await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;
    server
        .mock("GET", "/dashboard")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;
    server
        .mock("DELETE", "/factories/3")
        .with_status(403)
        .create_async()
        .await;

    let t = build_client(&server.url(), Some(pair("A1", "R1")));

    let err = t
        .client
        .send(ApiRequest::get("/dashboard"))
        .await
        .expect_err("500 should surface");
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

    let err = t
        .client
        .send(ApiRequest::delete("/factories/3"))
        .await
        .expect_err("403 should surface");
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert!(!err.is_session_expired());

    refresh.assert_async().await;
    assert_eq!(t.store.get().await.unwrap(), Some(pair("A1", "R1")));
    assert!(t.navigator.redirects().is_empty());
}

#[tokio::test]
async fn transport_errors_leave_session_alone() {
    // Nothing listens on port 1.
    let t = build_client("http://127.0.0.1:1", Some(pair("A1", "R1")));
    let err = t
        .client
        .send(ApiRequest::get("/kobetsu"))
        .await
        .expect_err("connection should be refused");

    assert!(matches!(err, ClientError::Transport(_)), "unexpected error: {:?}", err);
    assert_eq!(err.status(), None);
    assert_eq!(t.store.get().await.unwrap(), Some(pair("A1", "R1")));
    assert!(t.navigator.redirects().is_empty());
}

#[tokio::test]
async fn timeouts_surface_as_transport_errors() {
    // Bound but never accepted: the connection queues and no answer ever comes.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let t = build_client_with_timeout(&base_url, Some(pair("A1", "R1")), 200);
    let err = t
        .client
        .send(ApiRequest::get("/kobetsu"))
        .await
        .expect_err("request should time out");

    match &err {
        ClientError::Transport(e) => assert!(e.is_timeout(), "expected a timeout, got {:?}", e),
        other => panic!("expected a transport error, got {:?}", other),
    }
    assert_eq!(t.store.get().await.unwrap(), Some(pair("A1", "R1")));
    assert!(t.navigator.redirects().is_empty());
    drop(listener);
}

/// Answers every request with 401, except the refresh endpoint, which never answers.
async fn serve_401_with_hanging_refresh(listener: TcpListener) {
    let mut held: Vec<TcpStream> = Vec::new();
    loop {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        if request.starts_with(b"POST /auth/refresh") {
            held.push(socket);
        } else {
            let _ = socket
                .write_all(b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
        }
    }
}

#[tokio::test]
async fn refresh_timeout_ends_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(serve_401_with_hanging_refresh(listener));

    let t = build_client_with_timeout(&base_url, Some(pair("A1", "R1")), 300);
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        t.client.send(ApiRequest::get("/kobetsu")),
    )
    .await
    .expect("the refresh call should be cut off by the client timeout")
    .expect_err("request should fail");

    assert!(err.is_session_expired(), "unexpected error: {:?}", err);
    assert_eq!(t.store.get().await.unwrap(), None);
    assert_eq!(t.navigator.redirects(), vec!["/login".to_string()]);
    server.abort();
}

#[tokio::test]
async fn concurrent_401s_share_a_single_refresh() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/kobetsu")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(3)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_body(r#"{"access_token": "A2", "refresh_token": "R2"}"#)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/kobetsu")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body(r#"{"items": [], "total": 0}"#)
        .expect(3)
        .create_async()
        .await;

    let t = build_client(&server.url(), Some(pair("A1", "R1")));
    let results = join_all((0..3).map(|_| t.client.send(ApiRequest::get("/kobetsu")))).await;

    rejected.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
    for result in results {
        assert!(result.is_ok(), "every caller should get the retried response");
    }
    assert_eq!(t.store.get().await.unwrap(), Some(pair("A2", "R2")));
}

#[tokio::test]
async fn sends_query_and_json_body() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("POST", "/kobetsu")
        .match_query(Matcher::UrlEncoded("draft".into(), "true".into()))
        .match_body(Matcher::Json(json!({
            "factory_id": 4,
            "line_id": 12,
            "headcount": 3
        })))
        .with_status(201)
        .with_body(r#"{"id": 99}"#)
        .create_async()
        .await;

    let t = build_client(&server.url(), Some(pair("A1", "R1")));
    let body = t
        .client
        .send(
            ApiRequest::post("/kobetsu")
                .query("draft", true)
                .json(json!({ "factory_id": 4, "line_id": 12, "headcount": 3 })),
        )
        .await
        .expect("create should succeed");

    m.assert_async().await;
    assert_eq!(body, ResponseBody::Json(json!({ "id": 99 })));
}

#[tokio::test]
async fn blob_responses_are_returned_raw() {
    let mut server = Server::new_async().await;
    let payload: Vec<u8> = vec![0x50, 0x4b, 0x03, 0x04, 0x00, 0xff];
    server
        .mock("GET", "/kobetsu/export")
        .with_status(200)
        .with_header("content-type", "application/octet-stream")
        .with_body(payload.clone())
        .create_async()
        .await;

    let t = build_client(&server.url(), Some(pair("A1", "R1")));
    let body = t
        .client
        .send(ApiRequest::get("/kobetsu/export").blob())
        .await
        .expect("export should succeed");

    assert_eq!(body, ResponseBody::Blob(payload));
}

#[tokio::test]
async fn empty_success_body_decodes_to_null() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/employees/5")
        .with_status(204)
        .create_async()
        .await;

    let t = build_client(&server.url(), Some(pair("A1", "R1")));
    let body = t
        .client
        .send(ApiRequest::put("/employees/5").json(json!({ "name": "Sato" })))
        .await
        .expect("update should succeed");

    assert_eq!(body, ResponseBody::Json(Value::Null));
}
