//! GameClient against a canned single-request HTTP fixture.
//!
//! The fixture is a raw TCP listener that reads one full HTTP request, sends
//! back a prepared response, and returns the request text for assertions.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use blockfall_tui::client::{ClientConfig, GameClient};
use blockfall_tui::protocol::{HighScoreEntry, HighScoreResponse, Snapshot};
use blockfall_tui::types::Direction;

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Serve exactly one HTTP request with the given status and JSON body.
/// Returns the raw request (head + body) that the client sent.
fn serve_once(listener: TcpListener, status: &'static str, body: String) -> JoinHandle<String> {
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut buf: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.expect("read");
            assert!(n > 0, "client closed before sending a full request head");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let lower = line.to_ascii_lowercase();
                lower
                    .strip_prefix("content-length:")
                    .and_then(|v| v.trim().parse::<usize>().ok())
            })
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.expect("read body");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.expect("write");
        let _ = socket.shutdown().await;

        String::from_utf8_lossy(&buf).to_string()
    })
}

async fn client_for(listener: &TcpListener) -> GameClient {
    let addr = listener.local_addr().unwrap();
    let config = ClientConfig {
        base_url: format!("http://{addr}"),
        timeout: Duration::from_secs(2),
        wire_log: None,
    };
    GameClient::new(&config).unwrap()
}

fn snapshot_body(level: u32, score: u32) -> String {
    let snap = Snapshot {
        level,
        score,
        ..Snapshot::default()
    };
    serde_json::to_string(&snap).unwrap()
}

#[tokio::test]
async fn move_down_posts_and_decodes_snapshot() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener).await;
    let server = serve_once(listener, "200 OK", snapshot_body(3, 700));

    let snap = client.move_down().await.unwrap();
    assert_eq!(snap.level, 3);
    assert_eq!(snap.score, 700);

    let request = server.await.unwrap();
    assert!(
        request.starts_with("POST /move_down HTTP/1.1"),
        "unexpected request: {request}"
    );
}

#[tokio::test]
async fn move_sends_direction_json() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener).await;
    let server = serve_once(listener, "200 OK", snapshot_body(1, 0));

    client.move_piece(Direction::Left).await.unwrap();

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /move HTTP/1.1"));
    assert!(
        request.contains(r#"{"direction":"left"}"#),
        "body missing direction: {request}"
    );
    assert!(request
        .to_ascii_lowercase()
        .contains("content-type: application/json"));
}

#[tokio::test]
async fn state_and_reset_use_get() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener).await;
    let server = serve_once(listener, "200 OK", snapshot_body(1, 0));
    client.state().await.unwrap();
    let request = server.await.unwrap();
    assert!(request.starts_with("GET /state HTTP/1.1"));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener).await;
    let server = serve_once(listener, "200 OK", snapshot_body(1, 0));
    client.reset().await.unwrap();
    let request = server.await.unwrap();
    assert!(request.starts_with("GET /reset HTTP/1.1"));
}

#[tokio::test]
async fn error_status_is_a_protocol_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener).await;
    let _server = serve_once(listener, "500 INTERNAL SERVER ERROR", "boom".to_string());

    let err = client.move_down().await.unwrap_err();
    assert!(!err.is_transport(), "expected protocol error, got {err}");
}

#[tokio::test]
async fn malformed_body_is_a_protocol_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener).await;
    let _server = serve_once(listener, "200 OK", r#"{"board": "what"}"#.to_string());

    let err = client.state().await.unwrap_err();
    assert!(!err.is_transport());
    assert!(err.to_string().contains("/state"), "error names the endpoint: {err}");
}

#[tokio::test]
async fn submit_score_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener).await;
    let response = HighScoreResponse {
        high_scores: vec![HighScoreEntry {
            name: "ada".to_string(),
            score: 9000,
        }],
        is_high_score: Some(true),
    };
    let server = serve_once(listener, "200 OK", serde_json::to_string(&response).unwrap());

    let resp = client.submit_score("ada", 9000).await.unwrap();
    assert_eq!(resp.is_high_score, Some(true));
    assert_eq!(resp.high_scores.len(), 1);
    assert_eq!(resp.high_scores[0].name, "ada");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /submit_score HTTP/1.1"));
    assert!(request.contains(r#""name":"ada""#));
    assert!(request.contains(r#""score":9000"#));
}

#[tokio::test]
async fn high_scores_uses_get_endpoint() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener).await;
    let server = serve_once(
        listener,
        "200 OK",
        r#"{"high_scores": []}"#.to_string(),
    );

    let resp = client.high_scores().await.unwrap();
    assert!(resp.high_scores.is_empty());
    assert_eq!(resp.is_high_score, None);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /get_high_scores HTTP/1.1"));
}
