//! HTTP client for the game server.
//!
//! Every gameplay endpoint returns a full [`Snapshot`]; the two score
//! endpoints return a [`HighScoreResponse`]. Failures are split into the two
//! classes the UI treats differently: `Transport` (retryable, the loop holds)
//! and `Protocol` (the loop stops and reports).

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::{HighScoreResponse, MoveRequest, ScoreSubmission, Snapshot};
use crate::types::Direction;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
const DEFAULT_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Server unreachable, timed out, or the connection dropped.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// The server answered with something we refuse to render.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// Connection settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Append one JSON record per request/response line to this file.
    pub wire_log: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            wire_log: None,
        }
    }
}

impl ClientConfig {
    /// Create from environment variables; CLI flags override these in `main`.
    pub fn from_env() -> Self {
        use std::env;

        let base_url =
            env::var("BLOCKFALL_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        let timeout_ms = env::var("BLOCKFALL_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let wire_log = env::var("BLOCKFALL_WIRE_LOG")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Self {
            base_url,
            timeout: Duration::from_millis(timeout_ms),
            wire_log,
        }
    }
}

/// Async client for the game server. Cheap to clone; clones share the
/// connection pool and wire log.
#[derive(Debug, Clone)]
pub struct GameClient {
    http: reqwest::Client,
    base: String,
    wire: Option<WireLog>,
}

impl GameClient {
    /// Build the client. Must be called inside a tokio runtime when a wire
    /// log is configured (the log appender runs as a spawned task).
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base: normalize_base(&config.base_url),
            wire: config.wire_log.clone().map(WireLog::spawn),
        })
    }

    /// `GET /state` — current snapshot, no side effects.
    pub async fn state(&self) -> Result<Snapshot, ClientError> {
        self.request(Method::GET, "/state", None::<&()>).await
    }

    /// `GET /reset` — discard the server-side game and return a fresh snapshot.
    pub async fn reset(&self) -> Result<Snapshot, ClientError> {
        self.request(Method::GET, "/reset", None::<&()>).await
    }

    /// `POST /move` — player move; the server is the sole arbiter of legality.
    pub async fn move_piece(&self, direction: Direction) -> Result<Snapshot, ClientError> {
        self.request(Method::POST, "/move", Some(&MoveRequest { direction }))
            .await
    }

    /// `POST /move_down` — one gravity tick.
    pub async fn move_down(&self) -> Result<Snapshot, ClientError> {
        self.request(Method::POST, "/move_down", None::<&()>).await
    }

    /// `POST /remove_lines` — drop the rows marked clearing.
    pub async fn remove_lines(&self) -> Result<Snapshot, ClientError> {
        self.request(Method::POST, "/remove_lines", None::<&()>).await
    }

    /// `POST /pause` — toggle the server-side pause flag.
    pub async fn toggle_pause(&self) -> Result<Snapshot, ClientError> {
        self.request(Method::POST, "/pause", None::<&()>).await
    }

    /// `GET /get_high_scores`.
    pub async fn high_scores(&self) -> Result<HighScoreResponse, ClientError> {
        self.request(Method::GET, "/get_high_scores", None::<&()>)
            .await
    }

    /// `POST /submit_score`.
    pub async fn submit_score(
        &self,
        name: &str,
        score: u32,
    ) -> Result<HighScoreResponse, ClientError> {
        let body = ScoreSubmission {
            name: name.to_string(),
            score,
        };
        self.request(Method::POST, "/submit_score", Some(&body)).await
    }

    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = format!("{}{}", self.base, path);

        let encoded = match body {
            Some(b) => Some(
                serde_json::to_string(b)
                    .map_err(|err| ClientError::Protocol(format!("encode {path}: {err}")))?,
            ),
            None => None,
        };

        let mut req = self.http.request(method, &url);
        if let Some(ref payload) = encoded {
            req = req
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload.clone());
        }

        if let Some(wire) = &self.wire {
            wire.record("send", path, encoded.as_deref().unwrap_or(""));
        }

        let resp = req.send().await.map_err(ClientError::Transport)?;
        let status = resp.status();
        let text = resp.text().await.map_err(ClientError::Transport)?;

        if let Some(wire) = &self.wire {
            wire.record("recv", path, &text);
        }

        if !status.is_success() {
            return Err(ClientError::Protocol(format!(
                "unexpected status {status} from {path}"
            )));
        }

        serde_json::from_str(&text)
            .map_err(|err| ClientError::Protocol(format!("bad response from {path}: {err}")))
    }
}

fn normalize_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

/// Append-only JSONL journal of everything sent and received, for debugging
/// desyncs against a live server.
#[derive(Debug, Clone)]
struct WireLog {
    tx: mpsc::UnboundedSender<WireRecord>,
}

#[derive(Debug, Serialize)]
struct WireRecord {
    dir: &'static str,
    path: String,
    body: String,
}

impl WireLog {
    fn spawn(path: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WireRecord>();
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;

            let mut file = match tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
            {
                Ok(f) => f,
                Err(err) => {
                    eprintln!("[client] wire log {} disabled: {err}", path.display());
                    return;
                }
            };

            let mut buf: Vec<u8> = Vec::with_capacity(1024);
            while let Some(rec) = rx.recv().await {
                buf.clear();
                if serde_json::to_writer(&mut buf, &rec).is_err() {
                    continue;
                }
                buf.push(b'\n');
                if file.write_all(&buf).await.is_err() {
                    break;
                }
            }
            let _ = file.flush().await;
        });
        Self { tx }
    }

    fn record(&self, dir: &'static str, path: &str, body: &str) {
        let _ = self.tx.send(WireRecord {
            dir,
            path: path.to_string(),
            body: body.to_string(),
        });
    }
}
