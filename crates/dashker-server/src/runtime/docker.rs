//! Docker Engine API client over the daemon's Unix socket.
//!
//! Every call opens its own HTTP/1.1 connection. Streaming bodies (logs,
//! events, stats) and exec attachments own that connection, so dropping
//! the returned handle closes it.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, future, stream::BoxStream};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::client::conn::http1::{self, SendRequest};
use hyper::header::{CONNECTION, CONTENT_TYPE, HOST, UPGRADE};
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::net::UnixStream;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use tracing::debug;

use dashker_core::config::RuntimeConfig;
use dashker_core::mux::DEFAULT_MAX_PAYLOAD;

use super::{
    ContainerFilter, ContainerInfo, ContainerSummary, EventStream, ExecConfig, ExecSession,
    ExecState, LogOptions, LogStream, Result, RuntimeClient, RuntimeError, StatsStream,
    validate_id,
};

/// Client for a Docker-compatible engine listening on a Unix socket.
#[derive(Debug, Clone)]
pub struct DockerClient {
    socket_path: PathBuf,
    /// `/v1.43`-style prefix, or empty for the engine's default version.
    api_prefix: String,
    /// Longest JSON document accepted from the events and stats streams.
    max_line_bytes: usize,
}

impl DockerClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            api_prefix: String::new(),
            max_line_bytes: DEFAULT_MAX_PAYLOAD,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        let client = Self::new(config.socket_path.clone());
        match &config.api_version {
            Some(version) => client.with_api_version(version),
            None => client,
        }
    }

    #[must_use]
    pub fn with_api_version(mut self, version: &str) -> Self {
        let version = version.trim_start_matches('/');
        self.api_prefix = if version.starts_with('v') {
            format!("/{version}")
        } else {
            format!("/v{version}")
        };
        self
    }

    #[must_use]
    pub const fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    fn path(&self, path: &str) -> String {
        format!("{}{path}", self.api_prefix)
    }

    async fn connect(&self) -> Result<SendRequest<Full<Bytes>>> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| RuntimeError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        let (sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.with_upgrades().await {
                debug!(error = %e, "Runtime connection closed");
            }
        });
        Ok(sender)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        upgrade: bool,
    ) -> Result<Request<Full<Bytes>>> {
        let mut builder = Request::builder()
            .method(method)
            .uri(self.path(path))
            .header(HOST, "localhost");
        if upgrade {
            builder = builder.header(CONNECTION, "Upgrade").header(UPGRADE, "tcp");
        }
        let request = match body {
            Some(bytes) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(bytes)))?,
            None => builder.body(Full::new(Bytes::new()))?,
        };
        Ok(request)
    }

    /// Send `request`, turning 4xx/5xx answers into [`RuntimeError::Api`].
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<Response<Incoming>> {
        debug!(method = %request.method(), uri = %request.uri(), "Runtime request");
        let mut sender = self.connect().await?;
        let response = sender.send_request(request).await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(api_error(response).await);
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T> {
        let response = self.send(self.request(method, path, body, false)?).await?;
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn call(&self, method: Method, path: &str) -> Result<()> {
        let response = self.send(self.request(method, path, None, false)?).await?;
        response.into_body().collect().await?;
        Ok(())
    }

    async fn stream(&self, path: &str) -> Result<Incoming> {
        let response = self.send(self.request(Method::GET, path, None, false)?).await?;
        Ok(response.into_body())
    }
}

#[async_trait]
impl RuntimeClient for DockerClient {
    async fn ping(&self) -> Result<()> {
        self.call(Method::GET, "/_ping").await
    }

    async fn list_containers(&self, filter: &ContainerFilter) -> Result<Vec<ContainerSummary>> {
        self.json(Method::GET, &format!("/containers/json?{}", filter.query()), None)
            .await
    }

    async fn inspect(&self, id: &str) -> Result<ContainerInfo> {
        let id = validate_id(id)?;
        self.json(Method::GET, &format!("/containers/{id}/json"), None).await
    }

    async fn open_log_stream(&self, id: &str, options: &LogOptions) -> Result<LogStream> {
        let id = validate_id(id)?;
        let body = self
            .stream(&format!("/containers/{id}/logs?{}", options.query()))
            .await?;
        Ok(body_reader(body))
    }

    async fn open_exec_session(&self, id: &str, config: &ExecConfig) -> Result<ExecSession> {
        #[derive(Deserialize)]
        struct Created {
            #[serde(rename = "Id")]
            id: String,
        }

        let id = validate_id(id)?;
        let created: Created = self
            .json(
                Method::POST,
                &format!("/containers/{id}/exec"),
                Some(serde_json::to_vec(config)?),
            )
            .await?;
        let exec_id = validate_id(&created.id)?.to_string();

        let start = serde_json::json!({ "Detach": false, "Tty": config.tty });
        let request = self.request(
            Method::POST,
            &format!("/exec/{exec_id}/start"),
            Some(serde_json::to_vec(&start)?),
            true,
        )?;
        let response = self.send(request).await?;
        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            return Err(RuntimeError::Upgrade(format!(
                "runtime answered {} instead of switching protocols",
                response.status()
            )));
        }
        let upgraded = hyper::upgrade::on(response)
            .await
            .map_err(|e| RuntimeError::Upgrade(e.to_string()))?;

        debug!(container_id = id, exec_id = %exec_id, "Exec session attached");
        Ok(ExecSession {
            id: exec_id,
            io: Box::new(TokioIo::new(upgraded)),
        })
    }

    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecState> {
        let exec_id = validate_id(exec_id)?;
        self.json(Method::GET, &format!("/exec/{exec_id}/json"), None).await
    }

    async fn subscribe_events(&self, since: SystemTime) -> Result<EventStream> {
        let since = since
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        let body = self.stream(&format!("/events?since={since}")).await?;
        Ok(json_lines(body_reader(body), self.max_line_bytes))
    }

    async fn open_stats_stream(&self, id: &str) -> Result<StatsStream> {
        let id = validate_id(id)?;
        let body = self
            .stream(&format!("/containers/{id}/stats?stream=true"))
            .await?;
        Ok(json_lines(body_reader(body), self.max_line_bytes))
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        let id = validate_id(id)?;
        self.call(Method::POST, &format!("/containers/{id}/start")).await
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        let id = validate_id(id)?;
        self.call(Method::POST, &format!("/containers/{id}/stop")).await
    }

    async fn restart_container(&self, id: &str) -> Result<()> {
        let id = validate_id(id)?;
        self.call(Method::POST, &format!("/containers/{id}/restart")).await
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let id = validate_id(id)?;
        self.call(Method::DELETE, &format!("/containers/{id}?force={force}"))
            .await
    }
}

async fn api_error(response: Response<Incoming>) -> RuntimeError {
    let status = response.status().as_u16();
    let message = match response.into_body().collect().await {
        Ok(collected) => error_message(&collected.to_bytes()),
        Err(e) => e.to_string(),
    };
    RuntimeError::Api { status, message }
}

/// The engine reports failures as `{"message": "..."}`.
fn error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_slice::<ErrorBody>(body).map_or_else(
        |_| String::from_utf8_lossy(body).trim().to_string(),
        |parsed| parsed.message,
    )
}

fn body_reader(body: Incoming) -> LogStream {
    let chunks = body.into_data_stream().map_err(std::io::Error::other);
    Box::new(StreamReader::new(Box::pin(chunks)))
}

/// Newline-delimited JSON documents, each at most `max_line` bytes.
fn json_lines<T>(reader: LogStream, max_line: usize) -> BoxStream<'static, Result<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    FramedRead::new(reader, LinesCodec::new_with_max_length(max_line))
        .filter_map(|line| {
            future::ready(match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(serde_json::from_str(&line).map_err(RuntimeError::from)),
                Err(e) => Some(Err(RuntimeError::Stream(e.to_string()))),
            })
        })
        .boxed()
}
