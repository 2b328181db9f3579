//! Origin allow-list for socket handshakes.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::ORIGIN;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// Set of origins allowed to open socket sessions.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Arc<[String]>,
}

impl OriginPolicy {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed: Vec<String> = origins
            .into_iter()
            .map(|origin| normalize(origin.as_ref()).to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        Self {
            allowed: allowed.into(),
        }
    }

    pub fn origins(&self) -> &[String] {
        &self.allowed
    }

    pub fn allows(&self, origin: &str) -> bool {
        let origin = normalize(origin);
        self.allowed.iter().any(|allowed| allowed == origin)
    }

    /// Return the first `Origin` header value on the allow-list.
    pub fn check(&self, headers: &HeaderMap) -> Result<String, OriginRejected> {
        let mut seen = Vec::new();
        for value in headers.get_all(ORIGIN) {
            let Ok(origin) = value.to_str() else {
                continue;
            };
            if self.allows(origin) {
                return Ok(normalize(origin).to_string());
            }
            seen.push(origin.to_string());
        }
        Err(OriginRejected { seen })
    }
}

fn normalize(origin: &str) -> &str {
    origin.trim().trim_end_matches('/')
}

/// Handshake refused because no acceptable `Origin` header was present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginRejected {
    pub seen: Vec<String>,
}

impl IntoResponse for OriginRejected {
    fn into_response(self) -> Response {
        (StatusCode::FORBIDDEN, "origin not allowed").into_response()
    }
}

/// Extractor that admits only allow-listed origins.
///
/// Place it before `WebSocketUpgrade` so rejected handshakes never upgrade.
#[derive(Debug, Clone)]
pub struct CheckedOrigin(pub String);

impl<S> FromRequestParts<S> for CheckedOrigin
where
    OriginPolicy: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = OriginRejected;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let policy = OriginPolicy::from_ref(state);
        policy.check(&parts.headers).map(Self).map_err(|rejected| {
            warn!(origins = ?rejected.seen, path = %parts.uri.path(), "Rejected socket handshake");
            rejected
        })
    }
}
