use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use outreach_core::{parse_body, ResponseShape, API_TOKEN_KEY, SESSION_TOKEN_KEY};
use outreach_logging::{outreach_debug, outreach_warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::{ApiError, LocalConfigCache, NetworkFailure, RequestEnvelope, FALLBACK_ERROR_MESSAGE};

/// Header carrying the scraping provider token.
pub const API_TOKEN_HEADER: &str = "X-Apify-Token";
/// Query parameter used to defeat intermediate caches on reads.
pub const CACHE_BUSTER_PARAM: &str = "_t";

const LOGGED_BODY_LIMIT: usize = 2048;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Base URL including any path prefix, e.g. `http://localhost:8081/api`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("outreach/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The single chokepoint every backend call goes through.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn execute(&self, request: RequestEnvelope) -> Result<ResponseShape, ApiError>;
}

/// Produces strictly increasing millisecond stamps.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: AtomicI64,
}

impl CacheBuster {
    pub fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

pub struct ReqwestBackend {
    client: reqwest::Client,
    base_url: String,
    cache: LocalConfigCache,
    buster: CacheBuster,
}

impl ReqwestBackend {
    pub fn new(settings: &ClientSettings, cache: LocalConfigCache) -> Result<Self, ApiError> {
        Url::parse(&settings.base_url)
            .map_err(|err| ApiError::network(NetworkFailure::InvalidUrl, err.to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| ApiError::network(NetworkFailure::Other, err.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            cache,
            buster: CacheBuster::default(),
        })
    }

    fn build_url(&self, request: &RequestEnvelope) -> Result<Url, ApiError> {
        let path = request.path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|err| ApiError::network(NetworkFailure::InvalidUrl, err.to_string()))?;
        let query = request.rendered_query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Backend for ReqwestBackend {
    async fn execute(&self, request: RequestEnvelope) -> Result<ResponseShape, ApiError> {
        let request = if request.is_read() {
            let stamp = self.buster.next();
            request.query(CACHE_BUSTER_PARAM, stamp)
        } else {
            request
        };
        let url = self.build_url(&request)?;

        outreach_debug!(
            "[request] {} {} params={:?} body={}",
            request.method,
            request.path,
            request.rendered_query(),
            request
                .body
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_default()
        );

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(token) = self.cache.get(API_TOKEN_KEY) {
            builder = builder.header(API_TOKEN_HEADER, token);
        }
        if let Some(session) = self.cache.get(SESSION_TOKEN_KEY) {
            builder = builder.header(AUTHORIZATION, format!("Bearer {session}"));
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body).map_err(|err| ApiError::Encode(err.to_string()))?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        let response = builder.send().await.map_err(|err| {
            let err = map_reqwest_error(err);
            outreach_warn!("[response] {} {} failed: {}", request.method, request.path, err);
            err
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        outreach_debug!(
            "[response] {} {} status={} body={}",
            request.method,
            request.path,
            status.as_u16(),
            body_for_log(&bytes)
        );

        let result = interpret(status, &bytes);
        if let Err(err) = &result {
            outreach_warn!("[response] {} {} rejected: {}", request.method, request.path, err);
        }
        result
    }
}

/// Maps a received status and body onto the normalized result.
pub(crate) fn interpret(status: StatusCode, body: &[u8]) -> Result<ResponseShape, ApiError> {
    if status == StatusCode::OK {
        let shape = parse_body(body)?;
        if let Some((code, message)) = shape.rejected_code() {
            return Err(ApiError::Server {
                status: u16::try_from(code).unwrap_or(u16::MAX),
                message: non_empty_or_fallback(message),
            });
        }
        return Ok(shape);
    }

    let message = error_message(status, body);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(ApiError::Auth {
            status: status.as_u16(),
            message,
        })
    } else {
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

/// `detail`, then `message`, then the status reason, then a fixed fallback.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    parsed
        .as_ref()
        .and_then(|value| value.get("detail"))
        .and_then(detail_text)
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|value| value.get("message"))
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .map(ToOwned::to_owned)
        })
        .or_else(|| status.canonical_reason().map(ToOwned::to_owned))
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

/// Validation errors arrive as a list of `{loc, msg}` objects.
fn detail_text(detail: &Value) -> Option<String> {
    match detail {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Array(items) if !items.is_empty() => {
            let messages: Vec<String> = items
                .iter()
                .map(|item| match item.get("msg").and_then(Value::as_str) {
                    Some(msg) => msg.to_string(),
                    None => item.to_string(),
                })
                .collect();
            Some(messages.join("; "))
        }
        Value::Object(_) => Some(detail.to_string()),
        _ => None,
    }
}

fn non_empty_or_fallback(message: &str) -> String {
    if message.is_empty() {
        FALLBACK_ERROR_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

fn body_for_log(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= LOGGED_BODY_LIMIT {
        return text.into_owned();
    }
    let mut end = LOGGED_BODY_LIMIT;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &text[..end])
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::network(NetworkFailure::Timeout, err.to_string());
    }
    if err.is_connect() {
        return ApiError::network(NetworkFailure::Connect, err.to_string());
    }
    ApiError::network(NetworkFailure::Other, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_buster_is_strictly_increasing() {
        let buster = CacheBuster::default();
        let stamps: Vec<i64> = (0..50).map(|_| buster.next()).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn detail_wins_over_message() {
        let body = br#"{"detail": "task not found", "message": "ignored"}"#;
        assert_eq!(error_message(StatusCode::NOT_FOUND, body), "task not found");
    }

    #[test]
    fn validation_details_are_joined() {
        let body = br#"{"detail": [{"loc": ["body", "name"], "msg": "field required"}, {"msg": "too short"}]}"#;
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
            "field required; too short"
        );
    }

    #[test]
    fn message_then_reason_then_fallback() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, br#"{"message": "bad input"}"#),
            "bad input"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, b"<html></html>"),
            "Bad Gateway"
        );
        let unknown = StatusCode::from_u16(599).unwrap();
        assert_eq!(error_message(unknown, b""), FALLBACK_ERROR_MESSAGE);
    }

    #[test]
    fn only_200_is_success() {
        let err = interpret(StatusCode::CREATED, br#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 201, .. }));
    }

    #[test]
    fn auth_statuses_map_to_auth_error() {
        let err = interpret(StatusCode::UNAUTHORIZED, br#"{"detail": "token expired"}"#)
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Auth {
                status: 401,
                message: "token expired".into()
            }
        );
    }

    #[test]
    fn failing_envelope_on_200_is_server_error() {
        let err = interpret(
            StatusCode::OK,
            br#"{"code": 500, "message": "", "data": null}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 500,
                message: FALLBACK_ERROR_MESSAGE.into()
            }
        );
    }

    #[test]
    fn long_bodies_are_truncated_for_logs() {
        let body = "é".repeat(LOGGED_BODY_LIMIT);
        let logged = body_for_log(body.as_bytes());
        assert!(logged.ends_with("...[truncated]"));
    }
}
