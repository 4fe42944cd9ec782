//! HTTP client for the feedback backend.
//!
//! One [`FeedupClient`] carries the session cookie set by
//! `POST /api/admin/login`, so every later analytics or analysis call is
//! made with the same credentials.

use crate::models::{
    parse_analysis_result, AnalysisResult, AnalyticsPayload, FeedbackSubmission, TopicRequest,
};
use crate::orchestrator::TopicAnalyzer;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from talking to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 401: the session is missing or expired. Callers that can send the
    /// user to login match on this variant; others show the status.
    #[error("Server returned status: 401")]
    Unauthorized,
    #[error("Cannot connect to server at {0}")]
    Connection(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Request failed: {0}")]
    Request(String),
    /// Non-2xx response; `message` is the body's `error` field when present.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("Failed to parse server response: {0}")]
    Malformed(String),
}

/// Human-readable message for a failed response.
///
/// Uses the body's `error` field when present, else the status code.
pub fn error_message_from_body(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| format!("Server returned status: {}", status))
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthStatus {
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    username: Option<String>,
}

/// Session-carrying client for the feedback API.
#[derive(Debug, Clone)]
pub struct FeedupClient {
    http: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
}

impl FeedupClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, mapping transport failures.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_seconds)
            } else if e.is_connect() {
                ApiError::Connection(self.base_url.clone())
            } else {
                ApiError::Request(e.to_string())
            }
        })
    }

    /// Read a response body, rejecting 401 and other non-2xx statuses.
    async fn successful_body(&self, response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message_from_body(status.as_u16(), &body),
            });
        }

        Ok(body)
    }

    /// `POST /api/admin/login`. Returns whether the credentials were accepted.
    pub async fn login(&self, username: &str, password: &str) -> Result<bool, ApiError> {
        info!("Logging in as {}", username);
        let request = self
            .http
            .post(self.url("/api/admin/login"))
            .json(&LoginRequest { username, password });
        let response = self.send(request).await?;
        Ok(response.status().is_success())
    }

    /// `POST /api/logout`.
    pub async fn logout(&self) -> Result<bool, ApiError> {
        let response = self.send(self.http.post(self.url("/api/logout"))).await?;
        Ok(response.status().is_success())
    }

    /// `GET /api/check-auth`. Returns the logged-in username, if any.
    pub async fn check_auth(&self) -> Result<Option<String>, ApiError> {
        let response = self.send(self.http.get(self.url("/api/check-auth"))).await?;
        let body = match self.successful_body(response).await {
            Ok(body) => body,
            Err(ApiError::Unauthorized) => return Ok(None),
            Err(e) => return Err(e),
        };

        let status: AuthStatus =
            serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        Ok(if status.authenticated {
            Some(status.username.unwrap_or_default())
        } else {
            None
        })
    }

    /// `GET /api/analysis`.
    ///
    /// A 401 surfaces as [`ApiError::Unauthorized`] so callers can send the
    /// user to login instead of reporting a data error.
    pub async fn fetch_analytics(&self) -> Result<AnalyticsPayload, ApiError> {
        debug!("Fetching analytics payload");
        let response = self.send(self.http.get(self.url("/api/analysis"))).await?;
        let body = self.successful_body(response).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    /// `POST /api/analyze_topics`.
    pub async fn analyze_topics(&self, request: &TopicRequest) -> Result<AnalysisResult, ApiError> {
        info!(
            "Submitting {} feedback items for topic analysis",
            request.feedback.len()
        );
        let builder = self.http.post(self.url("/api/analyze_topics")).json(request);
        let response = self.send(builder).await?;
        let body = self.successful_body(response).await?;
        parse_analysis_result(&body).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    /// `POST /api/submit_feedback`. Returns whether the server accepted it.
    pub async fn submit_feedback(&self, submission: &FeedbackSubmission) -> Result<bool, ApiError> {
        let builder = self
            .http
            .post(self.url("/api/submit_feedback"))
            .json(submission);
        let response = self.send(builder).await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl TopicAnalyzer for FeedupClient {
    async fn analyze_topics(&self, request: &TopicRequest) -> Result<AnalysisResult, ApiError> {
        FeedupClient::analyze_topics(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    #[test]
    fn test_error_message_prefers_error_field() {
        let body = r#"{"error": "The 'feedback' list cannot be empty."}"#;
        assert_eq!(
            error_message_from_body(400, body),
            "The 'feedback' list cannot be empty."
        );
    }

    #[test]
    fn test_error_message_falls_back_to_status() {
        assert_eq!(
            error_message_from_body(502, "<html>Bad Gateway</html>"),
            "Server returned status: 502"
        );
        assert_eq!(
            error_message_from_body(401, r#"{"message": "Unauthorized"}"#),
            "Server returned status: 401"
        );
    }

    #[test]
    fn test_status_error_displays_message() {
        let err = ApiError::Status {
            status: 500,
            message: "Unexpected server error: boom".to_string(),
        };
        assert_eq!(err.to_string(), "Unexpected server error: boom");
        assert_eq!(ApiError::Timeout(30).to_string(), "Request timed out after 30s");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = FeedupClient::new("http://localhost:5000/", 10).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(
            client.url("/api/analysis"),
            "http://localhost:5000/api/analysis"
        );
    }

    /// Answer one request on `listener` with `response`, returning the
    /// request line that was received.
    async fn serve_once(listener: TcpListener, response: &'static str) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        while !request_complete(&received) {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&received)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// Whether `received` holds the full headers and the declared body.
    fn request_complete(received: &[u8]) -> bool {
        let text = String::from_utf8_lossy(received);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        received.len() >= header_end + 4 + content_length
    }

    async fn local_server(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        (url, tokio::spawn(serve_once(listener, response)))
    }

    const UNAUTHORIZED: &str =
        "HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";

    #[tokio::test]
    async fn test_analytics_401_is_unauthorized() {
        let (url, server) = local_server(UNAUTHORIZED).await;
        let client = FeedupClient::new(&url, 5).unwrap();

        let err = tokio_test::assert_err!(client.fetch_analytics().await);
        assert_eq!(err, ApiError::Unauthorized);
        assert_eq!(server.await.unwrap(), "GET /api/analysis HTTP/1.1");
    }

    #[tokio::test]
    async fn test_analyze_topics_401_keeps_status_code() {
        let (url, server) = local_server(UNAUTHORIZED).await;
        let client = FeedupClient::new(&url, 5).unwrap();
        let request = TopicRequest {
            feedback: Vec::new(),
            min_feedback_count: 5,
        };

        let err = tokio_test::assert_err!(client.analyze_topics(&request).await);
        assert_eq!(err.to_string(), "Server returned status: 401");
        assert_eq!(server.await.unwrap(), "POST /api/analyze_topics HTTP/1.1");
    }

    #[tokio::test]
    async fn test_error_field_from_failed_response() {
        let (url, server) = local_server(
            "HTTP/1.1 400 Bad Request\r\ncontent-type: application/json\r\ncontent-length: 49\r\nconnection: close\r\n\r\n{\"error\": \"The 'feedback' list cannot be empty.\"}",
        )
        .await;
        let client = FeedupClient::new(&url, 5).unwrap();
        let request = TopicRequest {
            feedback: Vec::new(),
            min_feedback_count: 5,
        };

        let err = tokio_test::assert_err!(client.analyze_topics(&request).await);
        assert_eq!(
            err,
            ApiError::Status {
                status: 400,
                message: "The 'feedback' list cannot be empty.".to_string(),
            }
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_port_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = FeedupClient::new(&url, 5).unwrap();
        let err = tokio_test::assert_err!(client.fetch_analytics().await);
        assert!(matches!(err, ApiError::Connection(_)));
    }
}
