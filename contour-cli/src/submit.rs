//! Audit service client.
//!
//! Posts a change report to the audit-triage endpoint with bounded retries.
//! Connection failures, 5xx and 429 responses are retried with exponential
//! backoff; any other non-success status fails immediately.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::redact::{detected, redact, REDACTED};

/// First retry delay; doubles on each further attempt.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

pub const BASE_HEADER: &str = "x-contour-base";
pub const HEAD_HEADER: &str = "x-contour-head";

/// Submission failures. Response bodies are already redacted.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("no audit endpoint configured (pass --endpoint or set [submit].endpoint)")]
    MissingEndpoint,

    #[error("request to {endpoint} failed after {attempts} attempt(s): {message}")]
    Http {
        endpoint: String,
        attempts: u32,
        message: String,
    },

    #[error("audit service returned {status} after {attempts} attempt(s): {body}")]
    Status {
        status: u16,
        attempts: u32,
        body: String,
    },
}

/// Everything needed to send one report.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub endpoint: String,
    pub token: Option<String>,
    pub base: Option<String>,
    pub head: Option<String>,
    /// The report JSON array, sent verbatim.
    pub payload: String,
}

impl SubmitRequest {
    pub fn new(endpoint: Option<&str>, payload: String) -> Result<Self, SubmitError> {
        let endpoint = endpoint
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(SubmitError::MissingEndpoint)?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            token: None,
            base: None,
            head: None,
            payload,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_revisions(mut self, base: &str, head: &str) -> Self {
        self.base = Some(base.to_string());
        self.head = Some(head.to_string());
        self
    }

    /// Header names and values as they will be sent, with the token masked.
    pub fn redacted_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![(CONTENT_TYPE.to_string(), "application/json".to_string())];
        if self.token.is_some() {
            headers.push((AUTHORIZATION.to_string(), format!("Bearer {}", REDACTED)));
        }
        if let Some(base) = &self.base {
            headers.push((BASE_HEADER.to_string(), base.clone()));
        }
        if let Some(head) = &self.head {
            headers.push((HEAD_HEADER.to_string(), head.clone()));
        }
        headers
    }

    fn headers(&self) -> Result<HeaderMap, SubmitError> {
        let invalid = |what: &str| SubmitError::Http {
            endpoint: self.endpoint.clone(),
            attempts: 0,
            message: format!("invalid {} header value", what),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| invalid("authorization"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(base) = &self.base {
            headers.insert(BASE_HEADER, HeaderValue::from_str(base).map_err(|_| invalid("base"))?);
        }
        if let Some(head) = &self.head {
            headers.insert(HEAD_HEADER, HeaderValue::from_str(head).map_err(|_| invalid("head"))?);
        }
        Ok(headers)
    }

    fn redact(&self, text: &str) -> String {
        let hits = detected(text);
        if !hits.is_empty() {
            tracing::debug!("Redacting response text ({})", hits.join(", "));
        }
        redact(text, self.token.as_deref())
    }
}

/// Successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub endpoint: String,
    pub status: u16,
    pub attempts: u32,
    /// Redacted response body.
    pub response: String,
}

/// Async HTTP client with retry policy.
pub struct AuditClient {
    client: reqwest::Client,
    attempts: u32,
    backoff: Duration,
}

impl AuditClient {
    pub fn new(timeout: Duration, attempts: u32) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("contour/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SubmitError::Http {
                endpoint: String::new(),
                attempts: 0,
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            attempts: attempts.max(1),
            backoff: INITIAL_BACKOFF,
        })
    }

    /// Override the first retry delay.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitOutcome, SubmitError> {
        let headers = request.headers()?;
        let mut delay = self.backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!("Submitting report to {} (attempt {})", request.endpoint, attempt);

            let result = self
                .client
                .post(&request.endpoint)
                .headers(headers.clone())
                .body(request.payload.clone())
                .send()
                .await;

            let retry_reason = match result {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let body = request.redact(&body);

                    if status.is_success() {
                        tracing::info!("Audit service accepted report ({})", status);
                        return Ok(SubmitOutcome {
                            endpoint: request.endpoint.clone(),
                            status: status.as_u16(),
                            attempts: attempt,
                            response: body,
                        });
                    }

                    if !is_retryable(status) || attempt >= self.attempts {
                        return Err(SubmitError::Status {
                            status: status.as_u16(),
                            attempts: attempt,
                            body,
                        });
                    }
                    format!("status {}", status)
                }
                Err(e) => {
                    let message = request.redact(&e.to_string());
                    if attempt >= self.attempts {
                        return Err(SubmitError::Http {
                            endpoint: request.endpoint.clone(),
                            attempts: attempt,
                            message,
                        });
                    }
                    message
                }
            };

            tracing::warn!(
                "Submission attempt {} failed ({}), retrying in {:?}",
                attempt,
                retry_reason,
                delay
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
