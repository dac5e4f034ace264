//! HTTP plumbing shared by the adapters

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::errors::GitProviderError;

const USER_AGENT: &str = concat!("argodeck/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(
    timeout_secs: u64,
    accept_invalid_certs: bool,
) -> Result<Client, GitProviderError> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs));

    if accept_invalid_certs {
        tracing::warn!("TLS certificate verification is disabled for this client");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().map_err(|e| {
        GitProviderError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
    })
}

/// Pass successful responses through and map the rest onto the error taxonomy
pub(crate) async fn check_status(
    response: Response,
    context: &str,
) -> Result<Response, GitProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limited = response
        .headers()
        .get("X-RateLimit-Remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        == Some(0);
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(classify(status, rate_limited, context, &body))
}

fn classify(status: StatusCode, rate_limited: bool, context: &str, body: &str) -> GitProviderError {
    let detail = format!("{}: {} - {}", context, status, body);
    match status {
        StatusCode::UNAUTHORIZED => GitProviderError::AuthenticationFailed(detail),
        StatusCode::TOO_MANY_REQUESTS => GitProviderError::RateLimitExceeded,
        StatusCode::FORBIDDEN if rate_limited => GitProviderError::RateLimitExceeded,
        StatusCode::NOT_FOUND => GitProviderError::NotFound(context.to_string()),
        StatusCode::CONFLICT => GitProviderError::Conflict(detail),
        // GitHub: existing file written without (or with a stale) sha
        StatusCode::UNPROCESSABLE_ENTITY if body.contains("sha") => {
            GitProviderError::Conflict(detail)
        }
        // GitLab: stale last_commit_id, or create over an existing path
        StatusCode::BAD_REQUEST
            if body.contains("has changed since") || body.contains("already exists") =>
        {
            GitProviderError::Conflict(detail)
        }
        _ => GitProviderError::ApiError(detail),
    }
}

/// Percent-encode each segment of a repository path, keeping the separators
pub(crate) fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode base64 file content as UTF-8, ignoring the line breaks both APIs insert
pub(crate) fn decode_base64(content: &str) -> Result<String, GitProviderError> {
    let compact: String = content.split_whitespace().collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| GitProviderError::Decode(format!("invalid base64 content: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| GitProviderError::Decode(format!("file content is not valid UTF-8: {}", e)))
}
