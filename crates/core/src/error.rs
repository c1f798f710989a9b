use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Closed classification used for every branching decision on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PoolUninitialized,
    RateLimited,
    Overloaded,
    NetworkError,
    MalformedResponse,
    Other,
}

impl ErrorKind {
    /// Whether switching to another credential can help.
    pub fn is_rotatable(&self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::Overloaded)
    }
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("credential pool is not initialized")]
    PoolUninitialized,
    #[error("rate limited")]
    RateLimited {
        /// From the `Retry-After` header.
        retry_after_ms: Option<u64>,
        #[source]
        source: Option<Box<TransportError>>,
    },
    #[error("provider overloaded (status {status}): {message}")]
    Overloaded {
        status: u16,
        message: String,
        #[source]
        source: Option<Box<TransportError>>,
    },
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },
    #[error("upstream error (status {status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        #[source]
        source: Option<Box<TransportError>>,
    },
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("config error: {message}")]
    Config { message: String },
    #[error("task failed: {message}")]
    Other { message: String },
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SdkError::PoolUninitialized => ErrorKind::PoolUninitialized,
            SdkError::RateLimited { .. } => ErrorKind::RateLimited,
            SdkError::Overloaded { .. } => ErrorKind::Overloaded,
            SdkError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            SdkError::Transport(te) if te.is_network() => ErrorKind::NetworkError,
            SdkError::Transport(TransportError::InvalidJson(_)) => ErrorKind::MalformedResponse,
            SdkError::Transport(_)
            | SdkError::Upstream { .. }
            | SdkError::Serde(_)
            | SdkError::InvalidArgument { .. }
            | SdkError::Config { .. }
            | SdkError::Other { .. } => ErrorKind::Other,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        SdkError::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        SdkError::Other {
            message: message.into(),
        }
    }

    /// One-line description including the upstream body when it adds
    /// something the message does not already say.
    pub fn format_details(&self) -> String {
        let (head, source) = match self {
            SdkError::RateLimited {
                retry_after_ms,
                source,
            } => (
                match retry_after_ms {
                    Some(ms) => format!("rate limited, retry after {ms}ms"),
                    None => "rate limited".to_string(),
                },
                source,
            ),
            SdkError::Overloaded {
                status,
                message,
                source,
            }
            | SdkError::Upstream {
                status,
                message,
                source,
            } => (format!("http status {status}: {message}"), source),
            other => return other.to_string(),
        };
        match source.as_deref() {
            Some(TransportError::HttpStatus { body, .. })
                if !body.trim().is_empty() && !head.contains(body.as_str()) =>
            {
                format!("{head} [body: {}]", display_body_for_error(body))
            }
            _ => head,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http status {status}: {sanitized}")]
    HttpStatus {
        status: u16,
        /// Raw response body; may echo request data, log `sanitized` instead.
        body: String,
        retry_after_ms: Option<u64>,
        sanitized: String,
        headers: Vec<(String, String)>,
    },
    #[error("network: {0}")]
    Network(String),
    #[error("connect timeout after {0:?}")]
    ConnectTimeout(Duration),
    #[error("request timeout after {0:?}")]
    RequestTimeout(Duration),
    #[error("body read error: {0}")]
    BodyRead(String),
    #[error("invalid json in response body: {0}")]
    InvalidJson(String),
    #[error("other: {0}")]
    Other(String),
}

impl TransportError {
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            TransportError::HttpStatus { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// Connection-level failures where no usable HTTP response arrived.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            TransportError::Network(_)
                | TransportError::ConnectTimeout(_)
                | TransportError::RequestTimeout(_)
                | TransportError::BodyRead(_)
        )
    }
}

pub fn http_status_fallback_message(status: u16) -> String {
    format!("http status {status}")
}

pub fn build_http_status_transport_error(
    status: u16,
    body: String,
    retry_after_ms: Option<u64>,
    headers: Vec<(String, String)>,
) -> TransportError {
    TransportError::HttpStatus {
        status,
        body,
        retry_after_ms,
        sanitized: http_status_fallback_message(status),
        headers,
    }
}

/// Classify an HTTP failure by status code alone.
///
/// Providers with richer error bodies refine this first and only fall back
/// here when the body carries no usable signal.
pub fn map_http_status_to_sdk_error(
    status: u16,
    body: String,
    retry_after_ms: Option<u64>,
    headers: Vec<(String, String)>,
    message: Option<String>,
) -> SdkError {
    let message = message.unwrap_or_else(|| http_status_fallback_message(status));
    let source = Some(Box::new(build_http_status_transport_error(
        status,
        body,
        retry_after_ms,
        headers,
    )));
    match status {
        429 => SdkError::RateLimited {
            retry_after_ms,
            source,
        },
        503 => SdkError::Overloaded {
            status,
            message,
            source,
        },
        _ => SdkError::Upstream {
            status,
            message,
            source,
        },
    }
}

/// Loggable form of an error body.
///
/// JSON is re-serialized compactly and capped; anything else is reduced to
/// its length so stray tokens or HTML pages stay out of logs.
pub fn display_body_for_error(body: &str) -> String {
    const MAX_CHARS: usize = 512;
    let trimmed = body.trim();
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return format!("{} bytes", body.len());
    };
    if !(value.is_object() || value.is_array()) {
        return format!("{} bytes", body.len());
    }
    let compact = value.to_string();
    if compact.chars().count() <= MAX_CHARS {
        compact
    } else {
        let head: String = compact.chars().take(MAX_CHARS).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_maps_to_rate_limited_with_retry_after() {
        let mapped = map_http_status_to_sdk_error(429, "slow down".into(), Some(2500), vec![], None);
        match mapped {
            SdkError::RateLimited {
                retry_after_ms,
                source,
            } => {
                assert_eq!(retry_after_ms, Some(2500));
                match source.as_deref() {
                    Some(TransportError::HttpStatus { sanitized, .. }) => {
                        assert_eq!(sanitized, "http status 429")
                    }
                    other => panic!("unexpected source: {other:?}"),
                }
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn status_503_maps_to_overloaded() {
        let mapped = map_http_status_to_sdk_error(503, "busy".into(), None, vec![], None);
        assert_eq!(mapped.kind(), ErrorKind::Overloaded);
        assert!(mapped.kind().is_rotatable());
    }

    #[test]
    fn other_status_keeps_parsed_message() {
        let mapped = map_http_status_to_sdk_error(
            400,
            "{\"error\":\"bad\"}".into(),
            None,
            vec![],
            Some("custom message".into()),
        );
        match mapped {
            SdkError::Upstream {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "custom message");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn details_include_upstream_body_once() {
        let body = r#"{"error":{"message":"quota"}}"#;
        let limited = map_http_status_to_sdk_error(429, body.into(), Some(1000), vec![], None);
        assert_eq!(
            limited.format_details(),
            r#"rate limited, retry after 1000ms [body: {"error":{"message":"quota"}}]"#
        );
        let plain = map_http_status_to_sdk_error(500, String::new(), None, vec![], Some("boom".into()));
        assert_eq!(plain.format_details(), "http status 500: boom");
        assert_eq!(SdkError::PoolUninitialized.format_details(), "credential pool is not initialized");
    }

    #[test]
    fn kinds_cover_taxonomy() {
        assert_eq!(SdkError::PoolUninitialized.kind(), ErrorKind::PoolUninitialized);
        assert_eq!(
            SdkError::Transport(TransportError::Network("reset".into())).kind(),
            ErrorKind::NetworkError
        );
        assert_eq!(
            SdkError::Transport(TransportError::Other("weird".into())).kind(),
            ErrorKind::Other
        );
        assert_eq!(
            SdkError::malformed("no image payload").kind(),
            ErrorKind::MalformedResponse
        );
        assert_eq!(
            SdkError::Transport(TransportError::InvalidJson("eof".into())).kind(),
            ErrorKind::MalformedResponse
        );
        assert!(!ErrorKind::NetworkError.is_rotatable());
    }

    #[test]
    fn body_display_minifies_json_and_hides_text() {
        assert_eq!(display_body_for_error(" { \"a\": 1 } "), "{\"a\":1}");
        assert_eq!(display_body_for_error("secret"), "6 bytes");
        assert_eq!(display_body_for_error("\"quoted\""), "8 bytes");
        let long = format!("{{\"message\":\"{}\"}}", "x".repeat(1000));
        assert!(display_body_for_error(&long).ends_with('…'));
    }
}
