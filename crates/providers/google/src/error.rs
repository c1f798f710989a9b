use crate::core::error::{map_http_status_to_sdk_error, SdkError, TransportError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleErrorInner {
    pub code: Option<i64>,
    pub message: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleErrorData {
    pub error: GoogleErrorInner,
}

/// Provider signals that outrank the HTTP status.
///
/// Quota exhaustion is sometimes reported with a 400/403 body, and
/// overload with a 500, so the body status and message are checked first.
fn classify_body(inner: &GoogleErrorInner) -> Option<u16> {
    let status = inner.status.as_deref().unwrap_or_default();
    let message = inner.message.to_ascii_lowercase();
    if status == "RESOURCE_EXHAUSTED" || message.contains("quota exceeded") {
        return Some(429);
    }
    if status == "UNAVAILABLE" || message.contains("overloaded") {
        return Some(503);
    }
    None
}

/// Parse a Google JSON error body and map it onto the error taxonomy.
pub fn map_transport_error_to_sdk_error(te: TransportError) -> SdkError {
    match te {
        TransportError::HttpStatus {
            status,
            body,
            retry_after_ms,
            headers,
            ..
        } => {
            let parsed = serde_json::from_str::<GoogleErrorData>(&body).ok();
            let effective = parsed
                .as_ref()
                .and_then(|p| classify_body(&p.error))
                .unwrap_or(status);
            let message = parsed.map(|p| p.error.message);
            let mapped = map_http_status_to_sdk_error(effective, body, retry_after_ms, headers, message);
            // Keep the real status on the error for display.
            match mapped {
                SdkError::Overloaded {
                    message, source, ..
                } => SdkError::Overloaded {
                    status,
                    message,
                    source,
                },
                other => other,
            }
        }
        other => SdkError::Transport(other),
    }
}
