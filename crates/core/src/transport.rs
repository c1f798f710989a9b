use crate::core::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportConfig {
    /// Overall request timeout; image generation can take tens of seconds.
    #[serde(with = "crate::core::config::duration_ms::option")]
    pub request_timeout: Option<Duration>,
    #[serde(with = "crate::core::config::duration_ms")]
    pub connect_timeout: Duration,
    /// Drop `null` object fields from request bodies before sending.
    pub strip_null_fields: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(120)),
            connect_timeout: Duration::from_secs(10),
            strip_null_fields: true,
        }
    }
}

/// Response headers as lowercase name/value pairs.
pub type Headers = Vec<(String, String)>;

/// The one HTTP operation provider clients need.
///
/// Implementations turn every non-2xx response into
/// `TransportError::HttpStatus` with the raw body attached, so providers
/// can classify it. Retries never happen at this layer.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        cfg: &TransportConfig,
    ) -> Result<(Value, Headers), TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        cfg: &TransportConfig,
    ) -> Result<(Value, Headers), TransportError> {
        T::post_json(self, url, headers, body, cfg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_uses_millisecond_fields() {
        let value = serde_json::to_value(TransportConfig::default()).unwrap();
        assert_eq!(
            value,
            json!({ "requestTimeout": 120000, "connectTimeout": 10000, "stripNullFields": true })
        );
        let cfg: TransportConfig =
            serde_json::from_value(json!({ "requestTimeout": null, "connectTimeout": 500 })).unwrap();
        assert_eq!(cfg.request_timeout, None);
        assert_eq!(cfg.connect_timeout, Duration::from_millis(500));
        assert!(cfg.strip_null_fields);
    }
}
