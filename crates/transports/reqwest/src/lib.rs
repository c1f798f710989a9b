use crate::core::error::{display_body_for_error, TransportError};
use crate::core::json::without_null_fields;
use crate::core::transport::{Headers, HttpTransport, TransportConfig};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tracing::debug;

const TRACE_TARGET: &str = "storyboard::transport::reqwest";

/// reqwest-backed transport shared by every pool client.
///
/// `reqwest::Client` pools connections internally, so one transport serves
/// all credentials; the credential travels in per-request headers.
pub struct ReqwestTransport {
    client: Client,
    request_timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn try_new(cfg: &TransportConfig) -> Result<Self, TransportError> {
        Self::try_new_with_builder(cfg, Client::builder())
    }

    /// Apply `cfg` on top of a caller-prepared builder (proxies, extra roots).
    pub fn try_new_with_builder(
        cfg: &TransportConfig,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self, TransportError> {
        let mut builder = builder
            .connect_timeout(cfg.connect_timeout)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Duration::from_secs(90));
        if let Some(limit) = cfg.request_timeout {
            builder = builder.timeout(limit);
        }
        let client = builder.build().map_err(|err| {
            TransportError::Other(format!(
                "reqwest client build failed: {}",
                format_reqwest_error_chain(&err)
            ))
        })?;
        Ok(Self {
            client,
            request_timeout: cfg.request_timeout,
        })
    }

    fn map_send_error(&self, err: &reqwest::Error, cfg: &TransportConfig) -> TransportError {
        match (err.is_connect(), err.is_timeout()) {
            (true, true) => TransportError::ConnectTimeout(cfg.connect_timeout),
            (false, true) => {
                TransportError::RequestTimeout(self.request_timeout.unwrap_or_default())
            }
            (true, false) => {
                TransportError::Network(format!("connect: {}", format_reqwest_error_chain(err)))
            }
            (false, false) => TransportError::Network(format_reqwest_error_chain(err)),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        cfg: &TransportConfig,
    ) -> Result<(Value, Headers), TransportError> {
        let payload = if cfg.strip_null_fields {
            without_null_fields(body)
        } else {
            body.clone()
        };
        let request = headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("content-type"))
            .fold(self.client.post(url).json(&payload), |req, (name, value)| {
                req.header(name, value)
            });

        let started = Instant::now();
        let response = request.send().await.map_err(|err| {
            let mapped = self.map_send_error(&err, cfg);
            debug!(
                target: TRACE_TARGET,
                url = %redact_url(url),
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %mapped,
                "send failed"
            );
            mapped
        })?;

        let status = response.status().as_u16();
        let response_headers = header_pairs(response.headers());
        let retry_after_ms = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_retry_after_ms);
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::BodyRead(format_reqwest_error_chain(&e)))?;
        debug!(
            target: TRACE_TARGET,
            url = %redact_url(url),
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_bytes = text.len(),
            "response received"
        );

        if !(200..300).contains(&status) {
            let sanitized = display_body_for_error(&text);
            debug!(target: TRACE_TARGET, status, body = %sanitized, "non-success status");
            return Err(TransportError::HttpStatus {
                status,
                body: text,
                retry_after_ms,
                sanitized,
                headers: response_headers,
            });
        }

        let json = serde_json::from_str::<Value>(&text)
            .map_err(|e| TransportError::InvalidJson(e.to_string()))?;
        Ok((json, response_headers))
    }
}

fn header_pairs(headers: &HeaderMap) -> Headers {
    let mut pairs = Vec::with_capacity(headers.len());
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            pairs.push((name.as_str().to_string(), value.to_string()));
        }
    }
    pairs
}

/// Drop the query string, which may carry an API key.
fn redact_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// `Retry-After` in delta-seconds; HTTP-date values are ignored.
fn parse_retry_after_ms(value: &str) -> Option<u64> {
    let secs: u64 = value.trim().parse().ok()?;
    Some(secs.saturating_mul(1000))
}

/// The error and each of its sources, joined with `: `.
fn format_reqwest_error_chain(err: &reqwest::Error) -> String {
    std::iter::successors(Some(err as &dyn StdError), |e| (*e).source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_builder_surfaces_as_other() {
        let built = ReqwestTransport::try_new_with_builder(
            &TransportConfig::default(),
            Client::builder().user_agent("line\nbreak"),
        );
        assert!(matches!(
            built,
            Err(TransportError::Other(ref message)) if message.starts_with("reqwest client build failed")
        ));
    }

    #[test]
    fn header_pairs_skip_non_ascii_values() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "5".parse().unwrap());
        headers.insert(
            "x-note",
            reqwest::header::HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );
        assert_eq!(header_pairs(&headers), vec![("retry-after".to_string(), "5".to_string())]);
    }

    #[test]
    fn retry_after_accepts_delta_seconds_only() {
        assert_eq!(parse_retry_after_ms(" 3 "), Some(3000));
        assert_eq!(parse_retry_after_ms("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn redact_url_strips_query() {
        assert_eq!(
            redact_url("https://host/v1beta/models/m:generateContent?key=secret"),
            "https://host/v1beta/models/m:generateContent"
        );
    }
}
