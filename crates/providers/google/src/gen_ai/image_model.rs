use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::core::image::{EditRequest, PlanRequest, ShotModel};
use crate::core::pool::Credential;
use crate::core::transport::{HttpTransport, TransportConfig};
use crate::core::SdkError;
use crate::types::image::DataUri;
use crate::types::json::parse_json_loose;
use crate::types::shot::{GenerationMode, GenerationTask, ShotSpec};

use super::prompt::{
    build_edit_body, build_generate_body, build_ping_body, build_plan_body, parse_response,
    GoogleGenerateResponse,
};
use crate::provider_google::error::map_transport_error_to_sdk_error;

const TRACE_TARGET: &str = "storyboard::provider::google";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Settings shared by every client in a pool.
pub struct GoogleGenAiConfig<T: HttpTransport = crate::reqwest_transport::ReqwestTransport> {
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub http: Arc<T>,
    pub transport_cfg: TransportConfig,
}

impl<T: HttpTransport> GoogleGenAiConfig<T> {
    pub fn new(http: Arc<T>, transport_cfg: TransportConfig) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            http,
            transport_cfg,
        }
    }
}

/// Gemini client bound to one API key.
pub struct GoogleGenAiClient<T: HttpTransport = crate::reqwest_transport::ReqwestTransport> {
    credential: Credential,
    cfg: Arc<GoogleGenAiConfig<T>>,
}

#[derive(Debug, Deserialize)]
struct PlanPayload {
    #[serde(default)]
    shots: Vec<ShotSpec>,
}

impl<T: HttpTransport> GoogleGenAiClient<T> {
    pub fn new(credential: Credential, cfg: Arc<GoogleGenAiConfig<T>>) -> Self {
        Self { credential, cfg }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    fn base_url(&self) -> &str {
        self.credential
            .base_url()
            .unwrap_or(&self.cfg.base_url)
            .trim_end_matches('/')
    }

    fn model_path(model_id: &str) -> String {
        if model_id.contains('/') {
            model_id.to_string()
        } else {
            format!("models/{}", model_id)
        }
    }

    pub(crate) fn url_generate(&self, model_id: &str) -> String {
        format!("{}/{}:generateContent", self.base_url(), Self::model_path(model_id))
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("content-type".to_string(), "application/json".to_string()),
            ("accept".to_string(), "application/json".to_string()),
            ("x-goog-api-key".to_string(), self.credential.token().to_string()),
        ]
    }

    async fn generate_content(
        &self,
        model_id: &str,
        body: &JsonValue,
    ) -> Result<GoogleGenerateResponse, SdkError> {
        let url = self.url_generate(model_id);
        tracing::debug!(
            target: TRACE_TARGET,
            model = model_id,
            key = %self.credential.redacted(),
            "POST generateContent"
        );
        let (json, _headers) = self
            .cfg
            .http
            .post_json(&url, &self.headers(), body, &self.cfg.transport_cfg)
            .await
            .map_err(|te| {
                let mapped = map_transport_error_to_sdk_error(te);
                tracing::debug!(target: TRACE_TARGET, error = %mapped.format_details(), "request failed");
                mapped
            })?;
        parse_response(json)
    }

    fn image_or_malformed(response: &GoogleGenerateResponse) -> Result<DataUri, SdkError> {
        response.first_image().ok_or_else(|| {
            let message = match response.block_reason() {
                Some(reason) => format!("no image payload (finish reason {reason})"),
                None => "no image payload".to_string(),
            };
            SdkError::malformed(message)
        })
    }
}

/// Timestamp marker that makes a regeneration request unique.
fn variation_marker() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

#[async_trait]
impl<T: HttpTransport + 'static> ShotModel for GoogleGenAiClient<T> {
    fn provider_name(&self) -> &'static str {
        "google.gen-ai"
    }

    async fn plan(&self, request: &PlanRequest) -> Result<Vec<ShotSpec>, SdkError> {
        let body = build_plan_body(request);
        let response = self.generate_content(&self.cfg.text_model, &body).await?;
        let text = response
            .text()
            .ok_or_else(|| SdkError::malformed("no plan generated"))?;
        let value = parse_json_loose(&text)
            .ok_or_else(|| SdkError::malformed("failed to parse storyboard plan"))?;
        let payload: PlanPayload = serde_json::from_value(value)
            .map_err(|e| SdkError::malformed(format!("failed to parse storyboard plan: {e}")))?;
        Ok(payload.shots)
    }

    async fn generate_image(&self, task: &GenerationTask) -> Result<DataUri, SdkError> {
        let marker = match task.mode {
            GenerationMode::Variation => Some(variation_marker()),
            GenerationMode::Fresh => None,
        };
        let body = build_generate_body(task, marker.as_deref());
        let response = self.generate_content(&self.cfg.image_model, &body).await?;
        Self::image_or_malformed(&response)
    }

    async fn edit_image(&self, request: &EditRequest) -> Result<DataUri, SdkError> {
        let body = build_edit_body(request);
        let response = self.generate_content(&self.cfg.image_model, &body).await?;
        Self::image_or_malformed(&response)
    }

    async fn validate(&self) -> Result<(), SdkError> {
        self.generate_content(&self.cfg.text_model, &build_ping_body())
            .await
            .map(|_| ())
    }
}
