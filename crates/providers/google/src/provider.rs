use std::sync::Arc;

use crate::core::pool::Credential;
use crate::core::transport::{HttpTransport, TransportConfig};
use crate::core::SdkError;
use crate::provider::ProviderSettings;
use crate::reqwest_transport::ReqwestTransport;

use crate::provider_google::gen_ai::image_model::{GoogleGenAiClient, GoogleGenAiConfig};

/// Environment variable consulted when no keys are configured.
pub const API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";

/// Builds one `GoogleGenAiClient` per credential, all sharing one transport.
pub struct GoogleClientFactory<T: HttpTransport = ReqwestTransport> {
    cfg: Arc<GoogleGenAiConfig<T>>,
}

impl<T: HttpTransport> Clone for GoogleClientFactory<T> {
    fn clone(&self) -> Self {
        Self {
            cfg: Arc::clone(&self.cfg),
        }
    }
}

impl<T: HttpTransport> GoogleClientFactory<T> {
    pub fn with_config(cfg: GoogleGenAiConfig<T>) -> Self {
        Self { cfg: Arc::new(cfg) }
    }

    pub fn build(&self, credential: &Credential) -> GoogleGenAiClient<T> {
        GoogleGenAiClient::new(credential.clone(), Arc::clone(&self.cfg))
    }
}

impl GoogleClientFactory<ReqwestTransport> {
    /// Reqwest-backed factory configured from provider settings.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, SdkError> {
        let transport_cfg: TransportConfig = settings.transport.clone();
        let http = ReqwestTransport::try_new(&transport_cfg).map_err(SdkError::Transport)?;
        let mut cfg = GoogleGenAiConfig::new(Arc::new(http), transport_cfg);
        if let Some(model) = settings.text_model.as_deref().filter(|m| !m.trim().is_empty()) {
            cfg.text_model = model.trim().to_string();
        }
        if let Some(model) = settings.image_model.as_deref().filter(|m| !m.trim().is_empty()) {
            cfg.image_model = model.trim().to_string();
        }
        tracing::info!(
            target: "storyboard::provider::google",
            text_model = %cfg.text_model,
            image_model = %cfg.image_model,
            "google client factory ready"
        );
        Ok(Self::with_config(cfg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::TransportError;
    use async_trait::async_trait;
    use serde_json::Value;

    struct NoopTransport;

    #[async_trait]
    impl HttpTransport for NoopTransport {
        async fn post_json(
            &self,
            _url: &str,
            _headers: &[(String, String)],
            _body: &Value,
            _cfg: &TransportConfig,
        ) -> Result<(Value, Vec<(String, String)>), TransportError> {
            Err(TransportError::Other("unused".into()))
        }
    }

    #[test]
    fn credential_base_url_overrides_default() {
        let factory = GoogleClientFactory::with_config(GoogleGenAiConfig::new(
            Arc::new(NoopTransport),
            TransportConfig::default(),
        ));
        let default_client = factory.build(&Credential::new("k1", None));
        assert_eq!(
            default_client.url_generate("gemini-2.5-flash-image"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        let proxied = factory.build(&Credential::new("k2", Some("https://proxy.local/v1beta/".into())));
        assert_eq!(
            proxied.url_generate("tunedModels/custom"),
            "https://proxy.local/v1beta/tunedModels/custom:generateContent"
        );
    }
}
