use crate::core::SdkError;
use crate::types::image::DataUri;
use crate::types::shot::{GenerationTask, ShotSpec};

/// Input to the planning call.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub prompt: String,
    pub shot_count: usize,
    pub references: Vec<DataUri>,
}

/// Input to an image edit.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub image: DataUri,
    pub instruction: String,
}

/// One provider client bound to a single credential.
///
/// Each method issues exactly one provider call: no retries and no
/// credential selection happen here. Implementations classify failures into
/// the `SdkError` taxonomy so callers can branch on `SdkError::kind`.
///
/// Reference images should already be downscaled by the caller; the
/// provider rejects oversized inline payloads.
#[async_trait::async_trait]
pub trait ShotModel: Send + Sync {
    /// Provider name for logging/telemetry.
    fn provider_name(&self) -> &'static str;

    /// Ordered shot specs for the prompt. May return more or fewer than
    /// requested; the caller pads or truncates.
    async fn plan(&self, request: &PlanRequest) -> Result<Vec<ShotSpec>, SdkError>;

    /// First image produced for the task.
    async fn generate_image(&self, task: &GenerationTask) -> Result<DataUri, SdkError>;

    async fn edit_image(&self, request: &EditRequest) -> Result<DataUri, SdkError>;

    /// Cheap call proving the credential is accepted.
    async fn validate(&self) -> Result<(), SdkError> {
        Ok(())
    }
}
