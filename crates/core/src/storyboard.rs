//! Presentation-facing entry point: owns the credential pool and wires
//! planning and image batches through the retry coordinator and scheduler.

use futures_util::StreamExt;
use std::sync::Arc;

use crate::core::config::DispatchSettings;
use crate::core::image::{EditRequest, PlanRequest, ShotModel};
use crate::core::image_prep::prepare_reference;
use crate::core::pool::{Credential, CredentialPool};
use crate::core::retry::RetryCoordinator;
use crate::core::scheduler::{EventStream, Outcome, Scheduler, TaskEvent};
use crate::core::SdkError;
use crate::types::image::DataUri;
use crate::types::shot::{
    AspectRatio, GenerationMode, GenerationTask, GridSize, QualityLevel, Shot, ShotSpec,
};

const TRACE_TARGET: &str = "storyboard::dispatch";

type ClientFactory<M> = Arc<dyn Fn(&Credential) -> M + Send + Sync>;

/// Downscale references once so every task of a batch shares them.
pub fn prepare_references(references: &[DataUri]) -> Arc<[DataUri]> {
    references.iter().map(prepare_reference).collect()
}

/// Pad or truncate planned specs to exactly `count`.
///
/// Fillers inherit the visual style of the first planned shot.
pub fn fit_plan(mut specs: Vec<ShotSpec>, count: usize) -> Vec<ShotSpec> {
    specs.truncate(count);
    let style = specs.first().map(|s| s.visual_style.clone());
    while specs.len() < count {
        specs.push(ShotSpec::filler(style.as_deref()));
    }
    specs
}

/// One task per shot, all sharing the prepared references.
pub fn tasks_for(
    shots: &[Shot],
    quality: QualityLevel,
    mode: GenerationMode,
    references: &[DataUri],
) -> Vec<GenerationTask> {
    let references = prepare_references(references);
    shots
        .iter()
        .map(|shot| shot.task(quality, mode, Arc::clone(&references)))
        .collect()
}

pub struct Storyboard<M> {
    pool: Arc<CredentialPool<M>>,
    factory: ClientFactory<M>,
    settings: DispatchSettings,
}

impl<M> Storyboard<M>
where
    M: ShotModel + 'static,
{
    /// An empty dispatcher; call `initialize` before submitting work.
    pub fn new<F>(factory: F, settings: DispatchSettings) -> Self
    where
        F: Fn(&Credential) -> M + Send + Sync + 'static,
    {
        Self {
            pool: Arc::new(CredentialPool::new()),
            factory: Arc::new(factory),
            settings,
        }
    }

    /// Rebuild the pool from raw keys sharing one optional endpoint.
    pub fn initialize<I, S>(&self, keys: I, base_url: Option<&str>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base_url = base_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        self.initialize_credentials(
            keys.into_iter()
                .map(|k| Credential::new(k, base_url.clone())),
        )
    }

    pub fn initialize_credentials<I>(&self, credentials: I) -> usize
    where
        I: IntoIterator<Item = Credential>,
    {
        let factory = Arc::clone(&self.factory);
        self.pool.initialize(credentials, |c| factory(c))
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    pub fn pool(&self) -> &Arc<CredentialPool<M>> {
        &self.pool
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    fn coordinator(&self) -> RetryCoordinator<M> {
        RetryCoordinator::new(Arc::clone(&self.pool), self.settings.retry_config())
    }

    fn ensure_pool(&self) -> Result<(), SdkError> {
        if self.pool.is_empty() {
            tracing::warn!(target: TRACE_TARGET, "no credentials configured");
            return Err(SdkError::PoolUninitialized);
        }
        Ok(())
    }

    /// Plan `grid.shot_count()` shots for the prompt.
    ///
    /// The returned shots are marked generating and carry fresh ids.
    pub async fn plan_storyboard(
        &self,
        prompt: &str,
        grid: GridSize,
        aspect_ratio: AspectRatio,
        references: &[DataUri],
    ) -> Result<Vec<Shot>, SdkError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SdkError::InvalidArgument {
                message: "prompt must not be empty".into(),
            });
        }
        self.ensure_pool()?;
        let count = grid.shot_count();
        let request = PlanRequest {
            prompt: prompt.to_string(),
            shot_count: count,
            references: prepare_references(references).to_vec(),
        };
        let request = &request;
        let specs = self
            .coordinator()
            .execute(|client| async move { client.plan(request).await })
            .await?;
        if specs.len() != count {
            tracing::debug!(
                target: TRACE_TARGET,
                planned = specs.len(),
                wanted = count,
                "adjusting plan length"
            );
        }
        Ok(fit_plan(specs, count)
            .into_iter()
            .map(|spec| Shot::planned(spec, aspect_ratio))
            .collect())
    }

    /// Start generating every task; events arrive in completion order.
    ///
    /// Fails up front, before any task starts, when the pool is empty.
    pub fn run_batch(
        &self,
        tasks: Vec<GenerationTask>,
        concurrency_hint: Option<usize>,
    ) -> Result<EventStream<GenerationTask, DataUri>, SdkError> {
        self.ensure_pool()?;
        let scheduler = self.settings.scheduler(self.pool.size(), concurrency_hint);
        let coordinator = self.coordinator();
        Ok(scheduler.run(tasks, move |task: GenerationTask| {
            let coordinator = coordinator.clone();
            async move {
                let task = &task;
                let result = coordinator
                    .execute(|client| async move {
                        let attempt = client.generate_image(task).await;
                        if let Err(err) = &attempt {
                            tracing::trace!(
                                target: TRACE_TARGET,
                                provider = client.provider_name(),
                                shot_id = %task.shot_id,
                                kind = ?err.kind(),
                                "generation attempt failed"
                            );
                        }
                        attempt
                    })
                    .await;
                if let Err(err) = &result {
                    tracing::debug!(
                        target: TRACE_TARGET,
                        shot_id = %task.shot_id,
                        kind = ?err.kind(),
                        "shot failed"
                    );
                }
                result
            }
        }))
    }

    /// Generate a new variation of one shot.
    pub async fn regenerate(
        &self,
        shot: &Shot,
        quality: QualityLevel,
        references: &[DataUri],
    ) -> Result<TaskEvent<GenerationTask, DataUri>, SdkError> {
        let tasks = tasks_for(
            std::slice::from_ref(shot),
            quality,
            GenerationMode::Variation,
            references,
        );
        let mut events = self.run_batch(tasks, Some(1))?;
        events
            .next()
            .await
            .ok_or_else(|| SdkError::other("regeneration produced no outcome"))
    }

    /// Apply an edit instruction to an existing image.
    ///
    /// The image is downscaled like any reference before it is sent.
    pub async fn edit(&self, image: DataUri, instruction: &str) -> Outcome<DataUri> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(SdkError::InvalidArgument {
                message: "edit instruction must not be empty".into(),
            });
        }
        self.ensure_pool()?;
        let request = EditRequest {
            image: prepare_reference(&image),
            instruction: instruction.to_string(),
        };
        let coordinator = self.coordinator();
        let mut events = Scheduler::new(1).run(vec![request], move |request: EditRequest| {
            let coordinator = coordinator.clone();
            async move {
                let request = &request;
                coordinator
                    .execute(|client| async move { client.edit_image(request).await })
                    .await
            }
        });
        match events.next().await {
            Some(event) => event.outcome,
            None => Err(SdkError::other("edit produced no outcome")),
        }
    }

    /// Check a key with one cheap provider call, outside the pool.
    pub async fn validate_credential(
        &self,
        token: &str,
        base_url: Option<&str>,
    ) -> Result<(), SdkError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SdkError::InvalidArgument {
                message: "api key must not be empty".into(),
            });
        }
        let credential = Credential::new(token, base_url.map(str::to_string));
        let client = (self.factory)(&credential);
        let result = client.validate().await;
        match &result {
            Ok(()) => tracing::info!(
                target: TRACE_TARGET,
                provider = client.provider_name(),
                key = %credential.redacted(),
                "credential accepted"
            ),
            Err(err) => tracing::warn!(
                target: TRACE_TARGET,
                provider = client.provider_name(),
                key = %credential.redacted(),
                kind = ?err.kind(),
                "credential rejected"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_plan_pads_with_first_style_and_truncates() {
        let planned = vec![ShotSpec {
            description: "Hero walks in".into(),
            visual_style: "Noir".into(),
            shot_type: "Wide Shot".into(),
        }];
        let padded = fit_plan(planned.clone(), 3);
        assert_eq!(padded.len(), 3);
        assert_eq!(padded[0], planned[0]);
        assert!(padded[1..].iter().all(|s| s.visual_style == "Noir" && s.shot_type == "Insert Shot"));

        let empty = fit_plan(Vec::new(), 2);
        assert!(empty.iter().all(|s| s.visual_style == "Cinematic"));

        let many = fit_plan(vec![planned[0].clone(); 6], 4);
        assert_eq!(many.len(), 4);
    }
}
