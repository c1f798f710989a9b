//! Merges task outcomes back into a caller-owned shot collection.

use serde::{Deserialize, Serialize};

use crate::core::error::{ErrorKind, SdkError};
use crate::core::scheduler::TaskEvent;
use crate::types::image::DataUri;
use crate::types::shot::{GenerationMode, GenerationTask, Shot, ShotId, ShotSpec};

/// Language of user-facing failure labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "zh-CN")]
    ZhCn,
}

/// Which operation a failure came from; edits get their own label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureContext {
    Generate,
    Regenerate,
    Edit,
}

/// Short label shown on a failed shot.
///
/// Quota exhaustion is called out separately because the user can act on
/// it by waiting or adding credentials.
pub fn failure_label(err: &SdkError, context: FailureContext, locale: Locale) -> &'static str {
    let quota = err.kind() == ErrorKind::RateLimited;
    match (locale, quota, context) {
        (Locale::En, true, _) => "Quota limited (retry later)",
        (Locale::En, false, FailureContext::Generate) => "Generation failed",
        (Locale::En, false, FailureContext::Regenerate) => "Retry failed",
        (Locale::En, false, FailureContext::Edit) => "Edit failed",
        (Locale::ZhCn, true, _) => "配额受限 (稍后重试)",
        (Locale::ZhCn, false, FailureContext::Generate) => "生成失败",
        (Locale::ZhCn, false, FailureContext::Regenerate) => "重试失败",
        (Locale::ZhCn, false, FailureContext::Edit) => "编辑失败",
    }
}

/// Ordered shot collection driven by scheduler events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotBoard {
    shots: Vec<Shot>,
    #[serde(default)]
    locale: Locale,
}

impl ShotBoard {
    pub fn new(shots: Vec<Shot>) -> Self {
        Self {
            shots,
            locale: Locale::default(),
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn shots(&self) -> &[Shot] {
        &self.shots
    }

    pub fn into_shots(self) -> Vec<Shot> {
        self.shots
    }

    pub fn get(&self, id: ShotId) -> Option<&Shot> {
        self.shots.iter().find(|s| s.id == id)
    }

    fn get_mut(&mut self, id: ShotId) -> Option<&mut Shot> {
        self.shots.iter_mut().find(|s| s.id == id)
    }

    /// Shots still waiting on an outcome.
    pub fn pending(&self) -> usize {
        self.shots.iter().filter(|s| s.is_generating).count()
    }

    /// Mark a shot as submitted again; clears any previous error.
    pub fn begin(&mut self, id: ShotId) -> bool {
        match self.get_mut(id) {
            Some(shot) => {
                shot.is_generating = true;
                shot.error = None;
                true
            }
            None => false,
        }
    }

    /// Resolve a shot. Returns `false` when the id is unknown or the shot
    /// already resolved for the current submission.
    pub fn resolve(
        &mut self,
        id: ShotId,
        outcome: &Result<DataUri, SdkError>,
        context: FailureContext,
    ) -> bool {
        let locale = self.locale;
        let Some(shot) = self.get_mut(id) else {
            tracing::debug!(target: "storyboard::projection", shot_id = %id, "outcome for unknown shot dropped");
            return false;
        };
        if !shot.is_generating {
            return false;
        }
        shot.is_generating = false;
        match outcome {
            Ok(image) => {
                shot.image_url = Some(image.clone());
                shot.error = None;
            }
            Err(err) => {
                shot.error = Some(failure_label(err, context, locale).to_string());
            }
        }
        true
    }

    /// Apply one scheduler event.
    pub fn apply(&mut self, event: &TaskEvent<GenerationTask, DataUri>) -> bool {
        let context = match event.task.mode {
            GenerationMode::Fresh => FailureContext::Generate,
            GenerationMode::Variation => FailureContext::Regenerate,
        };
        self.resolve(event.task.id(), &event.outcome, context)
    }

    pub fn update_spec(&mut self, id: ShotId, spec: ShotSpec) -> bool {
        match self.get_mut(id) {
            Some(shot) => {
                shot.spec = spec;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: ShotId) -> Option<Shot> {
        let idx = self.shots.iter().position(|s| s.id == id)?;
        Some(self.shots.remove(idx))
    }

    /// Finished images in board order.
    pub fn completed_images(&self) -> impl Iterator<Item = (&Shot, &DataUri)> {
        self.shots
            .iter()
            .filter_map(|s| s.image_url.as_ref().map(|img| (s, img)))
    }
}
