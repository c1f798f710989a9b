use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::types::image::DataUri;

/// Stable identity of a shot; also the identity of every task issued for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShotId(Uuid);

impl ShotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ShotId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ShotId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ShotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[default]
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "21:9")]
    Cinema21x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 8] = [
        AspectRatio::Square,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
        AspectRatio::Cinema21x9,
    ];

    /// Wire form understood by the provider, e.g. `"16:9"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Cinema21x9 => "21:9",
        }
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == needle)
            .ok_or_else(|| format!("unsupported aspect ratio '{needle}'"))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    #[default]
    Standard,
    Hd,
    #[serde(rename = "4k")]
    UltraHd,
}

impl QualityLevel {
    /// Prompt suffix appended for this level; empty for `Standard`.
    pub fn prompt_modifier(&self) -> &'static str {
        match self {
            QualityLevel::Standard => "",
            QualityLevel::Hd => {
                ", 4k resolution, highly detailed, sharp focus, cinematic lighting, octane render"
            }
            QualityLevel::UltraHd => {
                ", 8k resolution, masterpiece, production quality, incredibly detailed, ray tracing, unreal engine 5 style"
            }
        }
    }
}

/// Grid edge length; a storyboard has `size * size` shots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GridSize(u8);

impl GridSize {
    pub const MIN: u8 = 2;
    pub const MAX: u8 = 5;

    pub fn new(size: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&size).then_some(Self(size))
    }

    pub fn edge(&self) -> u8 {
        self.0
    }

    pub fn shot_count(&self) -> usize {
        usize::from(self.0) * usize::from(self.0)
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self(2)
    }
}

impl TryFrom<u8> for GridSize {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "grid size must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<GridSize> for u8 {
    fn from(value: GridSize) -> Self {
        value.0
    }
}

/// One planned shot as returned by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotSpec {
    pub description: String,
    #[serde(default)]
    pub visual_style: String,
    #[serde(default)]
    pub shot_type: String,
}

impl ShotSpec {
    pub const DEFAULT_STYLE: &'static str = "Cinematic";

    /// Generic spec used to pad a plan that came back short.
    pub fn filler(visual_style: Option<&str>) -> Self {
        Self {
            description: "Atmospheric detail shot consistent with the scene.".into(),
            visual_style: visual_style
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(Self::DEFAULT_STYLE)
                .to_string(),
            shot_type: "Insert Shot".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    Fresh,
    /// Regeneration that asks the provider for a visibly different take.
    Variation,
}

/// A single unit of work for the scheduler.
///
/// References are shared between all tasks of a batch, so cloning a task
/// never copies image payloads.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub shot_id: ShotId,
    pub spec: ShotSpec,
    pub aspect_ratio: AspectRatio,
    pub quality: QualityLevel,
    pub mode: GenerationMode,
    pub references: Arc<[DataUri]>,
}

impl GenerationTask {
    pub fn id(&self) -> ShotId {
        self.shot_id
    }
}

/// Displayable shot owned by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shot {
    pub id: ShotId,
    #[serde(flatten)]
    pub spec: ShotSpec,
    pub aspect_ratio: AspectRatio,
    pub is_generating: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<DataUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Shot {
    /// A freshly planned shot, pending generation.
    pub fn planned(spec: ShotSpec, aspect_ratio: AspectRatio) -> Self {
        Self {
            id: ShotId::new(),
            spec,
            aspect_ratio,
            is_generating: true,
            image_url: None,
            error: None,
        }
    }

    pub fn task(
        &self,
        quality: QualityLevel,
        mode: GenerationMode,
        references: Arc<[DataUri]>,
    ) -> GenerationTask {
        GenerationTask {
            shot_id: self.id,
            spec: self.spec.clone(),
            aspect_ratio: self.aspect_ratio,
            quality,
            mode,
            references,
        }
    }
}
