//! Request bodies and response extraction for Gemini `generateContent`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::core::error::SdkError;
use crate::core::image::{EditRequest, PlanRequest};
use crate::types::image::{DataUri, DEFAULT_IMAGE_MEDIA_TYPE};
use crate::types::shot::{GenerationMode, GenerationTask};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum GoogleContent {
    #[serde(rename = "user")]
    User { parts: Vec<GoogleContentPart> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoogleContentPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GoogleInlineData,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<bool>,
    },
    /// Parts this crate never reads (function calls, signatures, ...).
    Other(JsonValue),
}

impl GoogleContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        GoogleContentPart::Text {
            text: text.into(),
            thought: None,
        }
    }

    pub fn image(uri: &DataUri) -> Self {
        GoogleContentPart::InlineData {
            inline_data: GoogleInlineData {
                mime_type: Some(uri.media_type().to_string()),
                data: uri.base64_data().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleInlineData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

/// Candidate content; the role is not needed to read it.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleResponseContent {
    #[serde(default)]
    pub parts: Vec<GoogleContentPart>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCandidate {
    #[serde(default)]
    pub content: Option<GoogleResponseContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleGenerateResponse {
    #[serde(default)]
    pub candidates: Vec<GoogleCandidate>,
    #[serde(default)]
    pub prompt_feedback: Option<JsonValue>,
}

impl GoogleGenerateResponse {
    fn first_parts(&self) -> &[GoogleContentPart] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Concatenated non-thought text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| match p {
                GoogleContentPart::Text { text, thought } if thought != &Some(true) => {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// First inline image of the first candidate.
    pub fn first_image(&self) -> Option<DataUri> {
        self.first_parts().iter().find_map(|p| match p {
            GoogleContentPart::InlineData { inline_data } if !inline_data.data.is_empty() => {
                Some(DataUri::new(
                    inline_data
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| DEFAULT_IMAGE_MEDIA_TYPE.to_string()),
                    inline_data.data.clone(),
                ))
            }
            _ => None,
        })
    }

    /// Why no content came back, when the provider says so.
    pub fn block_reason(&self) -> Option<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.get("blockReason"))
            .and_then(JsonValue::as_str)
        {
            return Some(reason.to_string());
        }
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.clone())
            .filter(|r| r != "STOP")
    }
}

pub fn parse_response(json: JsonValue) -> Result<GoogleGenerateResponse, SdkError> {
    serde_json::from_value(json)
        .map_err(|e| SdkError::malformed(format!("unexpected response shape: {e}")))
}

fn user_content(parts: Vec<GoogleContentPart>) -> JsonValue {
    json!([GoogleContent::User { parts }])
}

const PLAN_INSTRUCTION: &str = "\
You are an award-winning director of photography and storyboard artist. \
Design a storyboard of {count} shots for the user's request.

User request: \"{prompt}\"

Maximize shot variety: every shot must differ clearly from the previous one in \
framing and angle. Cycle through at least five of: Extreme Wide Shot, Wide Shot, \
Medium Shot, Close Up, Extreme Close Up, Over the Shoulder, Low Angle, \
High Angle / Overhead, Dutch Angle.

Pace the shots like a trailer: establish the setting, introduce the characters, \
cut to details, build to action, show reactions, end on an unusual viewpoint.

Keep one consistent art style taken from the reference images, and repeat each \
character's concrete visual traits in every description, even in wide shots.

Return JSON with a 'shots' list. Each shot has:
- description: a detailed image prompt including explicit camera direction
- visualStyle: style keywords
- shotType: the precise framing term";

pub fn plan_instruction(request: &PlanRequest) -> String {
    PLAN_INSTRUCTION
        .replace("{count}", &request.shot_count.to_string())
        .replace("{prompt}", request.prompt.trim())
}

fn plan_response_schema() -> JsonValue {
    json!({
        "type": "OBJECT",
        "properties": {
            "shots": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "description": { "type": "STRING" },
                        "visualStyle": { "type": "STRING" },
                        "shotType": { "type": "STRING" }
                    },
                    "required": ["description", "visualStyle", "shotType"]
                }
            }
        },
        "required": ["shots"]
    })
}

pub fn build_plan_body(request: &PlanRequest) -> JsonValue {
    let mut parts = vec![GoogleContentPart::text(plan_instruction(request))];
    parts.extend(request.references.iter().map(GoogleContentPart::image));
    json!({
        "contents": user_content(parts),
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": plan_response_schema(),
        }
    })
}

/// Prompt text for one shot.
///
/// `variation_marker` is only appended for `GenerationMode::Variation` and
/// makes an otherwise identical request produce a different image.
pub fn shot_prompt(task: &GenerationTask, variation_marker: Option<&str>) -> String {
    let or_default = |s: &str| {
        if s.trim().is_empty() {
            "Cinematic".to_string()
        } else {
            s.trim().to_string()
        }
    };
    let mut lines = vec![
        format!("[Camera Angle: {}]", or_default(&task.spec.shot_type)),
        task.spec.description.trim().to_string(),
        format!(
            "Visual Style: {}.{}",
            or_default(&task.spec.visual_style),
            task.quality.prompt_modifier()
        ),
    ];
    if let (GenerationMode::Variation, Some(marker)) = (task.mode, variation_marker) {
        lines.push(format!("(Variation {marker})"));
    }
    lines.push(
        "Strictly follow the character design and scene details from the reference images."
            .into(),
    );
    lines.push(
        "Ensure the camera angle matches the description (e.g. if it says Overhead, it MUST be Overhead)."
            .into(),
    );
    lines.join("\n")
}

pub fn build_generate_body(task: &GenerationTask, variation_marker: Option<&str>) -> JsonValue {
    let mut parts = vec![GoogleContentPart::text(shot_prompt(task, variation_marker))];
    parts.extend(task.references.iter().map(GoogleContentPart::image));
    json!({
        "contents": user_content(parts),
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": { "aspectRatio": task.aspect_ratio.as_str() },
        }
    })
}

pub fn build_edit_body(request: &EditRequest) -> JsonValue {
    let parts = vec![
        GoogleContentPart::image(&request.image),
        GoogleContentPart::text(request.instruction.trim()),
    ];
    json!({
        "contents": user_content(parts),
        "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] }
    })
}

pub fn build_ping_body() -> JsonValue {
    json!({ "contents": user_content(vec![GoogleContentPart::text("ping")]) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::shot::{AspectRatio, QualityLevel, ShotId, ShotSpec};
    use std::sync::Arc;

    fn task(mode: GenerationMode) -> GenerationTask {
        GenerationTask {
            shot_id: ShotId::new(),
            spec: ShotSpec {
                description: "A lighthouse in a storm".into(),
                visual_style: String::new(),
                shot_type: "Low Angle".into(),
            },
            aspect_ratio: AspectRatio::Portrait9x16,
            quality: QualityLevel::Hd,
            mode,
            references: Arc::from(vec![DataUri::new("image/jpeg", "AAAA")]),
        }
    }

    #[test]
    fn shot_prompt_includes_angle_style_and_quality() {
        let prompt = shot_prompt(&task(GenerationMode::Fresh), Some("42"));
        assert!(prompt.starts_with("[Camera Angle: Low Angle]"));
        assert!(prompt.contains("Visual Style: Cinematic., 4k resolution"));
        assert!(!prompt.contains("Variation"));
    }

    #[test]
    fn variation_marker_only_for_variation_mode() {
        let prompt = shot_prompt(&task(GenerationMode::Variation), Some("42"));
        assert!(prompt.contains("(Variation 42)"));
    }

    #[test]
    fn generate_body_carries_references_and_aspect_ratio() {
        let body = build_generate_body(&task(GenerationMode::Fresh), None);
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "9:16");
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(body["contents"][0]["role"], "user");
    }

    #[test]
    fn response_extracts_first_image_and_skips_text() {
        let parsed = parse_response(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "here you go" },
                    { "inlineData": { "data": "Zm9v" } },
                    { "inlineData": { "mimeType": "image/jpeg", "data": "YmFy" } }
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        let image = parsed.first_image().unwrap();
        assert_eq!(image.to_string(), "data:image/png;base64,Zm9v");
        assert_eq!(parsed.text().as_deref(), Some("here you go"));
        assert_eq!(parsed.block_reason(), None);
    }

    #[test]
    fn block_reason_reported_from_prompt_feedback() {
        let parsed = parse_response(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert!(parsed.first_image().is_none());
        assert_eq!(parsed.block_reason().as_deref(), Some("SAFETY"));
    }
}
