//! `generateContent` wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitchscan_media::EncodedFrame;

use crate::error::{VisionError, VisionResult};
use crate::prompt::build_frame_prompt;
use crate::schema::frame_response_schema;

/// Gemini `generateContent` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl GenerateContentRequest {
    /// One request for one frame: image, instruction and output schema.
    pub fn for_frame(frame: &EncodedFrame) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: frame.mime_type().to_string(),
                            data: frame.to_base64(),
                        },
                    },
                    Part::Text {
                        text: build_frame_prompt(frame.timestamp),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: frame_response_schema(),
                temperature: Some(0.2),
            },
        }
    }
}

/// Gemini `generateContent` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Pull the model's JSON out of a `generateContent` response body.
pub fn parse_generate_content(body: &str) -> VisionResult<Value> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| VisionError::invalid_response(format!("malformed response envelope: {}", e)))?;

    let candidate = response.candidates.first().ok_or_else(|| {
        let feedback = response
            .prompt_feedback
            .map(|f| f.to_string())
            .unwrap_or_else(|| "none".to_string());
        VisionError::invalid_response(format!("no candidates (prompt feedback: {})", feedback))
    })?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(VisionError::invalid_response(format!(
            "empty candidate (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    serde_json::from_str(strip_code_fence(&text))
        .map_err(|e| VisionError::invalid_response(format!("model output is not JSON: {}", e)))
}

/// Remove a surrounding markdown code fence, with or without a `json` tag.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}
