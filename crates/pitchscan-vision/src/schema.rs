//! Response schema sent with each request.
//!
//! Gemini accepts an OpenAPI subset with upper-case type names. The schema
//! mirrors `FrameAnalysis`, but responses are still normalized afterwards.

use serde_json::{json, Value};

use pitchscan_models::MatchEvent;

/// Schema constraining the model's JSON output.
pub fn frame_response_schema() -> Value {
    let events: Vec<&str> = MatchEvent::ALL.iter().map(|e| e.as_str()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "timestamp": { "type": "NUMBER" },
            "event": { "type": "STRING", "enum": events },
            "ball_position": { "type": "STRING" },
            "players_detected": { "type": "INTEGER" },
            "team_a_shape": { "type": "STRING" },
            "team_b_shape": { "type": "STRING" },
            "tactical_notes": { "type": "STRING" },
            "team": { "type": "STRING", "enum": ["A", "B", "unknown"] },
            "players": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "team": { "type": "STRING", "enum": ["A", "B", "unknown"] },
                        "position": { "type": "STRING" },
                        "coordinates": { "type": "ARRAY", "items": { "type": "NUMBER" } }
                    },
                    "required": ["team", "position"]
                }
            }
        },
        "required": [
            "timestamp",
            "event",
            "ball_position",
            "players_detected",
            "team_a_shape",
            "team_b_shape",
            "tactical_notes"
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_requires_canonical_fields() {
        let schema = frame_response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"players_detected"));
        assert!(required.contains(&"tactical_notes"));
        assert_eq!(schema["properties"]["event"]["enum"].as_array().unwrap().len(), 11);
    }
}
