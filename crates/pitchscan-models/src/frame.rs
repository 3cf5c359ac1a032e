//! Canonical per-frame analysis record.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for an unknown ball position.
pub const BALL_POSITION_UNKNOWN: &str = "unknown";
/// Ball position reported when the model says the ball is not visible.
pub const BALL_NOT_VISIBLE: &str = "Not visible";
/// Sentinel for an unknown team shape.
pub const SHAPE_UNKNOWN: &str = "Unknown";
/// Sentinel for missing tactical notes.
pub const NOTES_NONE: &str = "none";
/// Sentinel for unknown player ids and positions.
pub const PLAYER_FIELD_UNKNOWN: &str = "unknown";

/// Team identity. Anything unrecognized collapses to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum Team {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B")]
    B,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::A => "A",
            Team::B => "B",
            Team::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match event vocabulary the model is constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchEvent {
    Pass,
    Shot,
    Dribble,
    Tackle,
    Interception,
    Clearance,
    Duel,
    Goal,
    SetPiece,
    Transition,
    #[default]
    None,
}

impl MatchEvent {
    /// All events, in schema order.
    pub const ALL: [MatchEvent; 11] = [
        MatchEvent::Pass,
        MatchEvent::Shot,
        MatchEvent::Dribble,
        MatchEvent::Tackle,
        MatchEvent::Interception,
        MatchEvent::Clearance,
        MatchEvent::Duel,
        MatchEvent::Goal,
        MatchEvent::SetPiece,
        MatchEvent::Transition,
        MatchEvent::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchEvent::Pass => "pass",
            MatchEvent::Shot => "shot",
            MatchEvent::Dribble => "dribble",
            MatchEvent::Tackle => "tackle",
            MatchEvent::Interception => "interception",
            MatchEvent::Clearance => "clearance",
            MatchEvent::Duel => "duel",
            MatchEvent::Goal => "goal",
            MatchEvent::SetPiece => "set_piece",
            MatchEvent::Transition => "transition",
            MatchEvent::None => "none",
        }
    }

    /// Lenient parse: case-insensitive, accepts spaces/dashes and a few synonyms.
    pub fn parse_loose(s: &str) -> Option<Self> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let event = match key.as_str() {
            "pass" | "passing" => MatchEvent::Pass,
            "shot" | "shooting" | "shot_on_target" => MatchEvent::Shot,
            "dribble" | "dribbling" => MatchEvent::Dribble,
            "tackle" => MatchEvent::Tackle,
            "interception" => MatchEvent::Interception,
            "clearance" => MatchEvent::Clearance,
            "duel" | "aerial_duel" => MatchEvent::Duel,
            "goal" => MatchEvent::Goal,
            "set_piece" | "corner" | "free_kick" | "throw_in" | "penalty" => MatchEvent::SetPiece,
            "transition" | "counter_attack" | "counterattack" => MatchEvent::Transition,
            "none" | "no_event" => MatchEvent::None,
            _ => return None,
        };
        Some(event)
    }
}

impl fmt::Display for MatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One player seen in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlayerSighting {
    /// Player identifier or "unknown"
    pub id: String,
    pub team: Team,
    /// Zone description, e.g. "left defensive"
    pub position: String,
    /// Normalized pitch coordinates when the model supplied two numbers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[f64; 2]>,
}

/// Validated analysis of a single frame.
///
/// Every field has a defined default so a record can always be produced,
/// whatever the model returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameAnalysis {
    /// Frame timestamp in seconds from the start of its video
    pub timestamp: f64,
    pub event: MatchEvent,
    /// "x, y", "Not visible", or "unknown"
    pub ball_position: String,
    pub players_detected: u32,
    pub team_a_shape: String,
    pub team_b_shape: String,
    pub tactical_notes: String,
    /// Team attached to the frame's event (possession)
    #[serde(default)]
    pub team: Team,
    #[serde(default)]
    pub players: Vec<PlayerSighting>,
    /// Source video id, filled in by the pipeline
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
}

impl FrameAnalysis {
    /// A record holding only defaults.
    pub fn empty(timestamp: f64) -> Self {
        Self {
            timestamp,
            event: MatchEvent::None,
            ball_position: BALL_POSITION_UNKNOWN.to_string(),
            players_detected: 0,
            team_a_shape: SHAPE_UNKNOWN.to_string(),
            team_b_shape: SHAPE_UNKNOWN.to_string(),
            tactical_notes: NOTES_NONE.to_string(),
            team: Team::Unknown,
            players: Vec::new(),
            source: String::new(),
        }
    }

    /// Attach the source video id.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Untyped JSON returned by one model call, paired with the timestamp of the
/// frame that was sent. The frame timestamp is authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct RawModelOutput {
    pub timestamp: f64,
    pub value: serde_json::Value,
}

impl RawModelOutput {
    pub fn new(timestamp: f64, value: serde_json::Value) -> Self {
        Self { timestamp, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_serialization() {
        assert_eq!(serde_json::to_string(&Team::A).unwrap(), "\"A\"");
        assert_eq!(serde_json::to_string(&Team::Unknown).unwrap(), "\"unknown\"");
        let team: Team = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(team, Team::B);
    }

    #[test]
    fn test_event_round_trips_through_as_str() {
        for event in MatchEvent::ALL {
            assert_eq!(MatchEvent::parse_loose(event.as_str()), Some(event));
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event.as_str()));
        }
    }

    #[test]
    fn test_event_parse_loose() {
        assert_eq!(MatchEvent::parse_loose("  PASS "), Some(MatchEvent::Pass));
        assert_eq!(MatchEvent::parse_loose("Set Piece"), Some(MatchEvent::SetPiece));
        assert_eq!(MatchEvent::parse_loose("counter-attack"), Some(MatchEvent::Transition));
        assert_eq!(MatchEvent::parse_loose("bicycle kick"), None);
    }

    #[test]
    fn test_empty_record_uses_sentinels() {
        let analysis = FrameAnalysis::empty(4.0);
        assert_eq!(analysis.event, MatchEvent::None);
        assert_eq!(analysis.ball_position, "unknown");
        assert_eq!(analysis.team_a_shape, "Unknown");
        assert_eq!(analysis.tactical_notes, "none");
        assert_eq!(analysis.players_detected, 0);
    }

    #[test]
    fn test_schema_lists_canonical_fields() {
        let schema = schemars::schema_for!(FrameAnalysis);
        let json = serde_json::to_value(&schema).unwrap();
        let properties = json["properties"].as_object().unwrap();
        for field in [
            "timestamp",
            "event",
            "ball_position",
            "players_detected",
            "team_a_shape",
            "team_b_shape",
            "tactical_notes",
        ] {
            assert!(properties.contains_key(field), "missing {}", field);
        }
    }
}
