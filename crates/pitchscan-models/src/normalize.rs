//! Normalization of untrusted model output into [`FrameAnalysis`].
//!
//! The model is asked for schema-conformant JSON but nothing here assumes it
//! complied. Every field is repaired independently; a missing or malformed
//! field falls back to its sentinel and the rest of the record survives.
//! Unknown fields are ignored so upstream model drift stays harmless.

use serde_json::{Map, Value};
use tracing::debug;

use crate::frame::{
    FrameAnalysis, MatchEvent, PlayerSighting, RawModelOutput, Team, BALL_NOT_VISIBLE,
    BALL_POSITION_UNKNOWN, NOTES_NONE, PLAYER_FIELD_UNKNOWN, SHAPE_UNKNOWN,
};

const TEAM_A_ALIASES: &[&str] = &["a", "1", "one", "first", "home", "host", "hosts"];
const TEAM_B_ALIASES: &[&str] = &["b", "2", "two", "second", "away", "visitor", "visitors", "guest", "guests"];

/// Normalize one model response. Total: never fails.
pub fn normalize(raw: &RawModelOutput) -> FrameAnalysis {
    let empty = Map::new();
    let object = root_object(&raw.value).unwrap_or(&empty);
    let mut defaulted: Vec<&'static str> = Vec::new();

    let timestamp = if raw.timestamp.is_finite() && raw.timestamp >= 0.0 {
        raw.timestamp
    } else {
        defaulted.push("timestamp");
        0.0
    };

    let players = parse_players(object.get("players"));

    let event = match object.get("event").and_then(Value::as_str).and_then(MatchEvent::parse_loose) {
        Some(event) => event,
        None => {
            defaulted.push("event");
            MatchEvent::None
        }
    };

    let ball_position = parse_ball_position(object).unwrap_or_else(|| {
        defaulted.push("ball_position");
        BALL_POSITION_UNKNOWN.to_string()
    });

    let players_detected = match object.get("players_detected") {
        None | Some(Value::Null) => players.len() as u32,
        Some(value) => coerce_count(value).unwrap_or_else(|| {
            defaulted.push("players_detected");
            0
        }),
    };

    let team_a_shape = parse_shape(object, "team_a_shape", "team_a_formation", &players, Team::A)
        .unwrap_or_else(|| {
            defaulted.push("team_a_shape");
            SHAPE_UNKNOWN.to_string()
        });
    let team_b_shape = parse_shape(object, "team_b_shape", "team_b_formation", &players, Team::B)
        .unwrap_or_else(|| {
            defaulted.push("team_b_shape");
            SHAPE_UNKNOWN.to_string()
        });

    let tactical_notes = non_empty_str(object.get("tactical_notes"))
        .or_else(|| non_empty_str(object.get("tactical_context")))
        .unwrap_or_else(|| {
            defaulted.push("tactical_notes");
            NOTES_NONE.to_string()
        });

    let team = ["team", "team_in_possession", "possession"]
        .iter()
        .find_map(|key| object.get(*key))
        .map(parse_team)
        .unwrap_or(Team::Unknown);

    let source = non_empty_str(object.get("source")).unwrap_or_default();

    if !defaulted.is_empty() {
        debug!(
            timestamp = timestamp,
            fields = ?defaulted,
            "Normalization applied defaults"
        );
    }

    FrameAnalysis {
        timestamp,
        event,
        ball_position,
        players_detected,
        team_a_shape,
        team_b_shape,
        tactical_notes,
        team,
        players,
        source,
    }
}

/// Map free-text or numeric team identity to `A`, `B` or `unknown`.
///
/// Case-insensitive; the word "team" and separators are ignored, so
/// "Team A", "TEAM 1", "team_a", "1" and "home" all map to `A`.
pub fn parse_team(value: &Value) -> Team {
    match value {
        Value::Number(n) => n.as_f64().map_or(Team::Unknown, team_number),
        Value::String(s) => parse_team_str(s),
        _ => Team::Unknown,
    }
}

fn team_number(x: f64) -> Team {
    if x == 1.0 {
        Team::A
    } else if x == 2.0 {
        Team::B
    } else {
        Team::Unknown
    }
}

fn parse_team_str(s: &str) -> Team {
    let lowered = s.to_lowercase().replace("team", "");
    let key = lowered.trim_matches(|c: char| c.is_whitespace() || matches!(c, '_' | '-' | ':' | '.'));

    if TEAM_A_ALIASES.contains(&key) {
        Team::A
    } else if TEAM_B_ALIASES.contains(&key) {
        Team::B
    } else {
        // "1.0" and "2e0" read the same as the numbers they spell
        key.parse::<f64>().map_or(Team::Unknown, team_number)
    }
}

/// The model sometimes wraps its object in a one-element array.
fn root_object(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.iter().find_map(Value::as_object),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Coerce to a non-negative integer. Negative and non-numeric values are rejected.
fn coerce_count(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if !number.is_finite() || number < 0.0 {
        return None;
    }
    Some(number.trunc().min(u32::MAX as f64) as u32)
}

fn parse_coordinates(value: Option<&Value>) -> Option<[f64; 2]> {
    let items = value?.as_array()?;
    let x = items.first()?.as_f64()?;
    let y = items.get(1)?.as_f64()?;
    (x.is_finite() && y.is_finite()).then_some([x, y])
}

fn parse_players(value: Option<&Value>) -> Vec<PlayerSighting> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|player| PlayerSighting {
            id: match player.get("id") {
                Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => PLAYER_FIELD_UNKNOWN.to_string(),
            },
            team: player.get("team").map(parse_team).unwrap_or_default(),
            position: non_empty_str(player.get("position"))
                .unwrap_or_else(|| PLAYER_FIELD_UNKNOWN.to_string()),
            coordinates: parse_coordinates(player.get("coordinates")),
        })
        .collect()
}

fn parse_ball_position(object: &Map<String, Value>) -> Option<String> {
    if let Some(position) = non_empty_str(object.get("ball_position")) {
        return Some(position);
    }

    let ball = object.get("ball")?.as_object()?;
    let visible = ball.get("visible").and_then(Value::as_bool).unwrap_or(false);
    match parse_coordinates(ball.get("coordinates")) {
        Some([x, y]) if visible => Some(format!("{}, {}", x, y)),
        _ => Some(BALL_NOT_VISIBLE.to_string()),
    }
}

fn parse_shape(
    object: &Map<String, Value>,
    shape_key: &str,
    formation_key: &str,
    players: &[PlayerSighting],
    team: Team,
) -> Option<String> {
    non_empty_str(object.get(shape_key))
        .or_else(|| {
            object
                .get("formation_analysis")
                .and_then(Value::as_object)
                .and_then(|formation| non_empty_str(formation.get(formation_key)))
        })
        .or_else(|| infer_formation(players.iter().filter(|p| p.team == team)))
}

/// Rough formation from zone words in player positions.
fn infer_formation<'a>(players: impl Iterator<Item = &'a PlayerSighting>) -> Option<String> {
    let (mut defensive, mut midfield, mut attacking, mut total) = (0, 0, 0, 0);
    for player in players {
        let position = player.position.to_lowercase();
        total += 1;
        if position.contains("defensive") {
            defensive += 1;
        }
        if position.contains("midfield") {
            midfield += 1;
        }
        if position.contains("attacking") {
            attacking += 1;
        }
    }

    if defensive > 0 && midfield > 0 && attacking > 0 {
        Some(format!("{}-{}-{}", defensive, midfield, attacking))
    } else if defensive > 0 && midfield > 0 {
        Some(format!("{}-{}", defensive, midfield))
    } else if total >= 3 {
        Some(format!("{}-player formation", total))
    } else {
        None
    }
}
