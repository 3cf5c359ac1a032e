//! Per-frame analysis instruction.

use pitchscan_models::{format_timestamp, MatchEvent};

/// Build the instruction sent alongside a frame taken at `timestamp` seconds.
pub fn build_frame_prompt(timestamp: f64) -> String {
    let events = MatchEvent::ALL
        .iter()
        .map(|e| e.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a football (soccer) match analysis assistant.
Analyze this single frame taken at {clock} ({seconds:.3} seconds into the clip).

Return ONLY a JSON object with these fields:
- "timestamp": {seconds:.3}
- "event": the main action visible, one of: {events}
- "ball_position": approximate ball location as "x, y" in normalized pitch coordinates (0-1), or "Not visible"
- "players_detected": number of players visible
- "team_a_shape": Team A formation or shape, e.g. "4-4-2", or "Unknown"
- "team_b_shape": Team B formation or shape, or "Unknown"
- "tactical_notes": one or two sentences on the tactical situation, or "none"
- "team": the team in possession, "A", "B" or "unknown"
- "players": list of visible players with "id", "team" ("A" or "B"), "position" (zone such as "left defensive") and "coordinates" [x, y]

Rules:
- Team A is the team attacking left to right at the start of the clip.
- Use "unknown" or "Unknown" when something cannot be determined; never guess jersey numbers.
- Do not include any text outside the JSON object."#,
        clock = format_timestamp(timestamp),
        seconds = timestamp,
        events = events,
    )
}
