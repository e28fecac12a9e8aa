//! Read-mostly state exchanged with external surfaces (tray, web bridge).
//!
//! `PublicState` is a plain value: the engine publishes a fresh copy each
//! control tick and consumers read copies, never references. The JSON
//! renderings here are the canonical bodies served by the external web
//! collaborator (`/api/state`, `/api/vibe`).

use chrono::{Local, Timelike};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublicState {
    #[serde(rename = "mood")]
    pub mood_id: String,
    #[serde(rename = "targetMood")]
    pub target_mood_id: String,
    #[serde(rename = "activeProcess")]
    pub active_process: String,
    pub energy: f32,
    pub intensity: f32,
    pub activity: f32,
    #[serde(rename = "idleSeconds")]
    pub idle_seconds: f32,
    pub playing: bool,
    #[serde(rename = "updatedAtMs")]
    pub updated_at_ms: u64,
}

#[derive(Debug, Serialize)]
struct VibeState<'a> {
    mood: &'a str,
    energy: f32,
    activity: f32,
    intensity: f32,
    #[serde(rename = "timeOfDay")]
    time_of_day: f32,
}

pub fn state_json(state: &PublicState) -> String {
    serde_json::to_string(state).unwrap_or_else(|_| "{}".to_string())
}

/// Privacy-safe subset: no process name, no idle time.
pub fn vibe_json(state: &PublicState) -> String {
    let vibe = VibeState {
        mood: &state.mood_id,
        energy: state.energy,
        activity: state.activity,
        intensity: state.intensity,
        time_of_day: time_of_day01(),
    };
    serde_json::to_string(&vibe).unwrap_or_else(|_| "{}".to_string())
}

/// Local wall-clock position in the day, in [0, 1).
pub fn time_of_day01() -> f32 {
    let now = Local::now();
    let secs = now.hour() * 3600 + now.minute() * 60 + now.second();
    secs as f32 / 86_400.0
}

/// Local hour [0, 24), for the melatonin shelf schedule.
pub fn local_hour() -> u32 {
    Local::now().hour()
}

pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_json_has_canonical_fields() {
        let state = PublicState {
            mood_id: "focus_room".into(),
            target_mood_id: "rain_cave".into(),
            active_process: "code.exe".into(),
            energy: 0.5,
            intensity: 0.75,
            activity: 0.25,
            idle_seconds: 3.0,
            playing: true,
            updated_at_ms: 1234,
        };
        let json = state_json(&state);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["mood"], "focus_room");
        assert_eq!(parsed["targetMood"], "rain_cave");
        assert_eq!(parsed["activeProcess"], "code.exe");
        assert_eq!(parsed["playing"], true);
        assert_eq!(parsed["updatedAtMs"], 1234);
        assert!(parsed["idleSeconds"].is_number());
    }

    #[test]
    fn vibe_json_is_the_privacy_safe_subset() {
        let state = PublicState {
            mood_id: "sleep_ship".into(),
            active_process: "secret.exe".into(),
            ..PublicState::default()
        };
        let json = vibe_json(&state);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["mood"], "sleep_ship");
        assert!(parsed.get("activeProcess").is_none());
        assert!(parsed.get("idleSeconds").is_none());
        let tod = parsed["timeOfDay"].as_f64().unwrap();
        assert!((0.0..1.0).contains(&tod));
    }

    #[test]
    fn time_of_day_in_unit_range() {
        let t = time_of_day01();
        assert!((0.0..1.0).contains(&t));
    }
}
