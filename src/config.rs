//! Configuration: app settings (TOML), mood packs and story lists (JSON),
//! and the recognized `KEEGAN_*` environment variables.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::mood::{MoodPack, default_pack};
use crate::story::StoryConfig;
use crate::telemetry::is_enabled_flag;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found: {0}")]
    NotFound(String),
    #[error("config invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "AudioConfig::default_block_frames")]
    pub block_frames: usize,
}

impl AudioConfig {
    fn default_sample_rate() -> u32 {
        48_000
    }
    fn default_block_frames() -> usize {
        512
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: Self::default_sample_rate(),
            block_frames: Self::default_block_frames(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "PathsConfig::default_moods")]
    pub moods: String,
    #[serde(default = "PathsConfig::default_stories")]
    pub stories: String,
}

impl PathsConfig {
    fn default_moods() -> String {
        "config/moods.json".to_string()
    }
    fn default_stories() -> String {
        "config/stories.json".to_string()
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            moods: Self::default_moods(),
            stories: Self::default_stories(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_intensity")]
    pub intensity: f32,
    #[serde(default = "EngineConfig::default_tick_ms")]
    pub tick_ms: u64,
}

impl EngineConfig {
    fn default_intensity() -> f32 {
        0.75
    }
    fn default_tick_ms() -> u64 {
        100
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intensity: Self::default_intensity(),
            tick_ms: Self::default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Read the TOML config, falling back to defaults on any failure. When
    /// the file does not exist, defaults are written there as a commented
    /// template so the settings are discoverable.
    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        warn!("failed to parse config {path}: {err}; using defaults");
                    }
                },
                Err(err) => {
                    warn!("failed to read config {path}: {err}; using defaults");
                }
            }
            return Self::default();
        }

        let default_cfg = Self::default();
        if let Ok(text) = toml::to_string_pretty(&default_cfg) {
            let mut commented = String::new();
            for line in text.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
                    commented.push_str(line);
                } else {
                    commented.push_str("# ");
                    commented.push_str(line);
                }
                commented.push('\n');
            }
            if let Err(err) = fs::write(path_obj, commented) {
                warn!("failed to write default config to {path}: {err}");
            }
        }
        default_cfg
    }
}

/// Load a mood pack from the JSON format of the config file. Numeric fields
/// are clamped; moods without an id or display name are dropped; an empty
/// result is invalid so callers fall back to the default pack.
pub fn load_mood_pack(path: &str) -> Result<MoodPack, ConfigError> {
    let contents =
        fs::read_to_string(path).map_err(|_| ConfigError::NotFound(path.to_string()))?;
    let mut pack: MoodPack =
        serde_json::from_str(&contents).map_err(|e| ConfigError::Invalid(e.to_string()))?;

    pack.moods.retain(|m| {
        let keep = !m.id.is_empty() && !m.display_name.is_empty();
        if !keep {
            warn!("skipping mood entry missing id or display_name");
        }
        keep
    });
    for mood in &mut pack.moods {
        mood.sanitize();
    }
    if pack.is_empty() {
        return Err(ConfigError::Invalid("no valid moods".to_string()));
    }
    Ok(pack)
}

/// Mood pack with fallback: any load failure logs a warning and yields the
/// embedded default pack. The engine keeps running either way.
pub fn load_mood_pack_or_default(path: &str) -> (MoodPack, bool) {
    match load_mood_pack(path) {
        Ok(pack) => (pack, true),
        Err(err) => {
            warn!("{err}; using default mood pack");
            (default_pack(), false)
        }
    }
}

/// Parse the stories config (a JSON array of story rows).
pub fn load_story_configs(path: &str) -> Result<Vec<StoryConfig>, ConfigError> {
    let contents =
        fs::read_to_string(path).map_err(|_| ConfigError::NotFound(path.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::Invalid(e.to_string()))
}

/// The recognized `KEEGAN_*` environment variables, read once at startup.
/// Consumers outside the engine core (web bridge, registry client,
/// broadcaster) take what they need from here.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    pub bridge_key: Option<String>,
    pub registry_key: Option<String>,
    pub broadcast_secret: Option<String>,
    pub registry_url: Option<String>,
    pub station_name: Option<String>,
    pub station_region: Option<String>,
    pub station_description: Option<String>,
    pub station_frequency: Option<String>,
    pub stream_url: Option<String>,
    pub telemetry: bool,
    pub telemetry_file: Option<String>,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        let get = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            bridge_key: get("KEEGAN_BRIDGE_KEY"),
            registry_key: get("KEEGAN_REGISTRY_KEY"),
            broadcast_secret: get("KEEGAN_BROADCAST_SECRET"),
            registry_url: get("KEEGAN_REGISTRY_URL"),
            station_name: get("KEEGAN_STATION_NAME"),
            station_region: get("KEEGAN_STATION_REGION"),
            station_description: get("KEEGAN_STATION_DESCRIPTION"),
            station_frequency: get("KEEGAN_STATION_FREQUENCY"),
            stream_url: get("KEEGAN_STREAM_URL"),
            telemetry: get("KEEGAN_TELEMETRY")
                .map(|v| is_enabled_flag(&v))
                .unwrap_or(false),
            telemetry_file: get("KEEGAN_TELEMETRY_FILE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "keegan_config_test_{}_{}",
            name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn load_or_default_writes_commented_defaults() {
        let path = unique_path("defaults.toml");
        let path_str = path.to_string_lossy().to_string();
        let _ = fs::remove_file(&path);

        let cfg = AppConfig::load_or_default(&path_str);
        assert!(path.exists(), "config file should be created");
        assert_eq!(cfg.audio.sample_rate, 48_000);
        assert_eq!(cfg.audio.block_frames, 512);
        assert_eq!(cfg.engine.tick_ms, 100);
        assert!((cfg.engine.intensity - 0.75).abs() < 1e-6);

        let contents = fs::read_to_string(&path).expect("read written config");
        assert!(contents.contains("# sample_rate = 48000"));
        assert!(contents.contains("[audio]"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_or_default_reads_existing() {
        let path = unique_path("custom.toml");
        let path_str = path.to_string_lossy().to_string();
        fs::write(
            &path,
            "[audio]\nsample_rate = 44100\n\n[engine]\nintensity = 0.5\n",
        )
        .unwrap();

        let cfg = AppConfig::load_or_default(&path_str);
        assert_eq!(cfg.audio.sample_rate, 44_100);
        assert_eq!(cfg.audio.block_frames, 512); // defaulted
        assert!((cfg.engine.intensity - 0.5).abs() < 1e-6);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn mood_pack_parses_and_clamps() {
        let path = unique_path("moods.json");
        fs::write(
            &path,
            r#"{"moods": [{
                "id": "focus_room",
                "display_name": "Focus",
                "energy": 1.5,
                "density_curve": [0.3, 0.6],
                "allowed_transitions": ["rain_cave"],
                "stems": [{"file": "a.wav", "role": "base", "gain_db": -3.0,
                           "loop": false, "probability": 2.0}],
                "synth": {"preset": "warm", "seed": 7, "pattern_density": 0.4}
            }]}"#,
        )
        .unwrap();

        let pack = load_mood_pack(path.to_str().unwrap()).expect("parse");
        assert_eq!(pack.len(), 1);
        let m = &pack.moods[0];
        assert_eq!(m.energy, 1.0, "energy must be clamped");
        assert_eq!(m.stems[0].probability, 1.0);
        assert!(!m.stems[0].looping);
        assert_eq!(m.synth.seed, 7);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_mood_pack_falls_back() {
        let (pack, loaded) = load_mood_pack_or_default("/definitely/not/here.json");
        assert!(!loaded);
        assert_eq!(pack.len(), 4);
    }

    #[test]
    fn invalid_mood_pack_falls_back() {
        let path = unique_path("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let (pack, loaded) = load_mood_pack_or_default(path.to_str().unwrap());
        assert!(!loaded);
        assert_eq!(pack.moods[0].id, "focus_room");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn moods_without_id_are_dropped() {
        let path = unique_path("anon.json");
        fs::write(
            &path,
            r#"{"moods": [{"id": "", "display_name": "X"},
                          {"id": "ok", "display_name": "OK"}]}"#,
        )
        .unwrap();
        let pack = load_mood_pack(path.to_str().unwrap()).expect("parse");
        assert_eq!(pack.len(), 1);
        assert_eq!(pack.moods[0].id, "ok");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn story_configs_parse_with_default_mood() {
        let path = unique_path("stories.json");
        fs::write(
            &path,
            r#"[{"id": "s1", "text": "hello", "audio_file": "v.wav"},
               {"id": "s2", "text": "hi", "audio_file": "w.wav", "mood": "rain_cave"}]"#,
        )
        .unwrap();
        let stories = load_story_configs(path.to_str().unwrap()).expect("parse");
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].mood, "any");
        assert_eq!(stories[1].mood, "rain_cave");
        let _ = fs::remove_file(&path);
    }
}
