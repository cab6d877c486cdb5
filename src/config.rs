//! # Configuration Document
//!
//! The YAML file that drives a build:
//!
//! ```yaml
//! tempo: 120          # optional, quarter notes per minute for every song
//! songs_dir: songs    # optional, where <name>.musicxml files live
//! songs:
//!   silent_night:
//!     duty_cycle: 60
//!     speed: 90
//!   jingle_bells:
//!     transpose: 2
//!     enabled: false
//!   noel:             # all defaults
//! ```
//!
//! Songs keep the order they are listed in, which is also the order of the
//! melody enum on the firmware side.

use crate::codegen::sanitize_identifier;
use crate::error::TuneError;
use crate::pitch::DEFAULT_TEMPO;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SONGS_DIR: &str = "songs";

/// Playback parameters for one song, as stored in the firmware's `song_config_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// PWM duty cycle in percent (10-100)
    pub duty_cycle: u8,
    /// Playback speed in percent (25-1000, 100 = as written)
    pub speed: u16,
    /// Transposition in semitones (-12 to +12)
    pub transpose: i8,
}

impl PlaybackConfig {
    pub const fn new(duty_cycle: u8, speed: u16, transpose: i8) -> Self {
        Self {
            duty_cycle,
            speed,
            transpose,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::new(75, 100, 0)
    }
}

/// Config used for `MELODY_NONE`.
pub const FALLBACK_PLAYBACK: PlaybackConfig = PlaybackConfig::new(50, 100, 0);
/// Config used for the built-in test tone.
pub const TEST_TONE_PLAYBACK: PlaybackConfig = PlaybackConfig::new(80, 100, 0);

/// One entry of the `songs` mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongConfig {
    pub name: String,
    pub playback: PlaybackConfig,
    pub enabled: bool,
}

impl SongConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            playback: PlaybackConfig::default(),
            enabled: true,
        }
    }

    pub fn identifier(&self) -> String {
        sanitize_identifier(&self.name)
    }
}

/// Raw per-song entry as written in YAML
#[derive(Deserialize, Debug, Default)]
struct RawSongConfig {
    duty_cycle: Option<i64>,
    speed: Option<i64>,
    transpose: Option<i64>,
    enabled: Option<bool>,
    /// Keys this tool does not use (`title`, notes for other tools)
    #[serde(flatten)]
    other: BTreeMap<String, serde_yaml::Value>,
}

/// Raw document as written in YAML
#[derive(Deserialize, Debug, Default)]
struct RawConfig {
    tempo: Option<i64>,
    songs_dir: Option<PathBuf>,
    #[serde(default)]
    songs: serde_yaml::Mapping,
}

/// The validated configuration document
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub tempo: u32,
    pub songs_dir: PathBuf,
    pub songs: Vec<SongConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            songs_dir: PathBuf::from(DEFAULT_SONGS_DIR),
            songs: Vec::new(),
        }
    }
}

fn ranged<T: TryFrom<i64>>(
    song: &str,
    field: &str,
    value: Option<i64>,
    range: std::ops::RangeInclusive<i64>,
    default: T,
) -> Result<T, TuneError> {
    let Some(value) = value else {
        return Ok(default);
    };
    if !range.contains(&value) {
        return Err(TuneError::Config(format!(
            "{}.{} = {} is outside {}..={}",
            song,
            field,
            value,
            range.start(),
            range.end()
        )));
    }
    T::try_from(value)
        .map_err(|_| TuneError::Config(format!("{}.{} = {} does not fit", song, field, value)))
}

impl Config {
    /// Load and validate a configuration file.
    ///
    /// A relative `songs_dir` is taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self, TuneError> {
        let content = fs::read_to_string(path).map_err(|e| TuneError::io(path, e))?;
        let mut config = Self::from_str(&content)?;
        if config.songs_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.songs_dir = parent.join(&config.songs_dir);
            }
        }
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_str(content: &str) -> Result<Self, TuneError> {
        let raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str::<Option<RawConfig>>(content)
                .map_err(|e| TuneError::Config(e.to_string()))?
                .unwrap_or_default()
        };

        let tempo = match raw.tempo {
            None => DEFAULT_TEMPO,
            Some(t) if t > 0 => u32::try_from(t)
                .map_err(|_| TuneError::Config(format!("tempo {} is too large", t)))?,
            Some(t) => {
                return Err(TuneError::Config(format!(
                    "tempo must be greater than zero, got {}",
                    t
                )))
            }
        };

        let mut songs = Vec::with_capacity(raw.songs.len());
        let mut identifiers: HashMap<String, String> = HashMap::new();
        for (key, value) in raw.songs {
            let name = match key {
                serde_yaml::Value::String(s) => s,
                other => {
                    return Err(TuneError::Config(format!(
                        "song names must be strings, got {:?}",
                        other
                    )))
                }
            };
            if name.is_empty() {
                return Err(TuneError::Config("song name must not be empty".to_string()));
            }
            let song_raw: RawSongConfig = if value.is_null() {
                RawSongConfig::default()
            } else {
                serde_yaml::from_value(value)
                    .map_err(|e| TuneError::Config(format!("{}: {}", name, e)))?
            };
            for key in song_raw.other.keys() {
                log::warn!("Ignoring unknown option '{}' for song {}", key, name);
            }

            let song = SongConfig {
                playback: PlaybackConfig {
                    duty_cycle: ranged(&name, "duty_cycle", song_raw.duty_cycle, 10..=100, 75)?,
                    speed: ranged(&name, "speed", song_raw.speed, 25..=1000, 100)?,
                    transpose: ranged(&name, "transpose", song_raw.transpose, -12..=12, 0)?,
                },
                enabled: song_raw.enabled.unwrap_or(true),
                name,
            };

            let identifier = song.identifier();
            if let Some(previous) = identifiers.insert(identifier.clone(), song.name.clone()) {
                return Err(TuneError::Config(format!(
                    "songs '{}' and '{}' both map to identifier {}",
                    previous, song.name, identifier
                )));
            }
            songs.push(song);
        }

        Ok(Config {
            tempo,
            songs_dir: raw
                .songs_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SONGS_DIR)),
            songs,
        })
    }

    pub fn song(&self, name: &str) -> Option<&SongConfig> {
        self.songs.iter().find(|s| s.name == name)
    }

    /// Playback parameters for a song, falling back to the defaults.
    pub fn playback(&self, name: &str) -> PlaybackConfig {
        self.song(name).map(|s| s.playback).unwrap_or_default()
    }

    /// Whether a song takes part in the rotation. Unlisted songs do.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.song(name).map(|s| s.enabled).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_document() {
        let config = Config::from_str(
            r#"
tempo: 96
songs_dir: music
songs:
  silent_night:
    duty_cycle: 60
    speed: 90
  jingle-bells:
    transpose: -2
    enabled: false
  noel:
"#,
        )
        .unwrap();

        assert_eq!(config.tempo, 96);
        assert_eq!(config.songs_dir, PathBuf::from("music"));
        let names: Vec<&str> = config.songs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["silent_night", "jingle-bells", "noel"]);

        assert_eq!(config.songs[0].playback, PlaybackConfig::new(60, 90, 0));
        assert!(config.songs[0].enabled);
        assert_eq!(config.songs[1].playback, PlaybackConfig::new(75, 100, -2));
        assert!(!config.songs[1].enabled);
        assert_eq!(config.songs[1].identifier(), "JINGLE_BELLS");
        assert_eq!(config.songs[2], SongConfig::new("noel"));
    }

    #[test]
    fn test_load_resolves_songs_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "songs:\n  noel:\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.songs_dir, dir.path().join("songs"));
        assert_eq!(config.songs, vec![SongConfig::new("noel")]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/tunegen/config.yaml"));
        assert!(matches!(result, Err(TuneError::Io { .. })));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_str("songs:\n  a: {}\n").unwrap();
        assert_eq!(config.tempo, DEFAULT_TEMPO);
        assert_eq!(config.songs_dir, PathBuf::from("songs"));
        assert_eq!(config.playback("a"), PlaybackConfig::new(75, 100, 0));
        assert!(config.is_enabled("a"));
        assert_eq!(config.playback("missing"), PlaybackConfig::default());
        assert!(config.is_enabled("missing"));
    }

    #[test]
    fn test_empty_document() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_yaml() {
        let result = Config::from_str("songs: [unclosed");
        assert!(matches!(result, Err(TuneError::Config(_))));
    }

    #[test]
    fn test_out_of_range_values() {
        for doc in [
            "songs:\n  a:\n    duty_cycle: 5\n",
            "songs:\n  a:\n    speed: 2000\n",
            "songs:\n  a:\n    transpose: 13\n",
            "tempo: 0\n",
            "tempo: -10\n",
        ] {
            assert!(
                matches!(Config::from_str(doc), Err(TuneError::Config(_))),
                "expected rejection of {:?}",
                doc
            );
        }
    }

    #[test]
    fn test_unknown_song_fields_are_ignored() {
        let config = Config::from_str(
            "volume: 3\nsongs:\n  noel:\n    title: Noel\n    speed: 80\n  a:\n    volume: 3\n",
        )
        .unwrap();
        assert_eq!(config.playback("noel"), PlaybackConfig::new(75, 80, 0));
        assert_eq!(config.songs[1], SongConfig::new("a"));
    }

    #[test]
    fn test_known_song_field_with_wrong_type() {
        let result = Config::from_str("songs:\n  a:\n    enabled: sometimes\n");
        assert!(matches!(result, Err(TuneError::Config(msg)) if msg.starts_with("a:")));
    }

    #[test]
    fn test_identifier_collision() {
        let result = Config::from_str("songs:\n  my-song:\n  my song:\n");
        match result {
            Err(TuneError::Config(msg)) => assert!(msg.contains("MY_SONG"), "{}", msg),
            other => panic!("expected collision error, got {:?}", other),
        }
    }
}
