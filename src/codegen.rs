//! # Firmware Source Generation
//!
//! Turns parsed songs and their configuration into the two files the firmware
//! build compiles:
//!
//! - `audio_songs_generated.h` - melody enum and accessor declarations
//! - `audio_songs_generated.cpp` - `PROGMEM` note tables, per-song configs,
//!   rotation list and accessors
//!
//! The layout of both files is a contract with `audio.h` / `audio.cpp` on the
//! firmware side (`audio_note_t`, `song_config_t`, `melody_id_t`).

use crate::config::{Config, PlaybackConfig, FALLBACK_PLAYBACK, TEST_TONE_PLAYBACK};
use crate::error::TuneError;
use crate::musicxml::{NoteRecord, ParsedSong};
use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER_FILE: &str = "audio_songs_generated.h";
pub const SOURCE_FILE: &str = "audio_songs_generated.cpp";

/// Built-in 5 second A4 used to check the buzzer.
pub const TEST_TONE: NoteRecord = NoteRecord {
    frequency_hz: 440,
    duration_ms: 5000,
};

const RULE: &str =
    "// ============================================================================";

const BANNER: &str = " * Generated by tunegen
 *
 * DO NOT EDIT THIS FILE MANUALLY!
 * Modify config.yaml and MusicXML files in songs/ folder instead.
 */";

/// Convert a song name to a C identifier.
///
/// ```
/// use tunegen::codegen::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("silent-night"), "SILENT_NIGHT");
/// assert_eq!(sanitize_identifier("99 luftballons.musicxml"), "SONG_99_LUFTBALLONS");
/// ```
pub fn sanitize_identifier(name: &str) -> String {
    let name = name.replace(".musicxml", "");
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert_str(0, "SONG_");
    }
    ident.to_ascii_uppercase()
}

/// One song as it will appear in the generated files
#[derive(Debug, Clone)]
struct SongEntry<'a> {
    name: &'a str,
    identifier: String,
    notes: &'a [NoteRecord],
    playback: PlaybackConfig,
    enabled: bool,
}

impl SongEntry<'_> {
    fn variable(&self) -> String {
        format!("melody_{}", self.identifier.to_ascii_lowercase())
    }
}

/// Generated header and implementation text
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub header: String,
    pub source: String,
}

impl Artifacts {
    /// Render both files. Songs keep the order given.
    pub fn generate(songs: &[ParsedSong], config: &Config) -> Self {
        let entries: Vec<SongEntry> = songs
            .iter()
            .map(|song| SongEntry {
                name: &song.name,
                identifier: sanitize_identifier(&song.name),
                notes: &song.notes,
                playback: config.playback(&song.name),
                enabled: config.is_enabled(&song.name),
            })
            .collect();

        Self {
            header: header(&entries),
            source: source(&entries),
        }
    }

    /// Write both files into `dir`, creating it if needed. Returns the paths written.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, TuneError> {
        fs::create_dir_all(dir).map_err(|e| TuneError::io(dir, e))?;
        let mut written = Vec::with_capacity(2);
        for (file, content) in [(HEADER_FILE, &self.header), (SOURCE_FILE, &self.source)] {
            let path = dir.join(file);
            fs::write(&path, content).map_err(|e| TuneError::io(&path, e))?;
            written.push(path);
        }
        Ok(written)
    }
}

fn section(title: &str) -> String {
    format!("{RULE}\n// {title}\n{RULE}\n")
}

fn melody_enum(entries: &[SongEntry]) -> String {
    let mut out = String::new();
    out.push_str("typedef enum\n{\n    MELODY_NONE = 0,\n");
    for entry in entries {
        out.push_str(&format!("    MELODY_{},\n", entry.identifier));
    }
    out.push_str("    MELODY_TEST_TONE,\n");
    out.push_str("    MELODY_COUNT\n");
    out.push_str("} melody_id_t;");
    out
}

fn header(entries: &[SongEntry]) -> String {
    let mut out = String::new();

    out.push_str("/*\n * audio_songs_generated.h - Auto-generated song definitions\n");
    out.push_str(BANNER);
    out.push_str("\n\n#ifndef AUDIO_SONGS_GENERATED_H_\n#define AUDIO_SONGS_GENERATED_H_\n\n");
    out.push_str("#include <stdint.h>\n\n");
    out.push_str("// Note: This file is included from audio.h AFTER audio_note_t and song_config_t are defined\n");
    out.push_str("// Do not include audio.h here to avoid circular dependency\n\n");

    out.push_str(&section("MELODY ENUMERATION"));
    out.push('\n');
    out.push_str(&melody_enum(entries));
    out.push_str("\n\n");

    out.push_str(&section("FUNCTION DECLARATIONS"));
    out.push('\n');
    out.push_str("const audio_note_t *get_melody_data(melody_id_t melody_id, uint8_t *note_count);\n");
    out.push_str("const song_config_t *get_song_config(melody_id_t melody_id);\n\n");

    out.push_str(&section("ENABLED SONGS DECLARATIONS"));
    out.push('\n');
    out.push_str("#if ENABLE_SONG_ROTATION\n");
    out.push_str("extern const melody_id_t enabled_songs[];\n");
    out.push_str("extern const uint8_t ENABLED_SONG_COUNT;\n");
    out.push_str("#endif\n\n");
    out.push_str("#endif // AUDIO_SONGS_GENERATED_H_\n");

    out
}

fn note_table(comment: &str, variable: &str, notes: &[NoteRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!("// {}\n", comment));
    out.push_str(&format!(
        "static const audio_note_t PROGMEM {}[] = {{\n",
        variable
    ));
    for note in notes {
        out.push_str(&format!(
            "    {{{}, {}}},\n",
            note.frequency_hz, note.duration_ms
        ));
    }
    out.push_str("};\n");
    out
}

fn config_row(label: &str, playback: PlaybackConfig, comment: &str) -> String {
    format!(
        "    [{}] = {{{}, {}, {}}},  // {}\n",
        label, playback.duty_cycle, playback.speed, playback.transpose, comment
    )
}

fn config_array(entries: &[SongEntry]) -> String {
    let mut out = String::new();
    out.push_str("static const song_config_t song_configs[] = {\n");
    out.push_str(&config_row("MELODY_NONE", FALLBACK_PLAYBACK, "Default fallback"));
    for entry in entries {
        out.push_str(&config_row(
            &format!("MELODY_{}", entry.identifier),
            entry.playback,
            entry.name,
        ));
    }
    out.push_str(&config_row("MELODY_TEST_TONE", TEST_TONE_PLAYBACK, "Test tone"));
    out.push_str("};");
    out
}

fn enabled_songs(entries: &[SongEntry]) -> String {
    let enabled: Vec<&SongEntry> = entries.iter().filter(|e| e.enabled).collect();

    let mut out = String::new();
    out.push_str("#if ENABLE_SONG_ROTATION\n");
    out.push_str("const melody_id_t enabled_songs[] = {\n");
    for entry in &enabled {
        out.push_str(&format!("    MELODY_{},\n", entry.identifier));
    }
    out.push_str("};\n");
    out.push_str(&format!(
        "const uint8_t ENABLED_SONG_COUNT = {};\n",
        enabled.len()
    ));
    out.push_str("#endif");
    out
}

fn melody_case(out: &mut String, label: &str, variable: &str) {
    out.push_str(&format!("    case {}:\n", label));
    out.push_str(&format!(
        "        *note_count = sizeof({}) / sizeof(audio_note_t);\n",
        variable
    ));
    out.push_str(&format!("        return {};\n\n", variable));
}

fn melody_accessor(entries: &[SongEntry]) -> String {
    let mut out = String::new();
    out.push_str("const audio_note_t *get_melody_data(melody_id_t melody_id, uint8_t *note_count)\n");
    out.push_str("{\n    switch (melody_id) {\n");
    for entry in entries {
        melody_case(
            &mut out,
            &format!("MELODY_{}", entry.identifier),
            &entry.variable(),
        );
    }
    melody_case(&mut out, "MELODY_TEST_TONE", "melody_test_tone");
    out.push_str("    case MELODY_NONE:\n");
    out.push_str("    default:\n");
    out.push_str("        *note_count = 0;\n");
    out.push_str("        return NULL;\n");
    out.push_str("    }\n}");
    out
}

fn source(entries: &[SongEntry]) -> String {
    let mut out = String::new();

    out.push_str("/*\n * audio_songs_generated.cpp - Auto-generated song data\n");
    out.push_str(BANNER);
    out.push_str("\n\n");
    out.push_str("#include \"audio.h\"\n");
    out.push_str("#include \"audio_songs_generated.h\"\n");
    out.push_str("#include \"../../config/config.h\"\n");
    out.push_str("#include <avr/pgmspace.h>\n\n");

    out.push_str(&section("MELODY DATA - Generated from MusicXML files"));
    out.push_str("// All melody data stored in PROGMEM to save RAM\n");
    out.push_str(RULE);
    out.push_str("\n\n");

    let mut tables: Vec<String> = entries
        .iter()
        .map(|entry| {
            note_table(
                &format!("Song: {} ({} notes)", entry.name, entry.notes.len()),
                &entry.variable(),
                entry.notes,
            )
        })
        .collect();
    tables.push(note_table(
        "Test tone: 5-second A4 note",
        "melody_test_tone",
        &[TEST_TONE],
    ));
    out.push_str(&tables.join("\n"));
    out.push_str("\n\n");

    out.push_str(&section("SONG CONFIGURATIONS - From config.yaml"));
    out.push('\n');
    out.push_str(&config_array(entries));
    out.push_str("\n\n");

    out.push_str(&section("ENABLED SONGS LIST - From config.yaml"));
    out.push('\n');
    out.push_str(&enabled_songs(entries));
    out.push_str("\n\n");

    out.push_str(&section("ACCESSOR FUNCTIONS"));
    out.push('\n');
    out.push_str(&melody_accessor(entries));
    out.push_str("\n\n");
    out.push_str("const song_config_t *get_song_config(melody_id_t melody_id)\n");
    out.push_str("{\n");
    out.push_str("    if (melody_id < MELODY_COUNT) {\n");
    out.push_str("        return &song_configs[melody_id];\n");
    out.push_str("    }\n");
    out.push_str("    return &song_configs[MELODY_NONE];\n");
    out.push_str("}\n");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SongConfig;
    use pretty_assertions::assert_eq;

    fn song(name: &str, notes: Vec<NoteRecord>) -> ParsedSong {
        ParsedSong {
            name: name.to_string(),
            notes,
            diagnostics: Vec::new(),
        }
    }

    fn config() -> Config {
        let mut quiet = SongConfig::new("silent-night");
        quiet.playback = PlaybackConfig::new(60, 90, -1);
        let mut off = SongConfig::new("noel");
        off.enabled = false;
        Config {
            songs: vec![quiet, off],
            ..Config::default()
        }
    }

    fn artifacts() -> Artifacts {
        let songs = vec![
            song(
                "silent-night",
                vec![NoteRecord::new(172, 500), NoteRecord::rest(250)],
            ),
            song("noel", vec![NoteRecord::new(290, 1000)]),
        ];
        Artifacts::generate(&songs, &config())
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("oh_christmas_tree"), "OH_CHRISTMAS_TREE");
        assert_eq!(sanitize_identifier("Kling Glöckchen"), "KLING_GL_CKCHEN");
        assert_eq!(sanitize_identifier("a.b-c d"), "A_B_C_D");
        assert_eq!(sanitize_identifier("1up"), "SONG_1UP");
    }

    #[test]
    fn test_header_enum() {
        let header = artifacts().header;
        let expected = "typedef enum
{
    MELODY_NONE = 0,
    MELODY_SILENT_NIGHT,
    MELODY_NOEL,
    MELODY_TEST_TONE,
    MELODY_COUNT
} melody_id_t;";
        assert!(header.contains(expected), "{}", header);
        assert!(header.starts_with("/*\n * audio_songs_generated.h"));
        assert!(header.ends_with("#endif // AUDIO_SONGS_GENERATED_H_\n"));
    }

    #[test]
    fn test_note_tables() {
        let source = artifacts().source;
        let expected = "// Song: silent-night (2 notes)
static const audio_note_t PROGMEM melody_silent_night[] = {
    {172, 500},
    {0, 250},
};
";
        assert!(source.contains(expected), "{}", source);
        assert!(source.contains(
            "// Test tone: 5-second A4 note
static const audio_note_t PROGMEM melody_test_tone[] = {
    {440, 5000},
};"
        ));
    }

    #[test]
    fn test_config_array() {
        let source = artifacts().source;
        let expected = "static const song_config_t song_configs[] = {
    [MELODY_NONE] = {50, 100, 0},  // Default fallback
    [MELODY_SILENT_NIGHT] = {60, 90, -1},  // silent-night
    [MELODY_NOEL] = {75, 100, 0},  // noel
    [MELODY_TEST_TONE] = {80, 100, 0},  // Test tone
};";
        assert!(source.contains(expected), "{}", source);
    }

    #[test]
    fn test_enabled_songs() {
        let source = artifacts().source;
        let expected = "#if ENABLE_SONG_ROTATION
const melody_id_t enabled_songs[] = {
    MELODY_SILENT_NIGHT,
};
const uint8_t ENABLED_SONG_COUNT = 1;
#endif";
        assert!(source.contains(expected), "{}", source);
    }

    #[test]
    fn test_melody_accessor() {
        let source = artifacts().source;
        assert!(source.contains(
            "    case MELODY_NOEL:
        *note_count = sizeof(melody_noel) / sizeof(audio_note_t);
        return melody_noel;
"
        ));
        assert!(source.contains(
            "    case MELODY_NONE:
    default:
        *note_count = 0;
        return NULL;
    }
}"
        ));
        assert!(source.ends_with("    return &song_configs[MELODY_NONE];\n}\n"));
    }

    #[test]
    fn test_unconfigured_song_uses_defaults() {
        let songs = vec![song("extra", vec![NoteRecord::new(172, 500)])];
        let source = Artifacts::generate(&songs, &Config::default()).source;
        assert!(source.contains("    [MELODY_EXTRA] = {75, 100, 0},  // extra\n"));
        assert!(source.contains("const uint8_t ENABLED_SONG_COUNT = 1;"));
    }

    #[test]
    fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("lib").join("Audio");
        let generated = artifacts();
        let written = generated.write_to(&out).unwrap();

        assert_eq!(written, vec![out.join(HEADER_FILE), out.join(SOURCE_FILE)]);
        assert_eq!(fs::read_to_string(out.join(HEADER_FILE)).unwrap(), generated.header);
        assert_eq!(fs::read_to_string(out.join(SOURCE_FILE)).unwrap(), generated.source);
    }
}
