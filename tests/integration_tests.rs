//! Integration tests for the song compiler
//!
//! Runs the full pipeline from configuration and MusicXML files to the
//! generated firmware sources.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tunegen::{compile, parse_score, Diagnostic, NoteRecord, ScoreParser, TuneError};

/// Two staves, four measures, the kind of file MuseScore exports for a carol.
const CAROL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="4.0">
  <work><work-title>Carol</work-title></work>
  <part-list>
    <score-part id="P1"><part-name>Piano</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>2</divisions>
        <key><fifths>-1</fifths></key>
        <time><beats>3</beats><beat-type>4</beat-type></time>
        <staves>2</staves>
        <clef number="1"><sign>G</sign><line>2</line></clef>
        <clef number="2"><sign>F</sign><line>4</line></clef>
      </attributes>
      <direction placement="above">
        <direction-type><metronome><beat-unit>quarter</beat-unit><per-minute>90</per-minute></metronome></direction-type>
        <sound tempo="90"/>
      </direction>
      <note>
        <pitch><step>F</step><octave>4</octave></pitch>
        <duration>2</duration><voice>1</voice><type>quarter</type><staff>1</staff>
      </note>
      <note>
        <pitch><step>B</step><alter>-1</alter><octave>4</octave></pitch>
        <duration>2</duration><tie type="start"/><voice>1</voice><type>quarter</type><staff>1</staff>
        <notations><tied type="start"/></notations>
      </note>
      <note>
        <pitch><step>A</step><alter>1</alter><octave>4</octave></pitch>
        <duration>2</duration><tie type="stop"/><voice>1</voice><type>quarter</type><staff>1</staff>
        <notations><tied type="stop"/></notations>
      </note>
      <backup><duration>6</duration></backup>
      <note>
        <pitch><step>F</step><octave>3</octave></pitch>
        <duration>6</duration><voice>5</voice><type>half</type><dot/><staff>2</staff>
      </note>
    </measure>
    <measure number="2">
      <note>
        <pitch><step>C</step><octave>5</octave></pitch>
        <duration>3</duration><voice>1</voice><type>quarter</type><dot/><staff>1</staff>
      </note>
      <note>
        <pitch><step>B</step><octave>6</octave></pitch>
        <duration>1</duration><voice>1</voice><type>eighth</type><staff>1</staff>
      </note>
      <note>
        <rest/><duration>2</duration><voice>1</voice><type>quarter</type><staff>1</staff>
      </note>
    </measure>
    <measure number="3">
      <attributes><divisions>4</divisions></attributes>
      <note>
        <pitch><step>G</step><octave>4</octave></pitch>
        <duration>4</duration><tie type="start"/><voice>1</voice><staff>1</staff>
      </note>
      <note>
        <pitch><step>G</step><octave>4</octave></pitch>
        <duration>4</duration><tie type="stop"/><tie type="start"/><voice>1</voice><staff>1</staff>
      </note>
    </measure>
    <measure number="4">
      <note>
        <pitch><step>G</step><octave>4</octave></pitch>
        <duration>4</duration><tie type="stop"/><voice>1</voice><staff>1</staff>
      </note>
      <note>
        <rest measure="yes"/><duration>8</duration><voice>1</voice><staff>1</staff>
      </note>
    </measure>
  </part>
</score-partwise>
"#;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_parse_carol() {
    let song = ScoreParser::new("carol").parse_str(CAROL).unwrap();

    assert_eq!(
        song.notes,
        vec![
            NoteRecord::new(229, 500),
            // Bb4 tied to A#4
            NoteRecord::new(307, 1000),
            NoteRecord::new(344, 750),
            NoteRecord::rest(500),
            // three tied quarters
            NoteRecord::new(257, 1500),
            NoteRecord::rest(1000),
        ]
    );
    assert_eq!(
        song.diagnostics,
        vec![Diagnostic::UnknownPitch {
            song: "carol".to_string(),
            pitch: "B6".to_string(),
        }]
    );
}

#[test]
fn test_score_tempo_marking_is_not_read() {
    let song = ScoreParser::new("carol").parse_str(CAROL).unwrap();
    // 90 BPM in the score would make the first quarter 667 ms
    assert_eq!(song.notes[0].duration_ms, 500);
}

#[test]
fn test_parse_score_names_song_after_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "carol.musicxml", CAROL);

    let song = parse_score(&dir.path().join("carol.musicxml"), 60).unwrap();
    assert_eq!(song.name, "carol");
    assert_eq!(song.notes[0], NoteRecord::new(229, 1000));
}

#[test]
fn test_compile_project() {
    let project = tempfile::tempdir().unwrap();
    let songs = project.path().join("songs");
    fs::create_dir(&songs).unwrap();
    write(&songs, "carol.musicxml", CAROL);
    write(
        project.path(),
        "config.yaml",
        r#"
songs:
  carol:
    duty_cycle: 60
    speed: 120
    transpose: -3
  lost-song:
    enabled: true
"#,
    );
    let out = project.path().join("lib").join("Audio");

    let report = compile(&project.path().join("config.yaml"), None, &out).unwrap();

    assert_eq!(report.songs.len(), 1);
    assert_eq!(report.note_count(), 6);
    let messages: Vec<String> = report.all_diagnostics().map(|d| d.to_string()).collect();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with("MusicXML file not found for lost-song"));
    assert_eq!(messages[1], "Unknown note B6 in carol");

    let header = fs::read_to_string(out.join("audio_songs_generated.h")).unwrap();
    assert!(header.contains("    MELODY_CAROL,\n    MELODY_TEST_TONE,"));
    assert!(!header.contains("LOST_SONG"));

    let source = fs::read_to_string(out.join("audio_songs_generated.cpp")).unwrap();
    assert!(source.contains(
        "// Song: carol (6 notes)
static const audio_note_t PROGMEM melody_carol[] = {
    {229, 500},
    {307, 1000},
    {344, 750},
    {0, 500},
    {257, 1500},
    {0, 1000},
};"
    ));
    assert!(source.contains("    [MELODY_CAROL] = {60, 120, -3},  // carol\n"));
    assert!(source.contains("const uint8_t ENABLED_SONG_COUNT = 1;"));
}

#[test]
fn test_compile_with_songs_dir_override() {
    let project = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    write(elsewhere.path(), "carol.musicxml", CAROL);
    write(project.path(), "config.yaml", "songs:\n  carol:\n");
    let out = project.path().join("out");

    let report = compile(
        &project.path().join("config.yaml"),
        Some(elsewhere.path()),
        &out,
    )
    .unwrap();
    assert_eq!(report.songs[0].name, "carol");
    assert!(out.join("audio_songs_generated.cpp").is_file());
}

#[test]
fn test_compile_without_scores_writes_nothing() {
    let project = tempfile::tempdir().unwrap();
    write(project.path(), "config.yaml", "songs:\n  carol:\n");
    let out = project.path().join("out");

    let result = compile(&project.path().join("config.yaml"), None, &out);
    assert!(matches!(result, Err(TuneError::NoScores { .. })));
    assert!(!out.exists());
}

#[test]
fn test_compile_with_bad_config_writes_nothing() {
    let project = tempfile::tempdir().unwrap();
    let songs = project.path().join("songs");
    fs::create_dir(&songs).unwrap();
    write(&songs, "carol.musicxml", CAROL);
    write(project.path(), "config.yaml", "songs:\n  carol:\n    speed: 5\n");
    let out = project.path().join("out");

    let result = compile(&project.path().join("config.yaml"), None, &out);
    assert!(matches!(result, Err(TuneError::Config(_))));
    assert!(!out.exists());
}
