pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod discover;
pub mod error;
pub mod musicxml;
pub mod pipeline;
pub mod pitch;

pub use codegen::{sanitize_identifier, Artifacts};
pub use config::{Config, PlaybackConfig, SongConfig};
pub use diagnostic::Diagnostic;
pub use error::*;
pub use musicxml::{NoteRecord, ParsedSong, ScoreParser};
pub use pipeline::{BatchReport, Pipeline};
pub use pitch::{
    resolve_duration, resolve_duration_value, resolve_frequency, DurationValue, ParseContext,
    PitchKey,
};

use std::path::Path;

/// Read one MusicXML file into a note table at the given tempo.
pub fn parse_score(path: &Path, tempo: u32) -> Result<ParsedSong, TuneError> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    ScoreParser::new(name).with_tempo(tempo).parse_file(path)
}

/// Compile every song named in a configuration file into `out_dir`.
///
/// `songs_dir` overrides the directory given in the configuration.
/// This is the main entry point for build scripts.
pub fn compile(
    config_path: &Path,
    songs_dir: Option<&Path>,
    out_dir: &Path,
) -> Result<BatchReport, TuneError> {
    let config = Config::load(config_path)?;
    let mut pipeline = Pipeline::new(config);
    if let Some(dir) = songs_dir {
        pipeline = pipeline.with_songs_dir(dir);
    }
    let (report, _) = pipeline.generate(out_dir)?;
    Ok(report)
}
