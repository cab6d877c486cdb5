//! Batch driver: configuration in, firmware sources out.

use crate::codegen::Artifacts;
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::discover::score_path;
use crate::error::TuneError;
use crate::musicxml::{ParsedSong, ScoreParser};
use std::path::{Path, PathBuf};

/// Result of a successful batch
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Songs that were parsed, in configuration order.
    pub songs: Vec<ParsedSong>,
    /// Song-level problems (missing or unreadable scores).
    pub diagnostics: Vec<Diagnostic>,
    pub artifacts: Artifacts,
}

impl BatchReport {
    /// Every diagnostic of the batch, song-level first, then per note.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .chain(self.songs.iter().flat_map(|s| s.diagnostics.iter()))
    }

    pub fn note_count(&self) -> usize {
        self.songs.iter().map(|s| s.notes.len()).sum()
    }
}

/// Compiles every configured song.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    songs_dir: PathBuf,
}

impl Pipeline {
    /// Uses the songs directory named by the configuration.
    pub fn new(config: Config) -> Self {
        let songs_dir = config.songs_dir.clone();
        Self { config, songs_dir }
    }

    pub fn with_songs_dir(mut self, songs_dir: impl Into<PathBuf>) -> Self {
        self.songs_dir = songs_dir.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn songs_dir(&self) -> &Path {
        &self.songs_dir
    }

    /// Parse every configured song and render the firmware sources.
    ///
    /// Songs without a readable score are skipped. Fails only when no song at
    /// all could be parsed.
    pub fn run(&self) -> Result<BatchReport, TuneError> {
        let mut songs = Vec::new();
        let mut diagnostics = Vec::new();

        for song in &self.config.songs {
            let path = score_path(&self.songs_dir, &song.name);
            if !path.is_file() {
                let diagnostic = Diagnostic::MissingScore {
                    song: song.name.clone(),
                    path,
                };
                diagnostic.log();
                diagnostics.push(diagnostic);
                continue;
            }

            log::info!("Parsing {}...", song.name);
            let parser = ScoreParser::new(song.name.as_str()).with_tempo(self.config.tempo);
            match parser.parse_file(&path) {
                Ok(parsed) => {
                    log::info!("  -> {} notes extracted", parsed.notes.len());
                    songs.push(parsed);
                }
                Err(e) => {
                    let diagnostic = Diagnostic::UnreadableScore {
                        song: song.name.clone(),
                        message: e.to_string(),
                    };
                    diagnostic.log();
                    diagnostics.push(diagnostic);
                }
            }
        }

        if songs.is_empty() {
            return Err(TuneError::NoScores {
                dir: self.songs_dir.clone(),
            });
        }

        let artifacts = Artifacts::generate(&songs, &self.config);
        Ok(BatchReport {
            songs,
            diagnostics,
            artifacts,
        })
    }

    /// [`run`](Self::run) and write the sources into `out_dir`.
    ///
    /// Nothing is written when the batch fails.
    pub fn generate(&self, out_dir: &Path) -> Result<(BatchReport, Vec<PathBuf>), TuneError> {
        let report = self.run()?;
        let written = report.artifacts.write_to(out_dir)?;
        Ok((report, written))
    }
}
