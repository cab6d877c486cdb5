//! Locating score files on disk.

use crate::config::Config;
use crate::diagnostic::Diagnostic;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SCORE_EXTENSION: &str = "musicxml";

/// Where the score for `song` is expected.
pub fn score_path(songs_dir: &Path, song: &str) -> PathBuf {
    songs_dir.join(format!("{}.{}", song, SCORE_EXTENSION))
}

/// A score file found while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundScore {
    pub name: String,
    pub path: PathBuf,
}

/// All `.musicxml` files under `dir`, sorted by song name.
///
/// Songs are addressed by file stem, so files in subdirectories are listed
/// but can only be matched by a configuration entry of the same stem.
pub fn find_scores(dir: &Path) -> Vec<FoundScore> {
    let mut found: Vec<FoundScore> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map_or(false, |ext| ext == SCORE_EXTENSION)
        })
        .filter_map(|e| {
            let name = e.path().file_stem()?.to_string_lossy().into_owned();
            Some(FoundScore {
                name,
                path: e.path().to_path_buf(),
            })
        })
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
    found
}

/// Compare the configuration with what is on disk.
///
/// Reports configured songs with no score and scores nobody configured.
pub fn audit(config: &Config, songs_dir: &Path) -> Vec<Diagnostic> {
    let found = find_scores(songs_dir);
    let mut diagnostics = Vec::new();

    for song in &config.songs {
        let path = score_path(songs_dir, &song.name);
        if !path.is_file() {
            diagnostics.push(Diagnostic::MissingScore {
                song: song.name.clone(),
                path,
            });
        }
    }
    for score in found {
        if config.song(&score.name).is_none() {
            diagnostics.push(Diagnostic::UnconfiguredScore {
                song: score.name,
                path: score.path,
            });
        }
    }

    diagnostics
}
