//! Non-fatal problems found while compiling songs.
//!
//! A diagnostic never stops the batch. The affected note or song is dropped and
//! the rest of the output is still generated.

use std::fmt;
use std::path::PathBuf;

/// Largest note duration the firmware can store (`uint16_t`).
pub const MAX_NOTE_DURATION_MS: u32 = u16::MAX as u32;
/// Largest note count the firmware can report (`uint8_t`).
pub const MAX_NOTES_PER_SONG: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A note's pitch has no entry in the frequency table. The note is dropped.
    UnknownPitch { song: String, pitch: String },
    /// A measure declared zero or non-numeric divisions. The previous value is kept.
    InvalidDivisions {
        song: String,
        measure: Option<String>,
        value: String,
    },
    /// A note's `<duration>` is not a non-negative number. The note is timed as
    /// a quarter note.
    InvalidDuration { song: String, value: String },
    /// A (possibly tie-merged) note is too long for the firmware's 16-bit duration.
    DurationOverflow {
        song: String,
        index: usize,
        duration_ms: u32,
    },
    /// More notes than the firmware's 8-bit note count can address.
    TooManyNotes { song: String, count: usize },
    /// A configured song has no score file. The song is skipped.
    MissingScore { song: String, path: PathBuf },
    /// A score file could not be read or parsed. The song is skipped.
    UnreadableScore { song: String, message: String },
    /// A score on disk that the configuration does not mention.
    UnconfiguredScore { song: String, path: PathBuf },
}

impl Diagnostic {
    pub fn song(&self) -> &str {
        match self {
            Diagnostic::UnknownPitch { song, .. }
            | Diagnostic::InvalidDivisions { song, .. }
            | Diagnostic::InvalidDuration { song, .. }
            | Diagnostic::DurationOverflow { song, .. }
            | Diagnostic::TooManyNotes { song, .. }
            | Diagnostic::MissingScore { song, .. }
            | Diagnostic::UnreadableScore { song, .. }
            | Diagnostic::UnconfiguredScore { song, .. } => song,
        }
    }

    /// Emit through the `log` facade at warning level.
    pub fn log(&self) {
        log::warn!("{}", self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownPitch { song, pitch } => {
                write!(f, "Unknown note {} in {}", pitch, song)
            }
            Diagnostic::InvalidDivisions {
                song,
                measure,
                value,
            } => match measure {
                Some(number) => write!(
                    f,
                    "Ignoring divisions '{}' in measure {} of {}",
                    value, number, song
                ),
                None => write!(f, "Ignoring divisions '{}' in {}", value, song),
            },
            Diagnostic::InvalidDuration { song, value } => write!(
                f,
                "Duration '{}' in {} is not a number, using a quarter note",
                value, song
            ),
            Diagnostic::DurationOverflow {
                song,
                index,
                duration_ms,
            } => write!(
                f,
                "Note {} of {} lasts {} ms, more than the {} ms the firmware can store",
                index, song, duration_ms, MAX_NOTE_DURATION_MS
            ),
            Diagnostic::TooManyNotes { song, count } => write!(
                f,
                "{} has {} notes, more than the {} the firmware can count",
                song, count, MAX_NOTES_PER_SONG
            ),
            Diagnostic::MissingScore { song, path } => {
                write!(f, "MusicXML file not found for {}: {}", song, path.display())
            }
            Diagnostic::UnreadableScore { song, message } => {
                write!(f, "Skipping {}: {}", song, message)
            }
            Diagnostic::UnconfiguredScore { song, path } => write!(
                f,
                "{} has no entry in the configuration: {}",
                song,
                path.display()
            ),
        }
    }
}
