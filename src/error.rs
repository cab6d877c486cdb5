//! # Error Types
//!
//! Fatal errors for the song compiler. Problems inside a single note never show
//! up here: they degrade the output and are reported as [`Diagnostic`]s instead.
//!
//! ## Error Types
//! - `Io` - a file could not be read or written
//! - `Xml` - a score is not well-formed XML
//! - `Config` - the configuration document is malformed or out of range
//! - `NoScores` - not a single configured song had a readable score
//!
//! [`Diagnostic`]: crate::Diagnostic

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TuneError {
    /// A file could not be read or written.
    ///
    /// # Example
    /// ```
    /// # use tunegen::TuneError;
    /// let err = TuneError::Io {
    ///     path: "songs/noel.musicxml".into(),
    ///     source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
    /// };
    /// assert_eq!(err.to_string(), "I/O error on songs/noel.musicxml: not found");
    /// ```
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A score document is not well-formed XML.
    #[error("Invalid score '{song}': {message}")]
    Xml { song: String, message: String },

    /// The configuration document is malformed or holds out-of-range values.
    ///
    /// # Example
    /// ```
    /// # use tunegen::TuneError;
    /// let err = TuneError::Config("tempo must be greater than zero".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: tempo must be greater than zero");
    /// ```
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// None of the configured songs produced a score.
    #[error("No score documents found in {}", dir.display())]
    NoScores { dir: PathBuf },
}

impl TuneError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TuneError::Io {
            path: path.into(),
            source,
        }
    }
}
