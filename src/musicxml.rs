//! # MusicXML Score Reader
//!
//! Reduces a MusicXML score to the flat `(frequency, duration)` table the
//! buzzer firmware plays.
//!
//! ## Traversal
//! Every `<measure>` is visited in document order, then every `<note>` inside
//! it. A measure may carry `<divisions>` (inside `<attributes>`), which applies
//! to that measure and all later ones.
//!
//! ## Per Note
//! 1. `<staff>` other than `1` → skipped (bass clef of a piano arrangement)
//! 2. `<rest>` → silent record (`frequency_hz == 0`)
//! 3. no `<pitch>` → skipped
//! 4. pitch not in the frequency table → dropped with [`Diagnostic::UnknownPitch`]
//! 5. `<tie type="stop">` merges into the previous record when the frequencies
//!    match, otherwise the note is appended on its own
//!
//! Nothing about a single note can fail the whole score. Only XML that is not
//! well formed is an error.
//!
//! ## Example
//! ```rust
//! use tunegen::{NoteRecord, ScoreParser};
//!
//! let xml = r#"<score-partwise><part id="P1"><measure number="1">
//!   <attributes><divisions>1</divisions></attributes>
//!   <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration>
//!     <tie type="start"/></note>
//!   <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration>
//!     <tie type="stop"/></note>
//! </measure></part></score-partwise>"#;
//!
//! let song = ScoreParser::new("demo").parse_str(xml)?;
//! assert_eq!(song.notes, vec![NoteRecord::new(172, 1000)]);
//! # Ok::<(), tunegen::TuneError>(())
//! ```

use crate::diagnostic::{Diagnostic, MAX_NOTES_PER_SONG, MAX_NOTE_DURATION_MS};
use crate::error::TuneError;
use crate::pitch::{
    frequency_for, resolve_duration_value, resolve_frequency, Alteration, DurationValue,
    ParseContext, PitchKey, Step, DEFAULT_TEMPO,
};
use roxmltree::{Document, Node, ParsingOptions};
use std::fs;
use std::path::Path;

/// Staff whose notes are kept.
pub const PRIMARY_STAFF: u32 = 1;

/// One entry of a song table. `frequency_hz == 0` is a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteRecord {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl NoteRecord {
    pub fn new(frequency_hz: u32, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }

    pub fn rest(duration_ms: u32) -> Self {
        Self::new(0, duration_ms)
    }

    pub fn is_rest(&self) -> bool {
        self.frequency_hz == 0
    }
}

/// A parsed song and everything worth reporting about it
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSong {
    pub name: String,
    pub notes: Vec<NoteRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedSong {
    /// Total playing time in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.notes.iter().map(|n| u64::from(n.duration_ms)).sum()
    }
}

/// Which end of a tie a note sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieKind {
    Start,
    Stop,
}

/// Written pitch as found in `<pitch>`
#[derive(Debug, Clone, PartialEq)]
struct WrittenPitch<'a> {
    step: &'a str,
    octave: i32,
    alteration: Alteration,
}

/// The fields of a `<note>` the reader cares about
#[derive(Debug, Clone, PartialEq)]
struct NoteElement<'a> {
    staff: Option<&'a str>,
    rest: bool,
    pitch: Option<WrittenPitch<'a>>,
    duration: Option<&'a str>,
    tie: Option<TieKind>,
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text()).map(str::trim)
}

impl<'a> NoteElement<'a> {
    fn read(note: Node<'a, '_>) -> Self {
        Self {
            staff: child_text(note, "staff"),
            rest: child(note, "rest").is_some(),
            pitch: child(note, "pitch").and_then(read_pitch),
            duration: child_text(note, "duration"),
            tie: read_tie(note),
        }
    }

    fn on_primary_staff(&self) -> bool {
        match self.staff {
            None => true,
            Some(staff) => staff.parse::<u32>().ok() == Some(PRIMARY_STAFF),
        }
    }
}

fn read_pitch<'a>(pitch: Node<'a, '_>) -> Option<WrittenPitch<'a>> {
    let step = child_text(pitch, "step")?;
    let octave = child_text(pitch, "octave")?.parse().ok()?;
    let alteration = child_text(pitch, "alter")
        .and_then(|t| t.parse::<f64>().ok())
        .map(Alteration::from_semitones)
        .unwrap_or_default();
    Some(WrittenPitch {
        step,
        octave,
        alteration,
    })
}

/// A note in the middle of a chain carries both ends; `stop` wins so the
/// chain keeps collapsing into one record.
fn read_tie(note: Node) -> Option<TieKind> {
    let mut kind = None;
    for tie in note.children().filter(|n| n.has_tag_name("tie")) {
        match tie.attribute("type") {
            Some("stop") => return Some(TieKind::Stop),
            Some("start") => kind = Some(TieKind::Start),
            _ => {}
        }
    }
    kind
}

/// Song table under construction
#[derive(Debug, Default)]
struct SongBuilder {
    notes: Vec<NoteRecord>,
}

impl SongBuilder {
    fn push(&mut self, record: NoteRecord, tie: Option<TieKind>) {
        if tie == Some(TieKind::Stop) {
            if let Some(last) = self.notes.last_mut() {
                if last.frequency_hz == record.frequency_hz {
                    last.duration_ms = last.duration_ms.saturating_add(record.duration_ms);
                    return;
                }
            }
        }
        self.notes.push(record);
    }
}

/// Reads one score into one song table.
#[derive(Debug, Clone)]
pub struct ScoreParser {
    song: String,
    tempo: u32,
}

impl ScoreParser {
    pub fn new(song: impl Into<String>) -> Self {
        Self {
            song: song.into(),
            tempo: DEFAULT_TEMPO,
        }
    }

    /// Tempo in quarter notes per minute. Tempo markings in the score are not read.
    pub fn with_tempo(mut self, tempo: u32) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn parse_file(&self, path: &Path) -> Result<ParsedSong, TuneError> {
        let xml = fs::read_to_string(path).map_err(|e| TuneError::io(path, e))?;
        self.parse_str(&xml)
    }

    pub fn parse_str(&self, xml: &str) -> Result<ParsedSong, TuneError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(xml, options).map_err(|e| TuneError::Xml {
            song: self.song.clone(),
            message: e.to_string(),
        })?;
        Ok(self.parse_document(&doc))
    }

    pub fn parse_document(&self, doc: &Document) -> ParsedSong {
        let mut ctx = ParseContext::with_tempo(self.tempo);
        let mut builder = SongBuilder::default();
        let mut diagnostics = Vec::new();

        for measure in doc.descendants().filter(|n| n.has_tag_name("measure")) {
            if let Some(node) = measure.descendants().find(|n| n.has_tag_name("divisions")) {
                let value = node.text().map(str::trim).unwrap_or_default();
                let accepted = value
                    .parse::<u32>()
                    .map(|d| ctx.set_divisions(d))
                    .unwrap_or(false);
                if !accepted {
                    diagnostics.push(Diagnostic::InvalidDivisions {
                        song: self.song.clone(),
                        measure: measure.attribute("number").map(str::to_string),
                        value: value.to_string(),
                    });
                }
            }

            for note in measure.descendants().filter(|n| n.has_tag_name("note")) {
                let element = NoteElement::read(note);
                if let Some(record) = self.resolve(&element, &ctx, &mut diagnostics) {
                    builder.push(record, element.tie);
                }
            }
        }

        let notes = builder.notes;
        for (index, note) in notes.iter().enumerate() {
            if note.duration_ms > MAX_NOTE_DURATION_MS {
                diagnostics.push(Diagnostic::DurationOverflow {
                    song: self.song.clone(),
                    index,
                    duration_ms: note.duration_ms,
                });
            }
        }
        if notes.len() > MAX_NOTES_PER_SONG {
            diagnostics.push(Diagnostic::TooManyNotes {
                song: self.song.clone(),
                count: notes.len(),
            });
        }

        for diagnostic in &diagnostics {
            diagnostic.log();
        }
        log::debug!("{}: {} notes extracted", self.song, notes.len());

        ParsedSong {
            name: self.song.clone(),
            notes,
            diagnostics,
        }
    }

    fn resolve(
        &self,
        element: &NoteElement,
        ctx: &ParseContext,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<NoteRecord> {
        if !element.on_primary_staff() {
            return None;
        }
        if element.rest {
            let duration_ms = self.duration_ms(element, ctx, diagnostics);
            return Some(NoteRecord::rest(duration_ms));
        }

        let pitch = element.pitch.as_ref()?;
        let (label, frequency) = match Step::from_str(pitch.step) {
            Some(step) => {
                let key = PitchKey::canonical(step, pitch.alteration, pitch.octave);
                (key.to_string(), resolve_frequency(&key))
            }
            None => {
                let name = format!("{}{}", pitch.step, pitch.alteration.suffix());
                let frequency = frequency_for(&name, pitch.octave);
                (format!("{}{}", name, pitch.octave), frequency)
            }
        };
        if frequency == 0 {
            diagnostics.push(Diagnostic::UnknownPitch {
                song: self.song.clone(),
                pitch: label,
            });
            return None;
        }

        let duration_ms = self.duration_ms(element, ctx, diagnostics);
        Some(NoteRecord::new(frequency, duration_ms))
    }

    /// A `<duration>` that is present but not a non-negative decimal is
    /// reported and timed like a missing one.
    fn duration_ms(
        &self,
        element: &NoteElement,
        ctx: &ParseContext,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> u32 {
        let value = element.duration.and_then(|text| {
            let value = DurationValue::parse(text);
            if value.is_none() {
                diagnostics.push(Diagnostic::InvalidDuration {
                    song: self.song.clone(),
                    value: text.to_string(),
                });
            }
            value
        });
        resolve_duration_value(value, ctx)
    }
}
