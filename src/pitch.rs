//! # Pitch and Duration Resolution
//!
//! Pure lookup and arithmetic used by the score parser.
//!
//! ## Frequency Table
//! Values are tuned against the buzzer on the target board and do not follow
//! equal temperament. The table covers octaves 3 through 6 and is indexed
//! only by sharp spellings (`C`, `CS`, `D`, ... `B`). Flats are rewritten to their
//! enharmonic sharp before lookup. A pitch outside the table, or mapped to `0`,
//! is unknown.
//!
//! ## Duration
//! `ms = round(value / divisions * 60000 / tempo)`, evaluated with exact integer
//! arithmetic and rounded half to even.

use std::fmt;

/// Quarter notes per minute used when nothing else is configured.
pub const DEFAULT_TEMPO: u32 = 120;

/// Sixteenth note at [`DEFAULT_TEMPO`], in ms.
pub const SIXTEENTH_NOTE: u32 = 125;
/// Eighth note at [`DEFAULT_TEMPO`], in ms.
pub const EIGHTH_NOTE: u32 = 250;
/// Quarter note at [`DEFAULT_TEMPO`], in ms.
pub const QUARTER_NOTE: u32 = 500;
/// Half note at [`DEFAULT_TEMPO`], in ms.
pub const HALF_NOTE: u32 = 1000;
/// Whole note at [`DEFAULT_TEMPO`], in ms.
pub const WHOLE_NOTE: u32 = 2000;

/// Lowest octave present in [`FREQUENCY_TABLE`].
pub const MIN_OCTAVE: i32 = 3;
/// Highest octave present in [`FREQUENCY_TABLE`].
pub const MAX_OCTAVE: i32 = 6;

/// Hardware-calibrated frequencies in Hz, octaves 3..=6 per row.
pub static FREQUENCY_TABLE: [(&str, [u32; 4]); 12] = [
    ("C", [131, 172, 344, 690]),
    ("CS", [139, 182, 365, 730]),
    ("D", [147, 192, 386, 773]),
    ("DS", [156, 204, 408, 818]),
    ("E", [165, 216, 433, 866]),
    ("F", [175, 229, 459, 918]),
    ("FS", [185, 243, 486, 972]),
    ("G", [128, 257, 515, 1030]),
    ("GS", [136, 273, 546, 1092]),
    ("A", [144, 290, 580, 1160]),
    ("AS", [153, 307, 614, 1228]),
    ("B", [162, 326, 652, 0]),
];

/// Letter name of a pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Parse a MusicXML `<step>` value. Only the uppercase letters A-G are valid.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "C" => Some(Step::C),
            "D" => Some(Step::D),
            "E" => Some(Step::E),
            "F" => Some(Step::F),
            "G" => Some(Step::G),
            "A" => Some(Step::A),
            "B" => Some(Step::B),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }

    /// Enharmonic sharp spelling of this step lowered by a semitone.
    ///
    /// C and F have none (their flats land on B and E, a different letter) and
    /// keep their natural spelling.
    fn flat_as_sharp(self) -> (Step, Accidental) {
        match self {
            Step::B => (Step::A, Accidental::Sharp),
            Step::E => (Step::D, Accidental::Sharp),
            Step::A => (Step::G, Accidental::Sharp),
            Step::D => (Step::C, Accidental::Sharp),
            Step::G => (Step::F, Accidental::Sharp),
            Step::C | Step::F => (self, Accidental::Natural),
        }
    }
}

/// Accidental as stored in the frequency table. There are no flats here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
}

/// Chromatic alteration read from a score (`<alter>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alteration {
    #[default]
    None,
    Sharp,
    Flat,
}

impl Alteration {
    /// Map a semitone offset to an alteration. Anything other than +1/-1
    /// (double sharps, quarter tones) is ignored.
    pub fn from_semitones(semitones: f64) -> Self {
        if semitones == 1.0 {
            Alteration::Sharp
        } else if semitones == -1.0 {
            Alteration::Flat
        } else {
            Alteration::None
        }
    }

    /// Suffix appended to a raw step when building a table key.
    pub fn suffix(self) -> &'static str {
        match self {
            Alteration::Sharp => "S",
            Alteration::None | Alteration::Flat => "",
        }
    }
}

/// Canonical key into [`FREQUENCY_TABLE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PitchKey {
    pub step: Step,
    pub accidental: Accidental,
    pub octave: i32,
}

impl PitchKey {
    pub fn new(step: Step, accidental: Accidental, octave: i32) -> Self {
        Self {
            step,
            accidental,
            octave,
        }
    }

    /// Build the table key for a written pitch, rewriting flats to sharps.
    ///
    /// ```
    /// use tunegen::pitch::{Alteration, PitchKey, Step};
    ///
    /// let eb = PitchKey::canonical(Step::E, Alteration::Flat, 4);
    /// let ds = PitchKey::canonical(Step::D, Alteration::Sharp, 4);
    /// assert_eq!(eb, ds);
    /// assert_eq!(eb.to_string(), "DS4");
    /// ```
    pub fn canonical(step: Step, alteration: Alteration, octave: i32) -> Self {
        let (step, accidental) = match alteration {
            Alteration::None => (step, Accidental::Natural),
            Alteration::Sharp => (step, Accidental::Sharp),
            Alteration::Flat => step.flat_as_sharp(),
        };
        Self::new(step, accidental, octave)
    }

    /// Table row name, e.g. `CS`.
    pub fn name(&self) -> String {
        match self.accidental {
            Accidental::Natural => self.step.as_str().to_string(),
            Accidental::Sharp => format!("{}S", self.step.as_str()),
        }
    }
}

impl fmt::Display for PitchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave)
    }
}

/// Frequency for a pitch, or `0` when the table has no usable entry.
pub fn resolve_frequency(key: &PitchKey) -> u32 {
    frequency_for(&key.name(), key.octave)
}

/// Frequency for a raw table row name (`"AS"`) and octave, or `0` if unknown.
pub fn frequency_for(name: &str, octave: i32) -> u32 {
    if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
        return 0;
    }
    FREQUENCY_TABLE
        .iter()
        .find(|(row, _)| *row == name)
        .map(|(_, freqs)| freqs[(octave - MIN_OCTAVE) as usize])
        .unwrap_or(0)
}

/// Timing state carried while walking one score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    divisions: u32,
    tempo: u32,
}

impl Default for ParseContext {
    fn default() -> Self {
        Self {
            divisions: 1,
            tempo: DEFAULT_TEMPO,
        }
    }
}

impl ParseContext {
    /// Zero values are clamped to 1 so duration math stays total.
    pub fn new(divisions: u32, tempo: u32) -> Self {
        Self {
            divisions: divisions.max(1),
            tempo: tempo.max(1),
        }
    }

    pub fn with_tempo(tempo: u32) -> Self {
        Self::new(1, tempo)
    }

    pub fn divisions(&self) -> u32 {
        self.divisions
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Returns `false` and leaves the context unchanged for zero.
    pub fn set_divisions(&mut self, divisions: u32) -> bool {
        if divisions == 0 {
            return false;
        }
        self.divisions = divisions;
        true
    }
}

/// Digits kept after the decimal point of a `<duration>` value.
const MAX_FRACTION_DIGITS: u32 = 9;

/// A `<duration>` value in divisions, kept as an exact decimal.
///
/// MusicXML allows non-negative decimals here (`8.0`, `1.5`), so the value is
/// stored as `units / scale` with `scale` a power of ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationValue {
    units: u64,
    scale: u64,
}

impl DurationValue {
    /// Parse a non-negative decimal. Signs, exponents and empty text are
    /// rejected. Digits past the ninth decimal place are truncated.
    ///
    /// ```
    /// use tunegen::pitch::DurationValue;
    ///
    /// assert_eq!(DurationValue::parse("8.0"), Some(DurationValue::from(8)));
    /// assert!(DurationValue::parse("-1").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (text, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS as usize)];
        let scale = 10u64.pow(fraction.len() as u32);
        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let fraction: u64 = if fraction.is_empty() { 0 } else { fraction.parse().ok()? };
        let units = whole.checked_mul(scale)?.checked_add(fraction)?;
        Some(Self { units, scale })
    }
}

impl From<u32> for DurationValue {
    fn from(value: u32) -> Self {
        Self {
            units: u64::from(value),
            scale: 1,
        }
    }
}

/// Convert a `<duration>` value to milliseconds.
///
/// A missing value is one quarter note at the context tempo.
///
/// ```
/// use tunegen::pitch::{resolve_duration, ParseContext};
///
/// assert_eq!(resolve_duration(Some(4), &ParseContext::new(4, 120)), 500);
/// assert_eq!(resolve_duration(Some(1), &ParseContext::new(2, 120)), 250);
/// assert_eq!(resolve_duration(None, &ParseContext::new(8, 60)), 1000);
/// ```
pub fn resolve_duration(value: Option<u32>, ctx: &ParseContext) -> u32 {
    resolve_duration_value(value.map(DurationValue::from), ctx)
}

/// [`resolve_duration`] for a decimal `<duration>` value.
pub fn resolve_duration_value(value: Option<DurationValue>, ctx: &ParseContext) -> u32 {
    match value {
        Some(value) => divide_half_even(
            u128::from(value.units) * 60_000,
            u128::from(value.scale) * u128::from(ctx.divisions) * u128::from(ctx.tempo),
        ),
        None => divide_half_even(60_000, u128::from(ctx.tempo)),
    }
}

fn divide_half_even(numerator: u128, denominator: u128) -> u32 {
    let quotient = numerator / denominator;
    let twice_remainder = (numerator % denominator) * 2;
    let rounded = if twice_remainder > denominator
        || (twice_remainder == denominator && quotient % 2 == 1)
    {
        quotient + 1
    } else {
        quotient
    };
    u32::try_from(rounded).unwrap_or(u32::MAX)
}
