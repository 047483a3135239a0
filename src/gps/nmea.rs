// src/gps/nmea.rs
//! Position fix sentence decoding

use super::data::{DecodedFix, GeodeticPosition, TimeOfDay};
use crate::error::{Axis, DecodeError, ProjectionError, Result};

/// Talker identifier of the supported fix sentence
pub const GGA_TALKER: &str = "$GNGGA";

/// Number of comma-separated fields in a complete fix sentence
pub const GGA_FIELD_COUNT: usize = 15;

/// Fields the decoder reads: talker, time, latitude pair, longitude pair
const MIN_DECODED_FIELDS: usize = 6;

const TIME_FIELD: usize = 1;
const LAT_FIELD: usize = 2;
const LAT_HEMISPHERE_FIELD: usize = 3;
const LON_FIELD: usize = 4;
const LON_HEMISPHERE_FIELD: usize = 5;

/// How strictly the sentence layout is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaMode {
    /// Talker and exact field count
    #[default]
    Strict,
    /// Talker only; the decoded fields must still exist
    Lenient,
}

/// One input line split into its comma-delimited fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSentence<'a> {
    fields: Vec<&'a str>,
}

impl<'a> RawSentence<'a> {
    /// Trim surrounding whitespace and split on `,`
    pub fn parse(line: &'a str) -> Self {
        Self {
            fields: line.trim().split(',').collect(),
        }
    }

    /// First field, naming the sentence type
    pub fn talker(&self) -> &'a str {
        self.fields[0]
    }

    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false: splitting yields at least one (possibly empty) field
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decoder for position fix sentences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceDecoder {
    talker: String,
    mode: SchemaMode,
}

impl Default for SentenceDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceDecoder {
    /// Strict decoder for `$GNGGA`
    pub fn new() -> Self {
        Self {
            talker: GGA_TALKER.to_string(),
            mode: SchemaMode::Strict,
        }
    }

    pub fn with_talker(mut self, talker: impl Into<String>) -> Self {
        self.talker = talker.into();
        self
    }

    pub fn with_mode(mut self, mode: SchemaMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn talker(&self) -> &str {
        &self.talker
    }

    pub fn mode(&self) -> SchemaMode {
        self.mode
    }

    /// Decode one line into a fix.
    ///
    /// Pure function of the line and the decoder settings; nothing is logged
    /// and every failure is returned to the caller.
    pub fn decode(&self, line: &str) -> std::result::Result<DecodedFix, DecodeError> {
        let sentence = RawSentence::parse(line);
        self.check_layout(&sentence)?;

        // Layout check guarantees indices 0..=5 exist
        let field = |index: usize| sentence.field(index).unwrap_or_default();

        let time_of_day = parse_time(field(TIME_FIELD))?;
        let latitude = parse_coordinate(field(LAT_FIELD), field(LAT_HEMISPHERE_FIELD), Axis::Latitude)?;
        let longitude = parse_coordinate(field(LON_FIELD), field(LON_HEMISPHERE_FIELD), Axis::Longitude)?;

        let position = match (latitude, longitude) {
            (Some(lat), Some(lon)) => Some(GeodeticPosition::new(lat, lon)),
            (None, None) => None,
            _ => return Err(DecodeError::InconsistentCoordinates),
        };

        Ok(DecodedFix::new(position, time_of_day))
    }

    /// Decode and require a position, giving the fix in decimal degrees
    pub fn decode_to_position(&self, line: &str) -> Result<GeodeticPosition> {
        let fix = self.decode(line)?;
        Ok(fix.position.ok_or(ProjectionError::NoFix)?)
    }

    fn check_layout(&self, sentence: &RawSentence<'_>) -> std::result::Result<(), DecodeError> {
        if sentence.talker() != self.talker {
            return Err(DecodeError::WrongTalker {
                expected: self.talker.clone(),
                found: sentence.talker().to_string(),
            });
        }

        let expected = match self.mode {
            SchemaMode::Strict if sentence.len() != GGA_FIELD_COUNT => Some(GGA_FIELD_COUNT),
            SchemaMode::Lenient if sentence.len() < MIN_DECODED_FIELDS => Some(MIN_DECODED_FIELDS),
            _ => None,
        };

        match expected {
            Some(expected) => Err(DecodeError::FieldCountMismatch {
                expected,
                found: sentence.len(),
            }),
            None => Ok(()),
        }
    }
}

/// Parse `hhmmss` with an optional `.fraction` suffix
fn parse_time(field: &str) -> std::result::Result<Option<TimeOfDay>, DecodeError> {
    if field.is_empty() {
        return Ok(None);
    }

    let malformed = || DecodeError::MalformedTime {
        field: field.to_string(),
    };

    let bytes = field.as_bytes();
    if bytes.len() < 6 || !bytes[..6].iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }

    let two_digits = |at: usize| (bytes[at] - b'0') * 10 + (bytes[at + 1] - b'0');
    let (hours, minutes, seconds) = (two_digits(0), two_digits(2), two_digits(4));
    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(malformed());
    }

    let mut time = TimeOfDay::new(hours, minutes, seconds);

    // First six bytes are ASCII, so 6 is a char boundary
    let rest = &field[6..];
    if !rest.is_empty() {
        let digits = rest.strip_prefix('.').ok_or_else(malformed)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        // Nanosecond precision is all a clock reading can carry
        let kept = &digits[..digits.len().min(9)];
        let fraction = kept.parse::<u32>().map_err(|_| malformed())?;
        time = time.with_fraction(fraction, kept.len() as u8);
    }

    Ok(Some(time))
}

/// Parse a `DDMM.MMMM` / `DDDMM.MMMM` magnitude plus hemisphere letter into signed degrees
fn parse_coordinate(
    magnitude: &str,
    hemisphere: &str,
    axis: Axis,
) -> std::result::Result<Option<f64>, DecodeError> {
    if magnitude.is_empty() || hemisphere.is_empty() {
        return Ok(None);
    }

    let (degree_digits, limit, positive, negative) = match axis {
        Axis::Latitude => (2, 90.0, "N", "S"),
        Axis::Longitude => (3, 180.0, "E", "W"),
    };

    let malformed = || DecodeError::MalformedCoordinate {
        axis,
        field: format!("{}{}", magnitude, hemisphere),
    };

    let sign = if hemisphere == positive {
        1.0
    } else if hemisphere == negative {
        -1.0
    } else {
        return Err(malformed());
    };

    let bytes = magnitude.as_bytes();
    if bytes.len() <= degree_digits || !bytes[..degree_digits].iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }

    let (degree_part, minute_part) = magnitude.split_at(degree_digits);
    if !is_plain_decimal(minute_part) {
        return Err(malformed());
    }

    let degrees = degree_part.parse::<u16>().map_err(|_| malformed())?;
    let minutes = minute_part.parse::<f64>().map_err(|_| malformed())?;
    if minutes >= 60.0 {
        return Err(malformed());
    }

    let value = f64::from(degrees) + minutes / 60.0;
    if value > limit {
        return Err(malformed());
    }

    Ok(Some(sign * value))
}

/// Digits with at most one `.`; rejects signs, exponents and `inf`/`NaN`
fn is_plain_decimal(text: &str) -> bool {
    let mut dots = 0;
    let mut digits = 0;
    for b in text.bytes() {
        match b {
            b'.' => dots += 1,
            b'0'..=b'9' => digits += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}
