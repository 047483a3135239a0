// src/error.rs
//! Error types for sentence decoding, projection and ingestion

use std::fmt;

pub type Result<T> = std::result::Result<T, ProjectorError>;

/// Which axis of a coordinate pair a decode failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => write!(f, "latitude"),
            Axis::Longitude => write!(f, "longitude"),
        }
    }
}

/// Reasons a single sentence can be rejected by the decoder
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// First field is not the configured sentence identifier
    WrongTalker { expected: String, found: String },
    /// Field count differs from the schema width (or the lenient minimum)
    FieldCountMismatch { expected: usize, found: usize },
    /// Non-empty time field is not `hhmmss[.f]`
    MalformedTime { field: String },
    /// Magnitude or hemisphere field cannot be decoded
    MalformedCoordinate { axis: Axis, field: String },
    /// Exactly one of latitude/longitude is present
    InconsistentCoordinates,
}

impl DecodeError {
    /// Short stable name, used as a key in batch statistics
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::WrongTalker { .. } => "wrong_talker",
            DecodeError::FieldCountMismatch { .. } => "field_count_mismatch",
            DecodeError::MalformedTime { .. } => "malformed_time",
            DecodeError::MalformedCoordinate { .. } => "malformed_coordinate",
            DecodeError::InconsistentCoordinates => "inconsistent_coordinates",
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::WrongTalker { expected, found } => {
                write!(f, "Wrong talker: expected {}, found {:?}", expected, found)
            }
            DecodeError::FieldCountMismatch { expected, found } => {
                write!(f, "Field count mismatch: expected {}, found {}", expected, found)
            }
            DecodeError::MalformedTime { field } => write!(f, "Malformed time field {:?}", field),
            DecodeError::MalformedCoordinate { axis, field } => {
                write!(f, "Malformed {} field {:?}", axis, field)
            }
            DecodeError::InconsistentCoordinates => {
                write!(f, "Inconsistent coordinates: only one of latitude/longitude present")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Reasons a decoded fix cannot be projected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionError {
    NoFix,
}

impl ProjectionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProjectionError::NoFix => "no_fix",
        }
    }
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionError::NoFix => write!(f, "No fix: sentence carries no coordinates"),
        }
    }
}

impl std::error::Error for ProjectionError {}

/// Crate-level error used by the ingestion layer and the binary
#[derive(Debug)]
pub enum ProjectorError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Decode(DecodeError),
    Projection(ProjectionError),
    /// Input line is not valid UTF-8
    InvalidText(std::str::Utf8Error),
    Config(String),
    Connection(String),
    /// A line was rejected while the recovery policy was `abort`
    Aborted { line: usize, source: Box<ProjectorError> },
    Other(String),
}

impl fmt::Display for ProjectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectorError::Io(e) => write!(f, "IO error: {}", e),
            ProjectorError::Serial(e) => write!(f, "Serial error: {}", e),
            ProjectorError::Json(e) => write!(f, "JSON error: {}", e),
            ProjectorError::Decode(e) => write!(f, "Decode error: {}", e),
            ProjectorError::Projection(e) => write!(f, "Projection error: {}", e),
            ProjectorError::InvalidText(e) => write!(f, "Invalid text: {}", e),
            ProjectorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ProjectorError::Connection(msg) => write!(f, "Connection error: {}", msg),
            ProjectorError::Aborted { line, source } => {
                write!(f, "Aborted at line {}: {}", line, source)
            }
            ProjectorError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for ProjectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProjectorError::Io(e) => Some(e),
            ProjectorError::Serial(e) => Some(e),
            ProjectorError::Json(e) => Some(e),
            ProjectorError::Decode(e) => Some(e),
            ProjectorError::Projection(e) => Some(e),
            ProjectorError::InvalidText(e) => Some(e),
            ProjectorError::Aborted { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProjectorError {
    fn from(error: std::io::Error) -> Self {
        ProjectorError::Io(error)
    }
}

impl From<tokio_serial::Error> for ProjectorError {
    fn from(error: tokio_serial::Error) -> Self {
        ProjectorError::Serial(error)
    }
}

impl From<serde_json::Error> for ProjectorError {
    fn from(error: serde_json::Error) -> Self {
        ProjectorError::Json(error)
    }
}

impl From<DecodeError> for ProjectorError {
    fn from(error: DecodeError) -> Self {
        ProjectorError::Decode(error)
    }
}

impl From<ProjectionError> for ProjectorError {
    fn from(error: ProjectionError) -> Self {
        ProjectorError::Projection(error)
    }
}

impl From<std::str::Utf8Error> for ProjectorError {
    fn from(error: std::str::Utf8Error) -> Self {
        ProjectorError::InvalidText(error)
    }
}

impl From<anyhow::Error> for ProjectorError {
    fn from(error: anyhow::Error) -> Self {
        ProjectorError::Other(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::WrongTalker {
            expected: "$GNGGA".to_string(),
            found: "$GPGGA".to_string(),
        };
        assert_eq!(err.to_string(), "Wrong talker: expected $GNGGA, found \"$GPGGA\"");

        let err = DecodeError::MalformedCoordinate {
            axis: Axis::Longitude,
            field: "01131.000X".to_string(),
        };
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn test_kinds_are_distinct() {
        let kinds = [
            DecodeError::WrongTalker { expected: String::new(), found: String::new() }.kind(),
            DecodeError::FieldCountMismatch { expected: 15, found: 3 }.kind(),
            DecodeError::MalformedTime { field: String::new() }.kind(),
            DecodeError::MalformedCoordinate { axis: Axis::Latitude, field: String::new() }.kind(),
            DecodeError::InconsistentCoordinates.kind(),
            ProjectionError::NoFix.kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn test_aborted_exposes_source() {
        use std::error::Error;

        let err = ProjectorError::Aborted {
            line: 7,
            source: Box::new(ProjectorError::Projection(ProjectionError::NoFix)),
        };
        assert!(err.to_string().starts_with("Aborted at line 7"));
        assert!(err.source().is_some());
    }
}
