// src/lib.rs
//! NMEA Projector Library
//!
//! Decodes GNSS position fix sentences into decimal-degree fixes and projects
//! them onto a local plane around a chosen origin.

pub mod config;
pub mod error;
pub mod gps;
pub mod monitor;
pub mod track;

// Re-export main types for convenience
pub use error::{DecodeError, ProjectionError, ProjectorError, Result};
pub use gps::{
    DecodedFix, GeodeticOrigin, GeodeticPosition, GeodeticProjector, PlanarCoordinate,
    SchemaMode, SentenceDecoder, TimeOfDay,
};
pub use monitor::{LineSource, ProcessingStats, RecoveryPolicy, StopHandle, TrackProcessor};
pub use track::{Track, TrackFormat, TrackPoint, TrackWriter};
