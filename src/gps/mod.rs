// src/gps/mod.rs
//! Fix sentence decoding and local-plane projection

pub mod data;
pub mod nmea;
pub mod projection;

pub use data::{DecodedFix, GeodeticOrigin, GeodeticPosition, PlanarCoordinate, TimeOfDay};
pub use nmea::{RawSentence, SchemaMode, SentenceDecoder};
pub use projection::GeodeticProjector;
