// src/gps/data.rs
//! Value records produced and consumed by the decoder and projector

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// UTC clock reading carried in the time field of a fix sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    /// Integer value of the digits after the `.`
    pub fraction: Option<u32>,
    /// Number of digits the fraction was written with, needed to scale it
    #[serde(default)]
    pub fraction_digits: u8,
}

impl TimeOfDay {
    pub fn new(hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            fraction: None,
            fraction_digits: 0,
        }
    }

    pub fn with_fraction(mut self, fraction: u32, digits: u8) -> Self {
        self.fraction = Some(fraction);
        self.fraction_digits = digits;
        self
    }

    /// Fractional part as nanoseconds (digits beyond nanosecond precision are dropped)
    pub fn subsec_nanos(&self) -> u32 {
        match self.fraction {
            Some(frac) if self.fraction_digits > 0 => {
                let digits = u32::from(self.fraction_digits);
                if digits <= 9 {
                    frac * 10u32.pow(9 - digits)
                } else {
                    10u64
                        .checked_pow(digits - 9)
                        .map_or(0, |scale| (u64::from(frac) / scale) as u32)
                }
            }
            _ => 0,
        }
    }

    /// Convert to a chrono time, `None` if the reading is out of range
    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_nano_opt(
            u32::from(self.hours),
            u32::from(self.minutes),
            u32::from(self.seconds),
            self.subsec_nanos(),
        )
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.hours, self.minutes, self.seconds)?;
        if let Some(frac) = self.fraction {
            write!(f, ":{}", frac)?;
        }
        Ok(())
    }
}

/// Absolute position in signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl GeodeticPosition {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
        }
    }
}

impl fmt::Display for GeodeticPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude_deg, self.longitude_deg)
    }
}

/// Result of decoding one fix sentence.
///
/// Latitude and longitude live together in `position`, so a fix either
/// carries both or neither.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DecodedFix {
    pub position: Option<GeodeticPosition>,
    pub time_of_day: Option<TimeOfDay>,
}

impl DecodedFix {
    pub fn new(position: Option<GeodeticPosition>, time_of_day: Option<TimeOfDay>) -> Self {
        Self {
            position,
            time_of_day,
        }
    }

    pub fn latitude_deg(&self) -> Option<f64> {
        self.position.map(|p| p.latitude_deg)
    }

    pub fn longitude_deg(&self) -> Option<f64> {
        self.position.map(|p| p.longitude_deg)
    }

    /// Check if the sentence carried a position
    pub fn has_fix(&self) -> bool {
        self.position.is_some()
    }
}

impl fmt::Display for DecodedFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(value: Option<T>) -> String {
            value.map_or_else(|| "None".to_string(), |v| v.to_string())
        }

        write!(
            f,
            "Latitude: {}, Longitude: {}, Time: {}",
            opt(self.latitude_deg()),
            opt(self.longitude_deg()),
            opt(self.time_of_day)
        )
    }
}

/// Reference point of the local plane, in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticOrigin {
    pub lat0_deg: f64,
    pub lon0_deg: f64,
}

impl GeodeticOrigin {
    pub fn new(lat0_deg: f64, lon0_deg: f64) -> Self {
        Self { lat0_deg, lon0_deg }
    }
}

impl From<GeodeticPosition> for GeodeticOrigin {
    fn from(position: GeodeticPosition) -> Self {
        Self::new(position.latitude_deg, position.longitude_deg)
    }
}

/// Local planar coordinate in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanarCoordinate {
    pub x: f64,
    pub y: f64,
}

impl PlanarCoordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance from the origin; equals the great-circle distance the point was built from
    pub fn distance(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl fmt::Display for PlanarCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.x, self.y)
    }
}
