// src/config.rs
//! Configuration management with per-user storage

use crate::{
    error::{ProjectorError, Result},
    gps::{GeodeticOrigin, SchemaMode, SentenceDecoder},
    monitor::{LineSource, RecoveryPolicy},
    track::TrackFormat,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    pub source_type: String, // "file", "stdin", "serial"
    pub input_path: Option<String>,
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
    pub talker: String,
    pub strict: bool,
    pub origin_lat: Option<f64>,
    pub origin_lon: Option<f64>,
    pub on_error: String,      // "skip", "abort"
    pub output_format: String, // "csv", "geojson", "jsonl"
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            source_type: "stdin".to_string(),
            input_path: None,
            serial_port: None,
            serial_baudrate: Some(9600),
            talker: crate::gps::nmea::GGA_TALKER.to_string(),
            strict: true,
            origin_lat: None,
            origin_lon: None,
            on_error: "skip".to_string(),
            output_format: "csv".to_string(),
        }
    }
}

impl ProjectorConfig {
    /// Load configuration from the per-user config file, defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::get_config_path()?)
    }

    /// Save configuration to the per-user config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::get_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProjectorError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            ProjectorError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ProjectorError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| ProjectorError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Config file location for the current platform
    pub fn get_config_path() -> Result<PathBuf> {
        #[cfg(windows)]
        {
            let appdata = std::env::var("APPDATA")
                .map_err(|_| ProjectorError::Config("APPDATA environment variable not set".to_string()))?;
            Ok(PathBuf::from(appdata).join("nmea-projector").join("config.json"))
        }

        #[cfg(not(windows))]
        {
            let home = std::env::var("HOME")
                .map_err(|_| ProjectorError::Config("HOME environment variable not set".to_string()))?;
            Ok(PathBuf::from(home).join(".config").join("nmea-projector").join("config.json"))
        }
    }

    /// Origin of the local plane, if both coordinates are configured
    pub fn origin(&self) -> Option<GeodeticOrigin> {
        match (self.origin_lat, self.origin_lon) {
            (Some(lat), Some(lon)) => Some(GeodeticOrigin::new(lat, lon)),
            _ => None,
        }
    }

    /// Decoder matching the configured talker and strictness
    pub fn decoder(&self) -> SentenceDecoder {
        let mode = if self.strict {
            SchemaMode::Strict
        } else {
            SchemaMode::Lenient
        };
        SentenceDecoder::new().with_talker(self.talker.clone()).with_mode(mode)
    }

    pub fn recovery_policy(&self) -> Result<RecoveryPolicy> {
        self.on_error.parse()
    }

    pub fn track_format(&self) -> Result<TrackFormat> {
        self.output_format.parse()
    }

    /// Line source described by the source settings
    pub fn line_source(&self) -> Result<LineSource> {
        match self.source_type.as_str() {
            "stdin" => Ok(LineSource::Stdin),
            "file" => self
                .input_path
                .as_ref()
                .map(|path| LineSource::File(PathBuf::from(path)))
                .ok_or_else(|| ProjectorError::Config("File source requires input_path".to_string())),
            "serial" => {
                let port = self.serial_port.clone().ok_or_else(|| {
                    ProjectorError::Config("Serial source requires serial_port".to_string())
                })?;
                Ok(LineSource::Serial {
                    port,
                    baudrate: self.serial_baudrate.unwrap_or(9600),
                })
            }
            other => Err(ProjectorError::Config(format!("Unknown source type: {}", other))),
        }
    }

    /// Update configuration with new source settings
    pub fn update_source(&mut self, source_type: &str) {
        self.source_type = source_type.to_string();
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = Some(baudrate);
    }

    /// Update input file settings
    pub fn update_file(&mut self, path: String) {
        self.source_type = "file".to_string();
        self.input_path = Some(path);
    }

    pub fn update_origin(&mut self, origin: GeodeticOrigin) {
        self.origin_lat = Some(origin.lat0_deg);
        self.origin_lon = Some(origin.lon0_deg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProjectorConfig::default();
        assert_eq!(config.source_type, "stdin");
        assert_eq!(config.talker, "$GNGGA");
        assert!(config.strict);
        assert!(config.origin().is_none());
        assert_eq!(config.decoder(), SentenceDecoder::new());
        assert_eq!(config.recovery_policy().unwrap(), RecoveryPolicy::Skip);
        assert_eq!(config.track_format().unwrap(), TrackFormat::Csv);
    }

    #[test]
    fn test_update_serial() {
        let mut config = ProjectorConfig::default();
        config.update_serial("/dev/ttyUSB0".to_string(), 115200);
        assert_eq!(config.source_type, "serial");
        assert_eq!(
            config.line_source().unwrap(),
            LineSource::Serial {
                port: "/dev/ttyUSB0".to_string(),
                baudrate: 115200
            }
        );
    }

    #[test]
    fn test_update_file_and_origin() {
        let mut config = ProjectorConfig::default();
        config.update_file("track.nmea".to_string());
        config.update_origin(GeodeticOrigin::new(42.2, -8.7));

        assert_eq!(config.line_source().unwrap(), LineSource::File(PathBuf::from("track.nmea")));
        assert_eq!(config.origin(), Some(GeodeticOrigin::new(42.2, -8.7)));
    }

    #[test]
    fn test_invalid_settings() {
        let mut config = ProjectorConfig::default();
        config.update_source("file");
        assert!(config.line_source().is_err());

        config.update_source("bluetooth");
        assert!(config.line_source().is_err());

        config.on_error = "retry".to_string();
        assert!(config.recovery_policy().is_err());
    }

    #[test]
    fn test_lenient_decoder() {
        let config = ProjectorConfig {
            strict: false,
            talker: "$GPGGA".to_string(),
            ..Default::default()
        };
        let decoder = config.decoder();
        assert_eq!(decoder.mode(), SchemaMode::Lenient);
        assert_eq!(decoder.talker(), "$GPGGA");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ProjectorConfig = serde_json::from_str(r#"{"origin_lat": 1.5}"#).unwrap();
        assert_eq!(config.origin_lat, Some(1.5));
        assert_eq!(config.talker, "$GNGGA");
        assert!(config.origin().is_none());
    }
}
