// src/track.rs
//! Projected track recording and export

use crate::error::{ProjectorError, Result};
use crate::gps::{GeodeticOrigin, GeodeticPosition, PlanarCoordinate, TimeOfDay};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const CSV_HEADER: &str = "line,time,latitude,longitude,x,y\n";

/// One projected fix, tagged with the input line it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub line: usize,
    pub time_of_day: Option<TimeOfDay>,
    pub position: GeodeticPosition,
    pub planar: PlanarCoordinate,
}

impl TrackPoint {
    /// Time as `HH:MM:SS[.fff]`, empty when the sentence had none
    fn time_string(&self) -> String {
        self.time_of_day
            .and_then(|t| t.to_naive_time())
            .map_or(String::new(), |t| t.format("%H:%M:%S%.f").to_string())
    }

    fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}\n",
            self.line,
            self.time_string(),
            self.position.latitude_deg,
            self.position.longitude_deg,
            self.planar.x,
            self.planar.y
        )
    }

    fn to_json_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Csv,
    GeoJson,
    JsonLines,
}

impl TrackFormat {
    pub fn extension(&self) -> &str {
        match self {
            TrackFormat::Csv => "csv",
            TrackFormat::GeoJson => "geojson",
            TrackFormat::JsonLines => "jsonl",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            TrackFormat::Csv => "CSV",
            TrackFormat::GeoJson => "GeoJSON",
            TrackFormat::JsonLines => "JSON Lines",
        }
    }

    /// Whether points can be written one at a time as they arrive
    pub fn is_row_based(&self) -> bool {
        !matches!(self, TrackFormat::GeoJson)
    }
}

impl FromStr for TrackFormat {
    type Err = ProjectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(TrackFormat::Csv),
            "geojson" => Ok(TrackFormat::GeoJson),
            "jsonl" | "jsonlines" => Ok(TrackFormat::JsonLines),
            other => Err(ProjectorError::Config(format!("Unknown output format: {}", other))),
        }
    }
}

/// Projected points relative to a single origin
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    origin: GeodeticOrigin,
    points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(origin: GeodeticOrigin) -> Self {
        Self {
            origin,
            points: Vec::new(),
        }
    }

    pub fn origin(&self) -> GeodeticOrigin {
        self.origin
    }

    pub fn add_point(&mut self, point: TrackPoint) {
        self.points.push(point);
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Sum of straight segment lengths on the local plane
    pub fn planar_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| (pair[1].planar.x - pair[0].planar.x).hypot(pair[1].planar.y - pair[0].planar.y))
            .sum()
    }

    pub fn export_to_file(&self, path: &Path, format: TrackFormat) -> Result<()> {
        if self.points.is_empty() {
            return Err(ProjectorError::Other("No track points to export".to_string()));
        }

        let content = self.render(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;

        Ok(())
    }

    pub fn render(&self, format: TrackFormat) -> Result<String> {
        match format {
            TrackFormat::Csv => Ok(self.to_csv()),
            TrackFormat::GeoJson => self.to_geojson(),
            TrackFormat::JsonLines => self.to_json_lines(),
        }
    }

    fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        for point in &self.points {
            csv.push_str(&point.to_csv_row());
        }
        csv
    }

    fn to_geojson(&self) -> Result<String> {
        let features: Vec<serde_json::Value> = self
            .points
            .iter()
            .map(|point| {
                let mut properties = serde_json::json!({
                    "line": point.line,
                    "x": point.planar.x,
                    "y": point.planar.y,
                });

                if point.time_of_day.is_some() {
                    properties["time"] = serde_json::json!(point.time_string());
                }

                serde_json::json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [point.position.longitude_deg, point.position.latitude_deg]
                    },
                    "properties": properties
                })
            })
            .collect();

        let feature_collection = serde_json::json!({
            "type": "FeatureCollection",
            "origin": [self.origin.lon0_deg, self.origin.lat0_deg],
            "features": features
        });

        Ok(serde_json::to_string_pretty(&feature_collection)?)
    }

    fn to_json_lines(&self) -> Result<String> {
        let mut out = String::new();
        for point in &self.points {
            out.push_str(&point.to_json_line()?);
        }
        Ok(out)
    }
}

/// Writes a track to an async sink while it is being recorded.
///
/// Row-based formats (CSV, JSON Lines) emit and flush each point as soon as it
/// is projected, so output from a live receiver is visible immediately.
/// GeoJSON needs the whole collection and is written by [`TrackWriter::finish`].
pub struct TrackWriter<W> {
    writer: W,
    format: TrackFormat,
    written: usize,
}

impl<W: AsyncWrite + Unpin> TrackWriter<W> {
    pub fn new(writer: W, format: TrackFormat) -> Self {
        Self {
            writer,
            format,
            written: 0,
        }
    }

    pub fn format(&self) -> TrackFormat {
        self.format
    }

    /// Points emitted so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub async fn write_point(&mut self, point: &TrackPoint) -> Result<()> {
        let row = match self.format {
            TrackFormat::GeoJson => return Ok(()),
            TrackFormat::Csv if self.written == 0 => format!("{}{}", CSV_HEADER, point.to_csv_row()),
            TrackFormat::Csv => point.to_csv_row(),
            TrackFormat::JsonLines => point.to_json_line()?,
        };

        self.writer.write_all(row.as_bytes()).await?;
        self.writer.flush().await?;
        self.written += 1;
        Ok(())
    }

    /// Writes whatever could not be streamed and flushes the sink
    pub async fn finish(&mut self, track: &Track) -> Result<()> {
        if !self.format.is_row_based() && !track.is_empty() {
            self.writer.write_all(track.render(self.format)?.as_bytes()).await?;
            self.written = track.point_count();
        }
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
