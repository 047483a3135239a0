//! Integration tests for file-backed configuration and ingestion

use nmea_projector::config::ProjectorConfig;
use nmea_projector::{GeodeticOrigin, LineSource, RecoveryPolicy, TrackFormat, TrackProcessor};
use std::io::Write;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

const LOG: &str = "\
$GNGGA,101500.00,4217.8161502,N,00748.0032395,W,1,12,0.6,120.0,M,52.0,M,,
$GNRMC,101500.00,A,4217.8161502,N,00748.0032395,W,0.0,0.0,010124,,,A
$GNGGA,101501.00,4217.8261502,N,00748.0032395,W,1,12,0.6,120.0,M,52.0,M,,
$GNGGA,101502.00,4217.8261502,N,00747.9932395,W,1,12,0.6,120.0,M,52.0,M,,
$GNGGA,101503.00,4217.8261502,N,,,1,12,0.6,120.0,M,52.0,M,,
";

fn origin() -> GeodeticOrigin {
    GeodeticOrigin::new(42.0 + 17.8161502 / 60.0, -(7.0 + 48.0032395 / 60.0))
}

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"{
        "source_type": "file",
        "input_path": "/var/log/gnss/track.nmea",
        "talker": "$GPGGA",
        "strict": false,
        "origin_lat": 42.297,
        "origin_lon": -7.8,
        "on_error": "abort",
        "output_format": "geojson"
    }"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = ProjectorConfig::load_from_path(temp_file.path()).unwrap();

    assert_eq!(config.origin(), Some(GeodeticOrigin::new(42.297, -7.8)));
    assert_eq!(config.decoder().talker(), "$GPGGA");
    assert_eq!(config.recovery_policy().unwrap(), RecoveryPolicy::Abort);
    assert_eq!(config.track_format().unwrap(), TrackFormat::GeoJson);
    assert_eq!(
        config.line_source().unwrap(),
        LineSource::File("/var/log/gnss/track.nmea".into())
    );
    // Fields missing from the file keep their defaults
    assert_eq!(config.serial_baudrate, Some(9600));
}

#[test]
fn test_load_from_missing_path_gives_defaults() {
    let config = ProjectorConfig::load_from_path(Path::new("/nonexistent/config.json")).unwrap();
    assert_eq!(config, ProjectorConfig::default());
}

#[test]
fn test_config_save_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = ProjectorConfig::default();
    config.update_serial("/dev/ttyACM0".to_string(), 38400);
    config.update_origin(GeodeticOrigin::new(42.297, -7.8));
    config.save_to_path(&path).unwrap();

    assert_eq!(ProjectorConfig::load_from_path(&path).unwrap(), config);
}

#[test]
fn test_invalid_config_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"{ not json").unwrap();
    temp_file.flush().unwrap();

    assert!(ProjectorConfig::load_from_path(temp_file.path()).is_err());
}

#[tokio::test]
async fn test_file_to_csv_track() {
    let mut log_file = NamedTempFile::new().unwrap();
    log_file.write_all(LOG.as_bytes()).unwrap();
    log_file.flush().unwrap();

    let source = LineSource::File(log_file.path().to_path_buf());
    let reader = source.open().await.unwrap();
    let processor = TrackProcessor::new(ProjectorConfig::default().decoder(), origin());
    let (track, stats) = processor.run(reader).await.unwrap();

    assert_eq!(stats.lines_read, 5);
    assert_eq!(stats.projected, 3);
    assert_eq!(stats.rejected.get("wrong_talker"), Some(&1));
    assert_eq!(stats.rejected.get("inconsistent_coordinates"), Some(&1));

    let points = track.points();
    assert!(points[0].planar.distance() < 1e-6);

    // 0.01 minutes of latitude north, then 0.01 minutes of longitude east
    let north = points[1].planar;
    assert!(north.y > 18.0 && north.y < 18.6, "{}", north);
    assert!(north.x.abs() < 1e-6);

    // Distance is the true great-circle distance (~23.05 m); the split into
    // x/y follows the bearing term built from the fix longitude, so it is
    // close to 45 degrees here rather than the ENU split of ~13.7/18.5 m.
    let north_east = points[2].planar;
    assert!(north_east.distance() > 22.8 && north_east.distance() < 23.3, "{}", north_east);
    assert!(north_east.x > 16.0 && north_east.x < 16.5, "{}", north_east);
    assert!(north_east.y > 16.1 && north_east.y < 16.6, "{}", north_east);

    let out_dir = tempdir().unwrap();
    let out_path = out_dir.path().join(format!("track.{}", TrackFormat::Csv.extension()));
    track.export_to_file(&out_path, TrackFormat::Csv).unwrap();

    let csv = std::fs::read_to_string(&out_path).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[1].starts_with("1,10:15:00,"));
    assert!(rows[3].starts_with("4,10:15:02,"));
}

#[tokio::test]
async fn test_missing_file_is_connection_error() {
    let source = LineSource::File("/nonexistent/track.nmea".into());
    assert!(source.open().await.is_err());
}
