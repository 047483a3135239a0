// src/main.rs
//! NMEA Projector - decode GNSS fix sentences and project them onto a local plane

use anyhow::Context;
use clap::Parser;
use nmea_projector::{
    config::ProjectorConfig,
    monitor::{list_serial_ports, TrackProcessor},
    GeodeticOrigin, TrackWriter,
};
use std::path::PathBuf;
use tokio::io::AsyncWrite;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Project $GNGGA position fixes onto a local x/y plane around an origin
#[derive(Parser, Debug)]
#[command(name = "nmea-projector", version, about)]
struct Args {
    /// Path to a JSON configuration file (default: per-user config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read sentences from a log file
    #[arg(short, long, conflicts_with_all = ["stdin", "serial"])]
    input: Option<String>,

    /// Read sentences from standard input
    #[arg(long)]
    stdin: bool,

    /// Read sentences from a serial receiver
    #[arg(long, value_name = "PORT")]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Latitude of the plane origin in decimal degrees
    #[arg(long, allow_negative_numbers = true, requires = "origin_lon")]
    origin_lat: Option<f64>,

    /// Longitude of the plane origin in decimal degrees
    #[arg(long, allow_negative_numbers = true, requires = "origin_lat")]
    origin_lon: Option<f64>,

    /// Sentence identifier to accept
    #[arg(long)]
    talker: Option<String>,

    /// Only check the talker, not the field count
    #[arg(long)]
    lenient: bool,

    /// What to do with rejected lines: skip or abort
    #[arg(long)]
    on_error: Option<String>,

    /// Output format: csv, geojson or jsonl
    #[arg(short, long)]
    format: Option<String>,

    /// Write the track to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Persist the effective settings to the configuration file
    #[arg(long)]
    save_config: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

impl Args {
    /// Command-line settings take precedence over the loaded configuration
    fn apply_to(&self, config: &mut ProjectorConfig) {
        if let Some(ref path) = self.input {
            config.update_file(path.clone());
        } else if let Some(ref port) = self.serial {
            config.update_serial(port.clone(), self.baud);
        } else if self.stdin {
            config.update_source("stdin");
        }

        if let (Some(lat), Some(lon)) = (self.origin_lat, self.origin_lon) {
            config.update_origin(GeodeticOrigin::new(lat, lon));
        }
        if let Some(ref talker) = self.talker {
            config.talker = talker.clone();
        }
        if self.lenient {
            config.strict = false;
        }
        if let Some(ref policy) = self.on_error {
            config.on_error = policy.clone();
        }
        if let Some(ref format) = self.format {
            config.output_format = format.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the track can be piped from stdout
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list_ports {
        let ports = list_serial_ports()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        } else {
            println!("Available serial ports:");
            for port in ports {
                println!("  {}", port);
            }
        }
        return Ok(());
    }

    let mut config = match args.config {
        Some(ref path) => ProjectorConfig::load_from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ProjectorConfig::load().unwrap_or_else(|e| {
            warn!(error = %e, "using default configuration");
            ProjectorConfig::default()
        }),
    };
    args.apply_to(&mut config);

    if args.save_config {
        match args.config {
            Some(ref path) => config.save_to_path(path)?,
            None => config.save()?,
        }
        info!("configuration saved");
    }

    let origin = config
        .origin()
        .context("no origin configured; pass --origin-lat and --origin-lon")?;
    let source = config.line_source()?;
    let format = config.track_format()?;

    info!(
        source = %source,
        talker = %config.talker,
        strict = config.strict,
        origin_lat = origin.lat0_deg,
        origin_lon = origin.lon0_deg,
        "starting"
    );

    let processor = TrackProcessor::new(config.decoder(), origin).with_policy(config.recovery_policy()?);

    // Ctrl+C ends the batch even while a read is pending
    let stop = processor.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted; finishing track");
            stop.stop();
        }
    });

    let reader = source.open().await?;
    let sink: Box<dyn AsyncWrite + Unpin + Send> = match args.output {
        Some(ref path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };
    let mut writer = TrackWriter::new(sink, format);

    let (track, stats) = processor.run_to(reader, Some(&mut writer)).await?;
    info!("{}", stats);

    if track.is_empty() {
        warn!("no fixes projected; nothing to write");
        return Ok(());
    }

    writer
        .finish(&track)
        .await
        .with_context(|| format!("writing {} output", format.display_name()))?;
    if let Some(ref path) = args.output {
        info!(points = track.point_count(), path = %path.display(), "track written");
    }

    Ok(())
}
