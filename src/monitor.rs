// src/monitor.rs
//! Ingestion of sentence streams: line sources, recovery policy and batch statistics

use crate::{
    error::{DecodeError, ProjectorError, Result},
    gps::{DecodedFix, GeodeticOrigin, GeodeticProjector, SentenceDecoder},
    track::{Track, TrackPoint, TrackWriter},
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader};
use tokio::sync::watch;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Where sentence lines are read from
#[derive(Debug, Clone, PartialEq)]
pub enum LineSource {
    File(PathBuf),
    Stdin,
    Serial { port: String, baudrate: u32 },
}

impl LineSource {
    /// Open the source as a buffered line reader
    pub async fn open(&self) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
        match self {
            LineSource::File(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    ProjectorError::Connection(format!("Failed to open {}: {}", path.display(), e))
                })?;
                info!(path = %path.display(), "reading sentences from file");
                Ok(Box::new(BufReader::new(file)))
            }
            LineSource::Stdin => {
                info!("reading sentences from stdin");
                Ok(Box::new(BufReader::new(tokio::io::stdin())))
            }
            LineSource::Serial { port, baudrate } => {
                let serial = tokio_serial::new(port, *baudrate)
                    .timeout(Duration::from_millis(1000))
                    .open_native_async()
                    .map_err(|e| {
                        ProjectorError::Connection(format!("Failed to open serial port {}: {}", port, e))
                    })?;
                info!(port = %port, baudrate = *baudrate, "connected to serial receiver");
                Ok(Box::new(BufReader::new(serial)))
            }
        }
    }
}

impl fmt::Display for LineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineSource::File(path) => write!(f, "file {}", path.display()),
            LineSource::Stdin => write!(f, "stdin"),
            LineSource::Serial { port, baudrate } => write!(f, "serial {} at {} baud", port, baudrate),
        }
    }
}

/// What to do with a line the decoder rejects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPolicy {
    /// Count the rejection and continue with the next line
    #[default]
    Skip,
    /// Stop the batch at the first rejected line
    Abort,
}

impl FromStr for RecoveryPolicy {
    type Err = ProjectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(RecoveryPolicy::Skip),
            "abort" => Ok(RecoveryPolicy::Abort),
            other => Err(ProjectorError::Config(format!("Unknown recovery policy: {}", other))),
        }
    }
}

/// Outcome of a single accepted line
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Blank,
    /// Valid sentence without coordinates
    NoFix(DecodedFix),
    Projected(TrackPoint),
}

/// Counters collected over one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    pub lines_read: usize,
    pub blank_lines: usize,
    pub projected: usize,
    pub no_fix: usize,
    /// Rejected lines keyed by error kind
    pub rejected: BTreeMap<String, usize>,
}

impl ProcessingStats {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    fn record(&mut self, outcome: &LineOutcome) {
        match outcome {
            LineOutcome::Blank => self.blank_lines += 1,
            LineOutcome::NoFix(_) => self.no_fix += 1,
            LineOutcome::Projected(_) => self.projected += 1,
        }
    }

    fn record_rejection(&mut self, error: &ProjectorError) {
        *self.rejected.entry(error_kind(error).to_string()).or_insert(0) += 1;
    }
}

impl fmt::Display for ProcessingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines: {} projected, {} without fix, {} blank, {} rejected",
            self.lines_read,
            self.projected,
            self.no_fix,
            self.blank_lines,
            self.rejected_total()
        )
    }
}

fn error_kind(error: &ProjectorError) -> &'static str {
    match error {
        ProjectorError::Decode(e) => e.kind(),
        ProjectorError::Projection(e) => e.kind(),
        ProjectorError::InvalidText(_) => "invalid_utf8",
        _ => "other",
    }
}

/// Cloneable handle that stops a running [`TrackProcessor`].
///
/// Stopping wakes a read that is blocked on a quiet source, so a serial port
/// or pipe that never delivers another line still ends the batch promptly.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    signal: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            running: Arc::new(AtomicBool::new(true)),
            signal: Arc::new(signal),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.signal.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }
}

/// Decodes and projects lines relative to a fixed origin
pub struct TrackProcessor {
    decoder: SentenceDecoder,
    projector: GeodeticProjector,
    origin: GeodeticOrigin,
    policy: RecoveryPolicy,
    stop: StopHandle,
}

impl TrackProcessor {
    pub fn new(decoder: SentenceDecoder, origin: GeodeticOrigin) -> Self {
        Self {
            decoder,
            projector: GeodeticProjector::new(),
            origin,
            policy: RecoveryPolicy::default(),
            stop: StopHandle::new(),
        }
    }

    pub fn with_projector(mut self, projector: GeodeticProjector) -> Self {
        self.projector = projector;
        self
    }

    pub fn with_policy(mut self, policy: RecoveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Handle for stopping `run` from another task (e.g. a Ctrl+C listener)
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stop the processor
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Check if the processor is running
    pub fn is_running(&self) -> bool {
        self.stop.is_running()
    }

    pub fn origin(&self) -> GeodeticOrigin {
        self.origin
    }

    /// Decode and project one line
    pub fn process_line(&self, line_number: usize, line: &str) -> Result<LineOutcome> {
        process_line_with(&self.decoder, &self.projector, self.origin, line_number, line)
    }

    /// Consume a reader until EOF (or until stopped), applying the recovery policy
    pub async fn run<R>(&self, reader: R) -> Result<(Track, ProcessingStats)>
    where
        R: AsyncBufRead + Unpin,
    {
        self.run_to::<R, tokio::io::Sink>(reader, None).await
    }

    /// Like [`run`](Self::run), additionally writing each projected point to
    /// `output` as soon as it is accepted
    pub async fn run_to<R, W>(
        &self,
        mut reader: R,
        mut output: Option<&mut TrackWriter<W>>,
    ) -> Result<(Track, ProcessingStats)>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut track = Track::new(self.origin);
        let mut stats = ProcessingStats::default();
        let mut shutdown = self.stop.subscribe();
        let mut buf = Vec::new();

        while self.is_running() {
            buf.clear();
            let read = tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => read?,
                _ = shutdown.changed() => break,
            };
            if read == 0 {
                break; // EOF
            }
            stats.lines_read += 1;
            let line_number = stats.lines_read;

            let result = std::str::from_utf8(&buf)
                .map_err(ProjectorError::from)
                .and_then(|line| self.process_line(line_number, line));

            match result {
                Ok(outcome) => {
                    stats.record(&outcome);
                    if let LineOutcome::Projected(point) = outcome {
                        debug!(line = line_number, x = point.planar.x, y = point.planar.y, "fix_projected");
                        if let Some(writer) = output.as_mut() {
                            writer.write_point(&point).await?;
                        }
                        track.add_point(point);
                    }
                }
                Err(e) => self.reject(line_number, e, &mut stats)?,
            }
        }

        info!(
            lines = stats.lines_read,
            projected = stats.projected,
            no_fix = stats.no_fix,
            rejected = stats.rejected_total(),
            "batch_complete"
        );

        Ok((track, stats))
    }

    /// Count a rejected line, or turn it into an abort under the abort policy
    fn reject(&self, line_number: usize, error: ProjectorError, stats: &mut ProcessingStats) -> Result<()> {
        if self.policy == RecoveryPolicy::Abort {
            return Err(ProjectorError::Aborted {
                line: line_number,
                source: Box::new(error),
            });
        }
        match &error {
            ProjectorError::Decode(DecodeError::WrongTalker { found, .. }) => {
                debug!(line = line_number, talker = %found, "sentence_skipped");
            }
            _ => warn!(line = line_number, error = %error, "sentence_rejected"),
        }
        stats.record_rejection(&error);
        Ok(())
    }

    /// Process independent lines on blocking tasks; results keep input order
    pub async fn process_lines_parallel(&self, lines: Vec<String>) -> Vec<Result<LineOutcome>> {
        let handles: Vec<_> = lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                let decoder = self.decoder.clone();
                let projector = self.projector;
                let origin = self.origin;
                tokio::task::spawn_blocking(move || {
                    process_line_with(&decoder, &projector, origin, index + 1, &line)
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(
                handle
                    .await
                    .unwrap_or_else(|e| Err(ProjectorError::Other(format!("Worker task failed: {}", e)))),
            );
        }
        results
    }
}

fn process_line_with(
    decoder: &SentenceDecoder,
    projector: &GeodeticProjector,
    origin: GeodeticOrigin,
    line_number: usize,
    line: &str,
) -> Result<LineOutcome> {
    if line.trim().is_empty() {
        return Ok(LineOutcome::Blank);
    }

    let fix = decoder.decode(line)?;
    let Some(position) = fix.position else {
        return Ok(LineOutcome::NoFix(fix));
    };

    Ok(LineOutcome::Projected(TrackPoint {
        line: line_number,
        time_of_day: fix.time_of_day,
        position,
        planar: projector.project_position(position, origin),
    }))
}

/// List available serial ports
pub fn list_serial_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| ProjectorError::Other(format!("Failed to list serial ports: {}", e)))?;

    Ok(ports
        .into_iter()
        .map(|port| format!("{} - {:?}", port.port_name, port.port_type))
        .collect())
}
