//! nextbus - Next departures for one route and stop
//!
//! This tool scans a GTFS-Realtime trip-updates snapshot and prints the
//! next departures of one route at one stop, as JSON for the dashboard or
//! as text for a terminal.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, ValueEnum};
use nextbus_core::board::MESSAGE_OK;
use nextbus_core::scanner::{DEFAULT_EARLY_EXIT_TOLERANCE, DEFAULT_LIMIT};
use nextbus_core::{
    next_departures_with, parse_header, serve_with_cache, BoardSource, CacheEntry, Clock,
    DepartureBoard, FeedStatus, Query, ScanConfig, ScanStats, Scanner, Snapshot, SystemClock,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;

/// Print the next departures of one route at one stop
#[derive(Parser, Debug)]
#[command(name = "nextbus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a trip-updates snapshot (`-` for stdin)
    #[arg(short, long, value_name = "PATH")]
    file: PathBuf,

    /// Route to look for
    #[arg(short, long, env = "STM_ROUTE", default_value = "55")]
    route: String,

    /// Stop to look for (matches stop ids containing it)
    #[arg(short, long, env = "STM_STOP", default_value = "52103")]
    stop: String,

    /// Number of departures to keep
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Visit every entity instead of stopping once the next departures settle
    #[arg(long)]
    exhaustive: bool,

    /// Spread in seconds under which a full result ends the scan early
    #[arg(long, default_value_t = DEFAULT_EARLY_EXIT_TOLERANCE)]
    tolerance_secs: i64,

    /// Reference time in POSIX seconds instead of the system clock
    #[arg(long)]
    now: Option<i64>,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Write the output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Cache file holding the last good board
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Oldest cached board, in seconds, served when the snapshot is unusable
    #[arg(long, default_value = "900")]
    max_staleness_secs: i64,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Departure board as JSON
    Json,
    /// Departure board as human-readable lines
    Text,
    /// Feed header freshness as JSON
    Status,
}

/// On-disk cache layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    entry: CacheEntry,
    /// blake3 of the snapshot the entry was computed from
    snapshot_digest: Option<String>,
}

impl CacheFile {
    /// Load a cache file; a missing or unreadable file is no cache at all
    fn load(path: &Path) -> Option<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No cache file at {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("Failed to read cache file {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("Ignoring malformed cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn store(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to encode cache file")?;
        write_file(path, &json)
    }
}

/// Short content digest of a snapshot
fn snapshot_digest(snapshot: &Snapshot) -> String {
    blake3::hash(snapshot.as_bytes()).to_hex().to_string()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let query = Query::new(&cli.route, &cli.stop)?;
    let now = cli.now.unwrap_or_else(|| SystemClock.now_unix());
    let snapshot = load_snapshot(&cli.file);

    let rendered = match cli.format {
        OutputFormat::Status => render_status(snapshot.as_ref(), now)?,
        OutputFormat::Json | OutputFormat::Text => {
            let board = run_board(&cli, &query, snapshot.as_ref(), now)?;
            match cli.format {
                OutputFormat::Text => render_text(&board),
                _ => serde_json::to_string_pretty(&board).context("Failed to encode board")?,
            }
        }
    };

    match cli.output {
        Some(ref path) => {
            write_file(path, &rendered)?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", rendered).context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

/// Read the snapshot; any failure means the feed is unavailable this poll
fn load_snapshot(file: &Path) -> Option<Snapshot> {
    let data = if file.as_os_str() != "-" {
        trace!("Reading {}", file.display());
        match fs::read(file) {
            Ok(data) => data,
            Err(e) => {
                warn!("Snapshot unavailable: {}: {}", file.display(), e);
                return None;
            }
        }
    } else {
        let mut data = Vec::new();
        if let Err(e) = io::stdin().lock().read_to_end(&mut data) {
            warn!("Snapshot unavailable: stdin: {}", e);
            return None;
        }
        data
    };

    debug!("Read {} byte snapshot", data.len());
    Some(Snapshot::from(data))
}

/// Scan the snapshot and reconcile the result with the cache file
fn run_board(
    cli: &Cli,
    query: &Query,
    snapshot: Option<&Snapshot>,
    now: i64,
) -> Result<DepartureBoard> {
    let mut config = ScanConfig::new()
        .limit(cli.limit)
        .early_exit_tolerance(cli.tolerance_secs);
    if cli.exhaustive {
        config = config.exhaustive();
    }
    let scanner = Scanner::with_config(config);

    let mut stats = ScanStats::default();
    let fresh = next_departures_with(snapshot, query, &scanner, now, &mut stats);
    info!(
        "Scanned {} entities ({} trip updates, {} stop times, {} candidates, {} corrupt)",
        stats.entities,
        stats.trip_updates,
        stats.stop_time_updates,
        stats.candidates,
        stats.corrupt_entities
    );

    let Some(ref cache_path) = cli.cache else {
        return Ok(fresh);
    };

    let cached = CacheFile::load(cache_path);
    let served = serve_with_cache(
        fresh,
        cached.as_ref().map(|c| &c.entry),
        now,
        cli.max_staleness_secs,
    );

    if served.source == BoardSource::Fresh {
        if let (Some(entry), Some(snapshot)) = (served.cache.clone(), snapshot) {
            let digest = snapshot_digest(snapshot);
            let previous = cached.as_ref().and_then(|c| c.snapshot_digest.as_deref());
            if previous == Some(digest.as_str()) {
                info!("Upstream snapshot unchanged since the cached board");
            }

            CacheFile {
                entry,
                snapshot_digest: Some(digest),
            }
            .store(cache_path)?;
            debug!("Updated cache {}", cache_path.display());
        }
    }

    Ok(served.board)
}

/// Feed freshness document for the dashboard's status widget
fn render_status(snapshot: Option<&Snapshot>, now: i64) -> Result<String> {
    let Some(snapshot) = snapshot else {
        bail!("No snapshot available to read a header from");
    };

    let header = parse_header(snapshot.as_bytes()).context("Failed to read feed header")?;
    let status = FeedStatus::from_header(&header, now);
    serde_json::to_string_pretty(&status).context("Failed to encode status")
}

/// Human-readable board
fn render_text(board: &DepartureBoard) -> String {
    let mut out = format!("Route {} at stop {}\n", board.route_id, board.stop_id);

    if board.departures.is_empty() {
        out.push_str(&format!("  {}\n", board.message));
    }

    for departure in &board.departures {
        let clock = DateTime::from_timestamp(departure.unix_timestamp, 0)
            .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        out.push_str(&format!(
            "  {}  in {} min\n",
            clock, departure.minutes_from_now
        ));
    }

    let mut footer = format!("{} match", board.filter_used);
    if let Some(age) = board.feed_age_seconds {
        footer.push_str(&format!(", feed {}s old", age));
    }
    if !board.departures.is_empty() && board.message != MESSAGE_OK {
        footer.push_str(&format!(", {}", board.message));
    }
    out.push_str(&format!("({})", footer));

    out
}

/// Write a file, creating parent directories as needed
fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content).with_context(|| format!("Failed to write file: {}", path.display()))
}
