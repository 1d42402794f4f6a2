// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rolling File Log Sink CLI
//!
//! Tee standard input into rotating log files.
//!
//! # Usage
//!
//! ```bash
//! # Append stdin to logs/app.log, rotating at 10 MB and keeping 5 files
//! my-service | filesink --output logs/app.log --rotate 10M --keep 5
//!
//! # One JSON file per day
//! my-service | filesink --output logs/app.json --format json --interval day
//!
//! # Several filtered targets from a configuration file
//! my-service | filesink --config filesink.json
//! ```
//!
//! Lines starting with a level tag (`warn: ...`, `error: ...`) are logged at
//! that level; other lines use `--line-level`.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use crossbeam::channel::{self, Receiver};
use filesink::{
    CompositeFileLoggerProvider, FileTargetOptions, FilterConfig, LogLevel, LogRecord, Logger,
    RollingInterval, SinkConfig, TargetConfig, JSON, SIMPLE,
};
use std::io::BufRead;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "filesink")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rolling file log sink - tee stdin into rotating, filtered log files")]
#[command(long_about = None)]
struct Cli {
    /// JSON configuration file (targets and filter rules)
    #[arg(short, long, conflicts_with = "output")]
    config: Option<PathBuf>,

    /// Output file path template
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rotate when the file exceeds this size (e.g., 10M, 100K, 1G)
    #[arg(long)]
    rotate: Option<String>,

    /// Maximum number of files to keep
    #[arg(long, default_value = "7")]
    keep: u32,

    /// Time-based rotation
    #[arg(long, value_enum, default_value = "infinite")]
    interval: IntervalArg,

    /// Output format
    #[arg(short, long, value_enum, default_value = "simple")]
    format: FormatArg,

    /// Minimum level written
    #[arg(short, long, value_enum, default_value = "info")]
    level: LevelArg,

    /// Level of lines without a level tag
    #[arg(long, value_enum, default_value = "info")]
    line_level: LevelArg,

    /// Category attached to every line
    #[arg(long, default_value = "stdin")]
    category: String,

    /// Truncate the output file instead of appending
    #[arg(long)]
    truncate: bool,

    /// Verbose mode (show internal logs)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Simple,
    Json,
}

impl FormatArg {
    fn name(self) -> &'static str {
        match self {
            FormatArg::Simple => SIMPLE,
            FormatArg::Json => JSON,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IntervalArg {
    Infinite,
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl From<IntervalArg> for RollingInterval {
    fn from(arg: IntervalArg) -> Self {
        match arg {
            IntervalArg::Infinite => RollingInterval::Infinite,
            IntervalArg::Year => RollingInterval::Year,
            IntervalArg::Month => RollingInterval::Month,
            IntervalArg::Day => RollingInterval::Day,
            IntervalArg::Hour => RollingInterval::Hour,
            IntervalArg::Minute => RollingInterval::Minute,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelArg {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl From<LevelArg> for LogLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Trace => LogLevel::Trace,
            LevelArg::Debug => LogLevel::Debug,
            LevelArg::Info => LogLevel::Information,
            LevelArg::Warn => LogLevel::Warning,
            LevelArg::Error => LogLevel::Error,
            LevelArg::Critical => LogLevel::Critical,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing for internal logs
    let filter = if cli.verbose {
        EnvFilter::new("filesink=debug")
    } else {
        EnvFilter::new("filesink=info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&cli)?;

    tracing::info!(
        targets = config.targets.len(),
        level = ?cli.level,
        "Starting filesink"
    );

    let provider =
        CompositeFileLoggerProvider::from_config(&config).context("Failed to start log targets")?;
    let logger = provider.create_logger(&cli.category);

    let (stop_tx, stop_rx) = channel::bounded::<()>(1);
    ctrlc_handler(stop_tx);

    let lines = spawn_stdin_reader()?;
    let default_level = LogLevel::from(cli.line_level);
    let mut written = 0u64;

    loop {
        crossbeam::select! {
            recv(lines) -> line => match line {
                Ok(line) => {
                    let record = parse_line(&cli.category, &line, default_level);
                    if logger.is_enabled(record.level) {
                        logger.log(&record);
                        written += 1;
                    }
                }
                Err(_) => break,
            },
            recv(stop_rx) -> _ => break,
        }
    }

    provider.shutdown();
    tracing::info!(lines = written, "filesink shutdown complete");

    Ok(())
}

fn build_config(cli: &Cli) -> Result<SinkConfig> {
    if let Some(ref path) = cli.config {
        return SinkConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()));
    }

    let Some(ref path) = cli.output else {
        bail!("either --config or --output is required");
    };

    let max_size = match cli.rotate.as_deref() {
        Some(size) => parse_size(size).with_context(|| format!("Invalid --rotate size: {}", size))?,
        None => 0,
    };

    let options = FileTargetOptions::new(path.to_string_lossy())
        .with_max_size(max_size)
        .max_generations(cli.keep)
        .roll_interval(cli.interval.into())
        .append(!cli.truncate)
        .formatter(cli.format.name());

    Ok(SinkConfig {
        targets: vec![TargetConfig {
            name: "main".to_string(),
            options,
        }],
        filter: FilterConfig {
            min_level: Some(cli.level.into()),
            rules: Vec::new(),
        },
    })
}

/// Parse size string like "10M", "100K", "1G". Overflowing sizes are rejected.
fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim().to_uppercase();

    let (num, unit) = if let Some(num) = s.strip_suffix('K') {
        (num, 1024)
    } else if let Some(num) = s.strip_suffix('M') {
        (num, 1024 * 1024)
    } else if let Some(num) = s.strip_suffix('G') {
        (num, 1024 * 1024 * 1024)
    } else {
        (s.as_str(), 1)
    };

    num.parse::<u64>().ok()?.checked_mul(unit)
}

/// Split an optional `level:` tag off a line.
fn parse_line(category: &str, line: &str, default_level: LogLevel) -> LogRecord {
    if let Some((tag, rest)) = line.split_once(':') {
        if let Some(level) = LogLevel::parse(tag).filter(|l| *l != LogLevel::None) {
            return LogRecord::new(level, category, rest.trim_start());
        }
    }
    LogRecord::new(default_level, category, line)
}

/// Read stdin on a dedicated thread; the channel disconnects at EOF.
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = channel::bounded(1024);
    std::thread::Builder::new()
        .name("filesink-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        })
        .context("Failed to spawn stdin reader")?;
    Ok(rx)
}

/// Setup Ctrl+C handler.
fn ctrlc_handler(stop: channel::Sender<()>) {
    let _ = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, shutting down...");
        let _ = stop.try_send(());
    });
}
