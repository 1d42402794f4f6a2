// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Queue and background drain thread for one file target.
//!
//! Producers push rendered lines into a bounded channel; a single named
//! thread owns the write side of the [`FileWriter`]. When the channel is full
//! producers block until the drain thread catches up.
//!
//! Shutdown seals the queue by dropping the shared sender. The drain thread
//! finishes once every in-flight sender is gone and the channel is empty.
//! Anything enqueued after sealing is written synchronously instead.

use crate::options::FileTargetOptions;
use crate::rolling::RollingInterval;
use crate::writer::{FileWriter, WriterLimits};
use arc_swap::ArcSwapOption;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendError, Sender};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default number of queued messages before producers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default grace period for the drain thread on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages written per writer lock acquisition.
const MAX_BATCH: usize = 64;

/// Sentinel for "flush only when the queue is empty".
const NO_FLUSH_INTERVAL: u64 = u64::MAX;

/// Queue sizing and shutdown grace period.
#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    pub capacity: usize,
    pub shutdown_timeout: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Identity of the writer currently installed.
struct ActiveTarget {
    path: PathBuf,
    interval: RollingInterval,
    utc: bool,
    limits: Arc<WriterLimits>,
}

impl ActiveTarget {
    fn matches(&self, path: &Path, options: &FileTargetOptions) -> bool {
        self.path == path
            && self.interval == options.roll_interval
            && self.utc == options.use_utc_intervals
    }
}

/// Drain thread handle plus its completion signal.
struct Worker {
    handle: JoinHandle<()>,
    /// Disconnects when the drain loop returns.
    done: Receiver<()>,
}

/// Asynchronous writer for one file target.
pub struct LogProcessor {
    name: String,
    sender: ArcSwapOption<Sender<String>>,
    writer: Arc<Mutex<FileWriter>>,
    active: Mutex<ActiveTarget>,
    flush_interval_ms: Arc<AtomicU64>,
    worker: Mutex<Option<Worker>>,
    shutdown_timeout: Duration,
}

impl LogProcessor {
    /// Start a processor with default queue settings.
    pub fn new(name: impl Into<String>, options: &FileTargetOptions) -> crate::Result<Self> {
        Self::with_settings(name, options, QueueSettings::default())
    }

    /// Start a processor and its drain thread.
    pub fn with_settings(
        name: impl Into<String>,
        options: &FileTargetOptions,
        settings: QueueSettings,
    ) -> crate::Result<Self> {
        let name = name.into();
        let path = options.expanded_path();
        let writer = build_writer(path.clone(), options);
        let active = ActiveTarget {
            path,
            interval: options.roll_interval,
            utc: options.use_utc_intervals,
            limits: writer.limits(),
        };

        let writer = Arc::new(Mutex::new(writer));
        let flush_interval_ms = Arc::new(AtomicU64::new(encode_interval(options)));

        let (tx, rx) = channel::bounded(settings.capacity.max(1));
        let (done_tx, done_rx) = channel::bounded::<()>(0);

        let drain = DrainLoop {
            rx,
            writer: Arc::clone(&writer),
            flush_interval_ms: Arc::clone(&flush_interval_ms),
            _done: done_tx,
        };

        let handle = thread::Builder::new()
            .name(format!("filesink-{}", name))
            .spawn(move || drain.run())?;

        tracing::debug!(
            target_name = %name,
            path = %active.path.display(),
            capacity = settings.capacity,
            "Started log processor"
        );

        Ok(Self {
            name,
            sender: ArcSwapOption::from_pointee(tx),
            writer,
            active: Mutex::new(active),
            flush_interval_ms,
            worker: Mutex::new(Some(Worker {
                handle,
                done: done_rx,
            })),
            shutdown_timeout: settings.shutdown_timeout,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a rendered message.
    ///
    /// Blocks while the queue is full. After shutdown the message is written
    /// synchronously; failures are traced and dropped.
    pub fn enqueue(&self, message: String) {
        let message = match self.sender.load_full() {
            Some(sender) => match sender.send(message) {
                Ok(()) => return,
                Err(SendError(message)) => message,
            },
            None => message,
        };

        self.write_direct(&message);
    }

    fn write_direct(&self, message: &str) {
        let Some(mut writer) = self.writer.try_lock_for(self.shutdown_timeout) else {
            tracing::warn!(target_name = %self.name, "Writer busy, dropping message");
            return;
        };

        if let Err(e) = writer.write_message(message, true) {
            tracing::warn!(
                target_name = %self.name,
                "Failed to write log message: {}",
                e
            );
        }
    }

    /// Apply new options.
    ///
    /// A changed path, interval or time base installs a new writer and closes
    /// the old one once its in-flight batch is done. Anything else only
    /// updates the current writer's limits.
    pub fn reconfigure(&self, options: &FileTargetOptions) {
        if self.is_shutdown() {
            tracing::debug!(target_name = %self.name, "Ignoring reconfigure after shutdown");
            return;
        }

        let mut active = self.active.lock();
        self.flush_interval_ms
            .store(encode_interval(options), Ordering::Relaxed);

        let path = options.expanded_path();
        if active.matches(&path, options) {
            active.limits.set_limits(
                options.max_file_size_bytes,
                options.max_generations,
                options.flush_to_disk,
            );
            tracing::debug!(
                target_name = %self.name,
                max_size = options.max_file_size_bytes,
                max_generations = options.max_generations,
                "Updated writer limits"
            );
            return;
        }

        let replacement = build_writer(path.clone(), options);
        let limits = replacement.limits();
        let mut previous = std::mem::replace(&mut *self.writer.lock(), replacement);
        previous.close();

        tracing::info!(
            target_name = %self.name,
            from = %active.path.display(),
            to = %path.display(),
            "Switched log file target"
        );

        *active = ActiveTarget {
            path,
            interval: options.roll_interval,
            utc: options.use_utc_intervals,
            limits,
        };
    }

    /// Limits of the writer currently installed.
    pub fn limits(&self) -> Arc<WriterLimits> {
        Arc::clone(&self.active.lock().limits)
    }

    /// File the installed writer currently targets.
    pub fn current_file(&self) -> PathBuf {
        self.writer.lock().current_file().to_path_buf()
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender.load().is_none()
    }

    /// Seal the queue, wait for the drain thread, then close the writer.
    ///
    /// Waits at most the configured grace period; messages still queued after
    /// that are dropped. Calling it again is a no-op.
    pub fn shutdown(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        self.sender.store(None);

        match worker.done.recv_timeout(self.shutdown_timeout) {
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    target_name = %self.name,
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "Drain thread did not finish in time, dropping queued messages"
                );
            }
            _ => {
                if worker.handle.join().is_err() {
                    tracing::warn!(target_name = %self.name, "Drain thread panicked");
                }
            }
        }

        match self.writer.try_lock_for(self.shutdown_timeout) {
            Some(mut writer) => writer.close(),
            None => tracing::warn!(target_name = %self.name, "Unable to close busy writer"),
        }

        tracing::debug!(target_name = %self.name, "Log processor stopped");
    }
}

impl Drop for LogProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_writer(path: PathBuf, options: &FileTargetOptions) -> FileWriter {
    FileWriter::new(
        path,
        options.max_file_size_bytes,
        options.max_generations,
        options.append,
        options.roll_interval,
        options.flush_to_disk,
        options.use_utc_intervals,
    )
}

fn encode_interval(options: &FileTargetOptions) -> u64 {
    options.max_flush_interval_ms.unwrap_or(NO_FLUSH_INTERVAL)
}

/// State moved into the drain thread.
struct DrainLoop {
    rx: Receiver<String>,
    writer: Arc<Mutex<FileWriter>>,
    flush_interval_ms: Arc<AtomicU64>,
    _done: Sender<()>,
}

impl DrainLoop {
    fn run(self) {
        let mut last_flush = Instant::now();

        while let Ok(first) = self.rx.recv() {
            let mut writer = self.writer.lock();
            let mut next = Some(first);
            let mut batch = 0;

            while let Some(message) = next.take() {
                batch += 1;
                if batch < MAX_BATCH {
                    next = self.rx.try_recv().ok();
                }

                let idle = next.is_none() && self.rx.is_empty();
                let flush = idle || self.flush_due(last_flush);

                if let Err(e) = writer.write_message(&message, flush) {
                    tracing::warn!(
                        path = %writer.current_file().display(),
                        "Failed to write log message: {}",
                        e
                    );
                }

                if flush {
                    last_flush = Instant::now();
                }
            }
        }
    }

    fn flush_due(&self, last_flush: Instant) -> bool {
        match self.flush_interval_ms.load(Ordering::Relaxed) {
            NO_FLUSH_INTERVAL => false,
            ms => last_flush.elapsed() >= Duration::from_millis(ms),
        }
    }
}
