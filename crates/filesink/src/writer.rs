// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rotating file writer.
//!
//! A [`FileWriter`] is driven by a single thread (the processor's drain
//! thread). The only cross-thread entry point is [`WriterLimits`], obtained
//! with [`FileWriter::limits`], which can be changed while writes are in
//! flight.

use crate::counting::CountingWriter;
use crate::rolling::{RollingInterval, RollingNamePolicy};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Limits shared between the writing thread and configuration threads.
///
/// The size limit is a soft limit read without locking. The retention count
/// lives behind a lock taken only during rotation and cleanup.
#[derive(Debug)]
pub struct WriterLimits {
    max_size: AtomicU64,
    flush_to_disk: AtomicBool,
    recheck_retention: AtomicBool,
    retention: Mutex<u32>,
}

impl WriterLimits {
    pub fn new(max_size: u64, max_generations: u32, flush_to_disk: bool) -> Self {
        Self {
            max_size: AtomicU64::new(max_size),
            flush_to_disk: AtomicBool::new(flush_to_disk),
            recheck_retention: AtomicBool::new(false),
            retention: Mutex::new(max_generations),
        }
    }

    /// Change the limits. Safe to call from any thread.
    ///
    /// Retention is re-evaluated before the next write.
    pub fn set_limits(&self, max_size: u64, max_generations: u32, flush_to_disk: bool) {
        let mut retention = self.retention.lock();
        *retention = max_generations;
        self.max_size.store(max_size, Ordering::Relaxed);
        self.flush_to_disk.store(flush_to_disk, Ordering::Relaxed);
        self.recheck_retention.store(true, Ordering::Release);
    }

    /// Size limit in bytes, 0 when size rotation is disabled.
    pub fn max_size(&self) -> u64 {
        self.max_size.load(Ordering::Relaxed)
    }

    /// Retention count.
    pub fn max_generations(&self) -> u32 {
        *self.retention.lock()
    }

    pub fn flush_to_disk(&self) -> bool {
        self.flush_to_disk.load(Ordering::Relaxed)
    }
}

/// Writes messages to the current rolling file.
pub struct FileWriter {
    path: PathBuf,
    interval: RollingInterval,
    append: bool,
    policy: RollingNamePolicy,
    out: Option<CountingWriter<BufWriter<File>>>,
    opened: bool,
    closed: bool,
    limits: Arc<WriterLimits>,
}

impl FileWriter {
    /// Create a writer for `path`. Nothing is opened until the first write.
    pub fn new(
        path: impl Into<PathBuf>,
        max_size: u64,
        max_generations: u32,
        append: bool,
        interval: RollingInterval,
        flush_to_disk: bool,
        utc: bool,
    ) -> Self {
        let path = path.into();
        let policy = RollingNamePolicy::new(&path, interval, utc);
        Self {
            path,
            interval,
            append,
            policy,
            out: None,
            opened: false,
            closed: false,
            limits: Arc::new(WriterLimits::new(max_size, max_generations, flush_to_disk)),
        }
    }

    /// Configured path template.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn interval(&self) -> RollingInterval {
        self.interval
    }

    /// File currently written (or about to be).
    pub fn current_file(&self) -> &Path {
        self.policy.current_file()
    }

    /// Handle for changing limits from another thread.
    pub fn limits(&self) -> Arc<WriterLimits> {
        Arc::clone(&self.limits)
    }

    /// Convenience for [`WriterLimits::set_limits`].
    pub fn set_limits(&self, max_size: u64, max_generations: u32, flush_to_disk: bool) {
        self.limits.set_limits(max_size, max_generations, flush_to_disk);
    }

    /// Tracked size of the current file.
    pub fn current_size(&self) -> u64 {
        self.out.as_ref().map(CountingWriter::len).unwrap_or(0)
    }

    /// Write one message followed by a newline.
    ///
    /// Rotation is checked before the write, never during it. A closed
    /// writer drops the message.
    pub fn write_message(&mut self, message: &str, flush: bool) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }

        self.ensure_open()?;
        self.rotate_if_needed()?;

        if self.limits.recheck_retention.swap(false, Ordering::Acquire) {
            self.remove_extra_files();
        }

        let out = match self.out.as_mut() {
            Some(out) => out,
            None => return Ok(()),
        };
        out.write_all(message.as_bytes())?;
        out.write_all(b"\n")?;

        if flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush buffered output; fsync when `flush_to_disk` is set.
    pub fn flush(&mut self) -> io::Result<()> {
        match self.out.as_mut() {
            Some(out) if self.limits.flush_to_disk() => out.sync(),
            Some(out) => out.flush(),
            None => Ok(()),
        }
    }

    /// Flush and close the file. Later writes are dropped.
    pub fn close(&mut self) {
        self.closed = true;
        self.close_file();
    }

    fn close_file(&mut self) {
        if let Some(mut out) = self.out.take() {
            if let Err(e) = out.flush() {
                tracing::warn!(
                    path = %self.policy.current_file().display(),
                    "Failed to flush log file on close: {}",
                    e
                );
            }
        }
    }

    fn ensure_open(&mut self) -> io::Result<()> {
        if self.out.is_some() {
            return Ok(());
        }

        if !self.opened {
            // Resume numbering after a restart.
            if self.limits.max_size() > 0 {
                self.policy.align_to_directory();
            }
            self.opened = true;
            self.open_file(self.append)
        } else {
            // Previous open failed; reopen the same file.
            self.open_file(true)
        }
    }

    fn open_file(&mut self, append: bool) -> io::Result<()> {
        let path = self.policy.current_file().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        self.out = Some(CountingWriter::open(file, append)?);

        tracing::debug!(path = %path.display(), append, "Opened log file");
        Ok(())
    }

    fn rotate_if_needed(&mut self) -> io::Result<()> {
        let max_size = self.limits.max_size();
        let size_exceeded = max_size > 0 && self.current_size() > max_size;

        if !size_exceeded && !self.policy.should_date_roll() {
            return Ok(());
        }

        self.close_file();

        let max_sequence = match self.interval {
            RollingInterval::Infinite => Some(self.limits.max_generations().max(1)),
            _ => None,
        };
        self.policy.roll(size_exceeded, max_sequence);

        tracing::debug!(
            path = %self.policy.current_file().display(),
            size_exceeded,
            "Rotated log file"
        );

        self.open_file(false)?;
        self.remove_extra_files();
        Ok(())
    }

    /// Delete the oldest files beyond the retention count.
    ///
    /// The current file is never a candidate. Failed deletes are retried on
    /// the next rotation.
    fn remove_extra_files(&mut self) {
        let retention = self.limits.retention.lock();
        let keep = (*retention).max(1) as usize;

        let files = self.policy.matching_files_by_oldest();
        let excess = files.len().saturating_sub(keep);
        if excess == 0 {
            return;
        }

        let current = self.policy.current_file().file_name().map(|n| n.to_os_string());
        let candidates = files
            .iter()
            .filter(|p| p.file_name().map(|n| n.to_os_string()) != current)
            .take(excess);

        for file in candidates {
            match fs::remove_file(file) {
                Ok(()) => tracing::debug!(path = %file.display(), "Removed old log file"),
                Err(e) => tracing::warn!(
                    path = %file.display(),
                    "Unable to remove old log file: {}",
                    e
                ),
            }
        }
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        self.close_file();
    }
}
