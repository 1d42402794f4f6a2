// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Size-tracking writer.
//!
//! Asking the file for its length costs a syscall; the rotation check runs
//! before every write, so the length is tracked here instead. Not suitable
//! for random seeking: any seek resets the tracked length to the new position.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

/// Writer decorator counting accepted bytes.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    len: u64,
}

impl<W> CountingWriter<W> {
    /// Wrap `inner`, whose current length is `initial_len`.
    pub fn new(inner: W, initial_len: u64) -> Self {
        Self {
            inner,
            len: initial_len,
        }
    }

    /// Tracked length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.len += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Seek> Seek for CountingWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let position = self.inner.seek(pos)?;
        self.len = position;
        Ok(position)
    }
}

impl CountingWriter<BufWriter<File>> {
    /// Open over `file`, either positioned at its end or truncated.
    pub fn open(file: File, append: bool) -> io::Result<Self> {
        let mut writer = Self::new(BufWriter::new(file), 0);
        if append {
            writer.seek(SeekFrom::End(0))?;
        } else {
            writer.truncate(0)?;
        }
        Ok(writer)
    }

    /// Truncate the underlying file to `len` and move to its end.
    pub fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.inner.flush()?;
        self.inner.get_ref().set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }

    /// Flush buffered bytes and ask the OS to persist the file data.
    pub fn sync(&mut self) -> io::Result<()> {
        self.inner.flush()?;
        self.inner.get_ref().sync_data()
    }
}
