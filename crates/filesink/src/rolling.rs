// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rolling file naming.
//!
//! File names follow `<base>[_<stamp>][_<NNN>]<ext>`:
//!
//! - `stamp` is the start of the current interval bucket (`yyyy`, `yyyyMM`,
//!   `yyyyMMdd`, `yyyyMMddHH` or `yyyyMMddHHmm`), omitted for
//!   [`RollingInterval::Infinite`].
//! - `NNN` is the sequence number zero-padded to three digits, omitted when 0.
//!
//! The policy is pure naming state; it never opens files. It only touches the
//! file system to list the directory ([`RollingNamePolicy::align_to_directory`]
//! and [`RollingNamePolicy::matching_files_by_oldest`]).

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const SEPARATOR: char = '_';

/// How often the log file rolls over to a new time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RollingInterval {
    /// Never roll on time; no stamp in the file name.
    #[default]
    Infinite,
    /// Roll every year (`yyyy`).
    Year,
    /// Roll every calendar month (`yyyyMM`).
    Month,
    /// Roll every day (`yyyyMMdd`).
    Day,
    /// Roll every hour (`yyyyMMddHH`).
    Hour,
    /// Roll every minute (`yyyyMMddHHmm`).
    Minute,
}

impl RollingInterval {
    /// chrono format string for the file name stamp.
    pub fn stamp_format(&self) -> Option<&'static str> {
        match self {
            Self::Infinite => None,
            Self::Year => Some("%Y"),
            Self::Month => Some("%Y%m"),
            Self::Day => Some("%Y%m%d"),
            Self::Hour => Some("%Y%m%d%H"),
            Self::Minute => Some("%Y%m%d%H%M"),
        }
    }

    /// Number of digits in the stamp.
    fn stamp_len(&self) -> usize {
        match self {
            Self::Infinite => 0,
            Self::Year => 4,
            Self::Month => 6,
            Self::Day => 8,
            Self::Hour => 10,
            Self::Minute => 12,
        }
    }

    /// Start of the bucket containing `dt`, `None` for `Infinite`.
    pub fn truncate(&self, dt: NaiveDateTime) -> Option<NaiveDateTime> {
        let start = match self {
            Self::Infinite => return None,
            Self::Year => bucket(dt.year(), 1, 1, 0, 0),
            Self::Month => bucket(dt.year(), dt.month(), 1, 0, 0),
            Self::Day => bucket(dt.year(), dt.month(), dt.day(), 0, 0),
            Self::Hour => bucket(dt.year(), dt.month(), dt.day(), dt.hour(), 0),
            Self::Minute => bucket(dt.year(), dt.month(), dt.day(), dt.hour(), dt.minute()),
        };
        Some(start.unwrap_or(dt))
    }

    /// Render a bucket start as a file name stamp.
    pub fn format(&self, boundary: Option<NaiveDateTime>) -> Option<String> {
        match (self.stamp_format(), boundary) {
            (Some(fmt), Some(dt)) => Some(dt.format(fmt).to_string()),
            _ => None,
        }
    }
}

fn bucket(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

/// Parsed suffix of a file belonging to the rolling family.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FamilyName {
    stamp: Option<String>,
    sequence: u32,
}

/// Naming state for one rolling file target.
#[derive(Debug, Clone)]
pub struct RollingNamePolicy {
    /// Template path without its extension.
    base: PathBuf,
    /// Extension including the leading dot, possibly empty.
    extension: String,
    interval: RollingInterval,
    utc: bool,
    boundary: Option<NaiveDateTime>,
    sequence: u32,
    current: PathBuf,
}

impl RollingNamePolicy {
    /// Create a policy for `template` (e.g. `logs/log.txt`).
    ///
    /// `utc` selects whether interval buckets are computed in UTC or local time.
    pub fn new(template: impl AsRef<Path>, interval: RollingInterval, utc: bool) -> Self {
        let now = current_time(utc);
        Self::new_at(template.as_ref(), interval, utc, now)
    }

    fn new_at(template: &Path, interval: RollingInterval, utc: bool, now: NaiveDateTime) -> Self {
        let extension = template
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let base = template.with_extension("");
        let boundary = interval.truncate(now);

        let mut policy = Self {
            base,
            extension,
            interval,
            utc,
            boundary,
            sequence: 0,
            current: PathBuf::new(),
        };
        policy.current = policy.file_name(policy.boundary, 0);
        policy
    }

    /// Path of the file that should currently be written.
    pub fn current_file(&self) -> &Path {
        &self.current
    }

    /// Current sequence number.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Rolling interval.
    pub fn interval(&self) -> RollingInterval {
        self.interval
    }

    /// True when the clock has moved into a different interval bucket.
    pub fn should_date_roll(&self) -> bool {
        self.should_date_roll_at(self.now())
    }

    fn should_date_roll_at(&self, now: NaiveDateTime) -> bool {
        self.interval.truncate(now) != self.boundary
    }

    /// Advance to the next file name.
    ///
    /// A bucket change resets the sequence to 0. Otherwise the sequence is
    /// incremented when `roll_sequence` is set, wrapping back to 0 once it
    /// would reach `max_sequence`.
    pub fn roll(&mut self, roll_sequence: bool, max_sequence: Option<u32>) -> &Path {
        let now = self.now();
        self.roll_at(now, roll_sequence, max_sequence)
    }

    fn roll_at(
        &mut self,
        now: NaiveDateTime,
        roll_sequence: bool,
        max_sequence: Option<u32>,
    ) -> &Path {
        let boundary = self.interval.truncate(now);
        if boundary != self.boundary {
            self.boundary = boundary;
            self.sequence = 0;
        } else if roll_sequence {
            self.sequence = self.sequence.saturating_add(1);
            if let Some(max) = max_sequence {
                if self.sequence > max.saturating_sub(1) {
                    self.sequence = 0;
                }
            }
        }

        self.current = self.file_name(self.boundary, self.sequence);
        &self.current
    }

    /// Resume numbering from the files already present in the directory.
    ///
    /// Only files stamped with the current bucket are considered. The one with
    /// the highest sequence wins; modification time breaks ties between equal
    /// sequences. Returns `true` when numbering resumed from an existing file,
    /// `false` when starting fresh at sequence 0.
    pub fn align_to_directory(&mut self) -> bool {
        let current_stamp = self.interval.format(self.boundary);

        let best = self
            .family_files()
            .into_iter()
            .filter(|(_, family, _)| family.stamp == current_stamp)
            .max_by(|a, b| a.1.sequence.cmp(&b.1.sequence).then(a.2.cmp(&b.2)));

        self.sequence = best.as_ref().map(|(_, family, _)| family.sequence).unwrap_or(0);
        self.current = self.file_name(self.boundary, self.sequence);

        if let Some((path, _, _)) = best {
            tracing::debug!(
                resumed = %path.display(),
                sequence = self.sequence,
                "Aligned rolling file to directory"
            );
            true
        } else {
            false
        }
    }

    /// All files of this family, oldest first.
    ///
    /// Ordered by modification time, then by name so equal timestamps stay
    /// deterministic.
    pub fn matching_files_by_oldest(&self) -> Vec<PathBuf> {
        let mut files: Vec<(PathBuf, Option<SystemTime>)> = self
            .family_files()
            .into_iter()
            .map(|(path, _, modified)| (path, modified))
            .collect();

        files.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        files.into_iter().map(|(path, _)| path).collect()
    }

    /// Directory holding the family.
    pub fn directory(&self) -> PathBuf {
        match self.base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn now(&self) -> NaiveDateTime {
        current_time(self.utc)
    }

    fn file_name(&self, boundary: Option<NaiveDateTime>, sequence: u32) -> PathBuf {
        let mut name = OsString::from(self.base.as_os_str());

        if let Some(stamp) = self.interval.format(boundary) {
            name.push(format!("{}{}", SEPARATOR, stamp));
        }
        if sequence > 0 {
            name.push(format!("{}{:03}", SEPARATOR, sequence));
        }
        name.push(&self.extension);

        PathBuf::from(name)
    }

    fn family_files(&self) -> Vec<(PathBuf, FamilyName, Option<SystemTime>)> {
        let dir = self.directory();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let family = self.parse_family_name(name.to_str()?)?;
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() {
                    return None;
                }
                Some((dir.join(&name), family, metadata.modified().ok()))
            })
            .collect()
    }

    /// Parse `name` as `<base>[_<stamp>][_<seq>]<ext>` for this interval.
    fn parse_family_name(&self, name: &str) -> Option<FamilyName> {
        let base = self.base.file_name()?.to_str()?;
        if name.len() < base.len() + self.extension.len()
            || !name.starts_with(base)
            || !name.ends_with(self.extension.as_str())
        {
            return None;
        }

        let rest = &name[base.len()..name.len() - self.extension.len()];
        let mut parts = rest.split(SEPARATOR);

        // Anything directly after the base (e.g. `log2.txt`) is another family.
        if !parts.next()?.is_empty() {
            return None;
        }

        let stamp = match self.interval.stamp_len() {
            0 => None,
            len => {
                let stamp = parts.next()?;
                if stamp.len() != len || !is_digits(stamp) {
                    return None;
                }
                Some(stamp.to_string())
            }
        };

        let sequence = match parts.next() {
            None => 0,
            Some(seq) if is_digits(seq) => seq.parse().ok()?,
            Some(_) => return None,
        };

        if parts.next().is_some() {
            return None;
        }

        Some(FamilyName { stamp, sequence })
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn current_time(utc: bool) -> NaiveDateTime {
    if utc {
        Utc::now().naive_utc()
    } else {
        Local::now().naive_local()
    }
}
