// SPDX-License-Identifier: Apache-2.0 OR MIT
// Log clock - timestamps in two granularities

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};

/// A captured log timestamp.
///
/// The granularity in effect at capture time is recorded alongside the
/// instant, so a stamp always renders the same way no matter when the
/// clock mode changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    when: DateTime<Local>,
    coarse: bool,
}

impl Timestamp {
    /// Seconds since the Unix epoch, fractional.
    pub fn unix_seconds(&self) -> f64 {
        self.when.timestamp_micros() as f64 / 1_000_000.0
    }

    /// Render the timestamp into `out`, returning the number of bytes
    /// appended.
    ///
    /// Fine stamps carry microseconds, coarse stamps milliseconds.
    pub fn append_to(&self, out: &mut Vec<u8>) -> usize {
        let rendered = if self.coarse {
            self.when.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
        } else {
            self.when.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
        };
        out.extend_from_slice(rendered.as_bytes());
        rendered.len()
    }
}

/// Clock shared by the engine and its producers.
///
/// The coarse/fine switch is a relaxed atomic: producers sample it on every
/// `now()` and a stale read only affects rendering precision.
pub struct LogClock {
    coarse: AtomicBool,
}

impl LogClock {
    pub fn new() -> Self {
        Self {
            coarse: AtomicBool::new(false),
        }
    }

    /// Switch to coarse (millisecond) timestamps.
    pub fn coarsen(&self) {
        self.coarse.store(true, Ordering::Relaxed);
    }

    /// Switch back to fine (microsecond) timestamps.
    pub fn refine(&self) {
        self.coarse.store(false, Ordering::Relaxed);
    }

    pub fn is_coarse(&self) -> bool {
        self.coarse.load(Ordering::Relaxed)
    }

    /// Capture the current time at the configured granularity.
    pub fn now(&self) -> Timestamp {
        Timestamp {
            when: Local::now(),
            coarse: self.coarse.load(Ordering::Relaxed),
        }
    }
}

impl Default for LogClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Render `stamp` into `out`, returning the number of bytes appended.
pub fn append_time(stamp: &Timestamp, out: &mut Vec<u8>) -> usize {
    stamp.append_to(out)
}
