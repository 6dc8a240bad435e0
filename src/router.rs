// SPDX-License-Identifier: Apache-2.0 OR MIT
// Sink routing - which sinks receive an entry, per mode and thresholds

/// Emission mode. Normal flushing uses the `log` member of each threshold
/// pair, the crash dump uses `crash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Crash,
}

/// Threshold pair for one sink. A sink receives an entry when the active
/// threshold is at least the entry level; a negative threshold disables the
/// sink in that mode unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkLevels {
    pub log: i32,
    pub crash: i32,
}

impl SinkLevels {
    pub const fn new(log: i32, crash: i32) -> Self {
        Self { log, crash }
    }

    /// Threshold pair that never emits.
    pub const fn disabled() -> Self {
        Self { log: -1, crash: -1 }
    }

    /// Threshold pair that always emits (levels are non-negative).
    pub const fn unfiltered() -> Self {
        Self {
            log: i32::MAX,
            crash: i32::MAX,
        }
    }

    pub fn threshold(&self, mode: Mode) -> i32 {
        match mode {
            Mode::Normal => self.log,
            Mode::Crash => self.crash,
        }
    }

    pub fn accepts(&self, mode: Mode, level: i32) -> bool {
        let t = self.threshold(mode);
        t >= 0 && t >= level
    }
}

/// Threshold pairs for all four sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkThresholds {
    pub file: SinkLevels,
    pub syslog: SinkLevels,
    pub stderr: SinkLevels,
    pub graylog: SinkLevels,
}

impl Default for SinkThresholds {
    fn default() -> Self {
        Self {
            file: SinkLevels::unfiltered(),
            syslog: SinkLevels::new(-2, -2),
            stderr: SinkLevels::new(1, -1),
            graylog: SinkLevels::new(-3, -3),
        }
    }
}

/// The routing decision for one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Route {
    pub file: bool,
    pub syslog: bool,
    pub stderr: bool,
    pub graylog: bool,
}

impl Route {
    /// Does any line-oriented sink want the entry formatted?
    pub fn wants_line(&self) -> bool {
        self.file || self.syslog || self.stderr
    }
}

/// Decide which sinks receive an entry.
///
/// In normal mode the subsystem's log level gates everything; the crash dump
/// bypasses it and is governed solely by the per-sink crash thresholds.
pub fn route(level: i32, subsys_log_level: i32, t: &SinkThresholds, mode: Mode) -> Route {
    let should_log = mode == Mode::Crash || subsys_log_level >= level;
    if !should_log {
        return Route::default();
    }
    Route {
        file: t.file.accepts(mode, level),
        syslog: t.syslog.accepts(mode, level),
        stderr: t.stderr.accepts(mode, level),
        graylog: t.graylog.accepts(mode, level),
    }
}
