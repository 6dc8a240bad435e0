// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging macros for convenient entry submission

/// Severity shorthand levels (RFC 5424 style, lower is more severe).
///
/// The engine itself takes plain integer levels; these constants back the
/// per-severity macros below.
pub mod level {
    /// System unusable
    pub const EMERGENCY: i32 = 0;
    /// Immediate action required
    pub const ALERT: i32 = 1;
    /// Critical conditions
    pub const CRITICAL: i32 = 2;
    /// Error conditions
    pub const ERROR: i32 = 3;
    /// Warning conditions
    pub const WARNING: i32 = 4;
    /// Significant normal condition
    pub const NOTICE: i32 = 5;
    /// Informational
    pub const INFO: i32 = 6;
    /// Debug-level messages
    pub const DEBUG: i32 = 7;
}

/// Log a formatted message through an engine.
///
/// Consults the subsystem's gather level first, so suppressed messages cost
/// neither the formatting nor the allocation.
///
/// # Examples
/// ```ignore
/// dlog!(log, 5, SUB_RELAY, "worker {} restarted", worker_id);
/// ```
#[macro_export]
macro_rules! dlog {
    ($log:expr, $level:expr, $sub:expr, $($arg:tt)+) => {{
        let log = &*$log;
        if log.subsys().should_gather($sub, $level) {
            let e = log.create_entry($level, $sub, &format!($($arg)+));
            log.submit_entry(e);
        }
    }};
}

/// Log a message with emergency severity
///
/// # Examples
/// ```ignore
/// dlog_emergency!(log, SUB_RELAY, "data plane is down");
/// ```
#[macro_export]
macro_rules! dlog_emergency {
    ($log:expr, $sub:expr, $($arg:tt)+) => {
        $crate::dlog!($log, $crate::level::EMERGENCY, $sub, $($arg)+)
    };
}

/// Log a message with alert severity
///
/// # Examples
/// ```ignore
/// dlog_alert!(log, SUB_SECURITY, "intrusion detected");
/// ```
#[macro_export]
macro_rules! dlog_alert {
    ($log:expr, $sub:expr, $($arg:tt)+) => {
        $crate::dlog!($log, $crate::level::ALERT, $sub, $($arg)+)
    };
}

/// Log a message with critical severity
///
/// # Examples
/// ```ignore
/// dlog_critical!(log, SUB_RELAY, "worker {} crashed", id);
/// ```
#[macro_export]
macro_rules! dlog_critical {
    ($log:expr, $sub:expr, $($arg:tt)+) => {
        $crate::dlog!($log, $crate::level::CRITICAL, $sub, $($arg)+)
    };
}

/// Log a message with error severity
///
/// # Examples
/// ```ignore
/// dlog_error!(log, SUB_INGRESS, "failed to bind socket");
/// ```
#[macro_export]
macro_rules! dlog_error {
    ($log:expr, $sub:expr, $($arg:tt)+) => {
        $crate::dlog!($log, $crate::level::ERROR, $sub, $($arg)+)
    };
}

/// Log a message with warning severity
///
/// # Examples
/// ```ignore
/// dlog_warning!(log, SUB_EGRESS, "buffer near capacity");
/// ```
#[macro_export]
macro_rules! dlog_warning {
    ($log:expr, $sub:expr, $($arg:tt)+) => {
        $crate::dlog!($log, $crate::level::WARNING, $sub, $($arg)+)
    };
}

/// Log a message with notice severity
///
/// # Examples
/// ```ignore
/// dlog_notice!(log, SUB_RELAY, "worker restarted");
/// ```
#[macro_export]
macro_rules! dlog_notice {
    ($log:expr, $sub:expr, $($arg:tt)+) => {
        $crate::dlog!($log, $crate::level::NOTICE, $sub, $($arg)+)
    };
}

/// Log a message with info severity
///
/// # Examples
/// ```ignore
/// dlog_info!(log, SUB_RELAY, "rule added");
/// ```
#[macro_export]
macro_rules! dlog_info {
    ($log:expr, $sub:expr, $($arg:tt)+) => {
        $crate::dlog!($log, $crate::level::INFO, $sub, $($arg)+)
    };
}

/// Log a message with debug severity
///
/// # Examples
/// ```ignore
/// dlog_debug!(log, SUB_PARSER, "parsing packet");
/// ```
#[macro_export]
macro_rules! dlog_debug {
    ($log:expr, $sub:expr, $($arg:tt)+) => {
        $crate::dlog!($log, $crate::level::DEBUG, $sub, $($arg)+)
    };
}
