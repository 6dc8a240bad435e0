// SPDX-License-Identifier: Apache-2.0 OR MIT
// Asynchronous multi-sink diagnostic logging engine
//
// Producer threads hand finished entries to the engine with minimal
// latency; a single consumer thread formats them and drives the sinks
// (file, syslog, stderr, remote structured log). A bounded ring of recent
// entries is retained so a crash can dump a high-resolution trace
// regardless of the steady-state verbosity thresholds.

mod clock;
pub mod config;
mod engine;
mod entry;
mod exit;
mod graylog;
#[macro_use]
mod macros;
mod queue;
mod router;
mod subsys;
mod writer;

// Public exports
pub use clock::{append_time, LogClock, Timestamp};
pub use macros::level;
pub use config::{Config, ConfigError};
pub use engine::{Log, DEFAULT_MAX_NEW, DEFAULT_MAX_RECENT};
pub use entry::Entry;
pub use exit::set_flush_on_exit;
pub use graylog::Graylog;
pub use queue::EntryQueue;
pub use router::{route, Mode, Route, SinkLevels, SinkThresholds};
pub use subsys::{Subsystem, SubsystemMap};
pub use writer::{BufferedWriter, MAX_LOG_BUF};
