// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Configuration file types and parsing for the log engine.
//!
//! JSON5 configuration format supporting:
//! - Sink threshold pairs (normal/crash) per sink
//! - Queue and ring bounds, file path and ownership
//! - Per-subsystem verbosity overrides
//! - Comments and trailing commas

use crate::engine::{Log, DEFAULT_MAX_NEW, DEFAULT_MAX_RECENT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Normal/crash threshold pair as stored in the config file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelPair {
    pub log: i32,
    pub crash: i32,
}

/// Per-subsystem verbosity override.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubsysLevels {
    pub log: i32,
    pub gather: i32,
}

/// Engine configuration (JSON5 file format)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Log file path; empty means no file sink.
    #[serde(default)]
    pub log_file: String,

    /// Prefix prepended to every stderr line.
    #[serde(default)]
    pub log_stderr_prefix: String,

    /// Producer backpressure bound.
    #[serde(default = "default_max_new")]
    pub max_new: usize,

    /// Recent-ring bound.
    #[serde(default = "default_max_recent")]
    pub max_recent: usize,

    /// Millisecond instead of microsecond timestamps.
    #[serde(default)]
    pub coarse_timestamps: bool,

    /// Owner applied to the log file at reopen; 0/0 leaves it alone.
    #[serde(default)]
    pub log_file_uid: u32,
    #[serde(default)]
    pub log_file_gid: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_level: Option<LevelPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_level: Option<LevelPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_level: Option<LevelPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graylog_level: Option<LevelPair>,

    /// Remote structured-log destination, "host:port". Present means the
    /// graylog client is started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graylog_destination: Option<String>,

    /// Verbosity overrides keyed by subsystem name. Names the engine does
    /// not know are ignored.
    #[serde(default)]
    pub subsystems: HashMap<String, SubsysLevels>,
}

fn default_max_new() -> usize {
    DEFAULT_MAX_NEW
}

fn default_max_recent() -> usize {
    DEFAULT_MAX_RECENT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: String::new(),
            log_stderr_prefix: String::new(),
            max_new: DEFAULT_MAX_NEW,
            max_recent: DEFAULT_MAX_RECENT,
            coarse_timestamps: false,
            log_file_uid: 0,
            log_file_gid: 0,
            file_level: None,
            syslog_level: None,
            stderr_level: None,
            graylog_level: None,
            graylog_destination: None,
            subsystems: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON5 file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to a JSON5-compatible string
    pub fn to_json5(&self) -> String {
        // json5 crate doesn't have pretty printing, so we use serde_json for
        // output and rely on json5 for input (which handles comments and
        // trailing commas)
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json5())
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dest) = &self.graylog_destination {
            parse_destination(dest)?;
        }
        Ok(())
    }

    /// Push every setting into a live engine and reopen the log file.
    pub fn apply(&self, log: &Log) {
        log.set_log_file(&self.log_file);
        log.set_log_stderr_prefix(&self.log_stderr_prefix);
        log.set_log_file_owner(self.log_file_uid, self.log_file_gid);
        log.set_max_new(self.max_new);
        log.set_max_recent(self.max_recent);
        log.set_coarse_timestamps(self.coarse_timestamps);

        if let Some(l) = self.file_level {
            log.set_file_level(l.log, l.crash);
        }
        if let Some(l) = self.syslog_level {
            log.set_syslog_level(l.log, l.crash);
        }
        if let Some(l) = self.stderr_level {
            log.set_stderr_level(l.log, l.crash);
        }
        if let Some(l) = self.graylog_level {
            log.set_graylog_level(l.log, l.crash);
        }

        for (name, levels) in &self.subsystems {
            if let Some(id) = log.subsys().lookup(name) {
                log.subsys().set_log_level(id, levels.log);
                log.subsys().set_gather_level(id, levels.gather);
            }
        }

        log.reopen_log_file();

        if let Some(dest) = &self.graylog_destination {
            if let Ok(addr) = parse_destination(dest) {
                log.start_graylog();
                if let Some(client) = log.graylog() {
                    client.set_destination(addr);
                }
            }
        }
    }
}

fn parse_destination(dest: &str) -> Result<SocketAddr, ConfigError> {
    use std::net::ToSocketAddrs;
    dest.to_socket_addrs()
        .map_err(|e| ConfigError::BadDestination(dest.to_string(), e.to_string()))?
        .next()
        .ok_or_else(|| {
            ConfigError::BadDestination(dest.to_string(), "resolved to no addresses".to_string())
        })
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(std::path::PathBuf, String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid graylog destination {0:?}: {1}")]
    BadDestination(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsys::SubsystemMap;
    use std::sync::Arc;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_new, 100);
        assert_eq!(config.max_recent, 10_000);
        assert!(config.log_file.is_empty());
    }

    #[test]
    fn test_parse_json5_with_comments() {
        let content = r#"{
            // steady-state tuning
            log_file: "/var/log/relay.log",
            max_new: 200,
            stderr_level: { log: 3, crash: -1 },
            subsystems: {
                relay: { log: 10, gather: 10 }, // trailing comma is fine
            },
        }"#;
        let config = Config::parse(content).unwrap();
        assert_eq!(config.log_file, "/var/log/relay.log");
        assert_eq!(config.max_new, 200);
        assert_eq!(config.stderr_level, Some(LevelPair { log: 3, crash: -1 }));
        assert_eq!(
            config.subsystems["relay"],
            SubsysLevels { log: 10, gather: 10 }
        );
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(
            Config::parse("{ max_new: }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_roundtrip_through_json5() {
        let mut config = Config {
            log_file: "/tmp/x.log".to_string(),
            max_recent: 42,
            graylog_level: Some(LevelPair { log: 5, crash: 5 }),
            ..Default::default()
        };
        config
            .subsystems
            .insert("relay".to_string(), SubsysLevels { log: 1, gather: 2 });

        let parsed = Config::parse(&config.to_json5()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_destination() {
        let config = Config {
            graylog_destination: Some("127.0.0.1:12201".to_string()),
            ..Default::default()
        };
        config.validate().unwrap();

        let config = Config {
            graylog_destination: Some("not a destination".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadDestination(..))
        ));
    }

    #[test]
    fn test_apply_to_engine() {
        let path = format!("/tmp/dlog_config_{}.log", std::process::id());
        let _ = std::fs::remove_file(&path);

        let mut subs = SubsystemMap::new();
        subs.add("none", 0, 5);
        subs.add("relay", 0, 0);
        let log = Arc::new(Log::new(Arc::new(subs)));

        let content = format!(
            r#"{{
                log_file: "{}",
                max_new: 7,
                coarse_timestamps: true,
                graylog_destination: "127.0.0.1:12201",
                subsystems: {{ relay: {{ log: 10, gather: 10 }} }},
            }}"#,
            path
        );
        let config = Config::parse(&content).unwrap();
        config.validate().unwrap();
        config.apply(&log);

        assert_eq!(log.max_new(), 7);
        assert!(log.clock().is_coarse());
        assert_eq!(log.subsys().get_log_level(1), 10);
        assert!(log.graylog().is_some());

        // The reopened file sink is live.
        let e = log.create_entry(1, 1, "configured");
        log.submit_entry(e);
        log.flush();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("configured"));

        // Unknown subsystem names are ignored.
        let mut other = Config::default();
        other
            .subsystems
            .insert("missing".to_string(), SubsysLevels { log: 1, gather: 1 });
        other.apply(&log);

        std::fs::remove_file(&path).unwrap();
    }
}
