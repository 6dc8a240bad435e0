// SPDX-License-Identifier: Apache-2.0 OR MIT
// Structured remote sink - GELF over UDP, best effort

use crate::entry::Entry;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Mutex;

/// Client for a remote structured-log collector.
///
/// Consumes entries directly (no line formatting) and ships each one as a
/// single GELF 1.1 JSON datagram. Everything here is best effort: an unbound
/// socket, an unset destination or a send failure silently drops the entry.
pub struct Graylog {
    ident: String,
    host: String,
    socket: Option<UdpSocket>,
    dest: Mutex<Option<SocketAddr>>,
}

impl Graylog {
    pub fn new(ident: &str) -> Self {
        let host = nix::unistd::gethostname()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());
        Self {
            ident: ident.to_string(),
            host,
            socket: UdpSocket::bind("0.0.0.0:0").ok(),
            dest: Mutex::new(None),
        }
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn set_destination(&self, addr: SocketAddr) {
        *self.dest.lock().unwrap() = Some(addr);
    }

    /// Ship one entry. Send errors are ignored.
    pub fn log_entry(&self, e: &Entry) {
        let Some(socket) = &self.socket else { return };
        let Some(dest) = *self.dest.lock().unwrap() else {
            return;
        };

        let doc = serde_json::json!({
            "version": "1.1",
            "host": self.host,
            "short_message": e.message_lossy(),
            "timestamp": e.stamp.unix_seconds(),
            "level": e.level,
            "_subsys": e.subsys,
            "_thread": format!("{:x}", e.thread),
            "_ident": self.ident,
        });
        if let Ok(payload) = serde_json::to_vec(&doc) {
            let _ = socket.send_to(&payload, dest);
        }
    }
}
