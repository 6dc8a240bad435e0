// SPDX-License-Identifier: Apache-2.0 OR MIT
// Log entry - one record handed from a producer thread to the engine

use crate::clock::Timestamp;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One log event.
///
/// Created by a producer thread, finalized, then handed to the engine which
/// owns it until it is trimmed from the recent ring. The `next` link is used
/// only by `EntryQueue`.
pub struct Entry {
    pub stamp: Timestamp,
    pub thread: u64,
    pub level: i32,
    pub subsys: u32,
    payload: Vec<u8>,
    hint: Option<Arc<AtomicUsize>>,
    finalized: bool,
    pub(crate) next: Option<Box<Entry>>,
}

impl Entry {
    /// Create an entry with a known payload.
    pub fn new(stamp: Timestamp, thread: u64, level: i32, subsys: u32, msg: &str) -> Self {
        Self {
            stamp,
            thread,
            level,
            subsys,
            payload: msg.as_bytes().to_vec(),
            hint: None,
            finalized: false,
            next: None,
        }
    }

    /// Create an entry whose payload storage is sized from a shared hint.
    ///
    /// The hint is read with a relaxed load; a stale value only affects the
    /// initial capacity. `finish()` writes the actual payload size back so
    /// later allocations track what call sites really produce.
    pub fn with_size_hint(
        stamp: Timestamp,
        thread: u64,
        level: i32,
        subsys: u32,
        hint: Arc<AtomicUsize>,
    ) -> Self {
        let expected = hint.load(Ordering::Relaxed);
        Self {
            stamp,
            thread,
            level,
            subsys,
            payload: Vec::with_capacity(expected),
            hint: Some(hint),
            finalized: false,
            next: None,
        }
    }

    /// Append raw bytes to the payload. Must not be called after `finish()`.
    pub fn append(&mut self, bytes: &[u8]) {
        debug_assert!(!self.finalized, "append to finalized entry");
        self.payload.extend_from_slice(bytes);
    }

    /// Finalize the entry. Idempotent; after this the payload and `size()`
    /// never change.
    pub fn finish(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        if let Some(hint) = &self.hint {
            hint.store(self.payload.len(), Ordering::Relaxed);
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Copy the payload into a caller-provided buffer, returning the number
    /// of bytes written.
    pub fn render_into(&self, out: &mut [u8]) -> usize {
        let n = self.payload.len().min(out.len());
        out[..n].copy_from_slice(&self.payload[..n]);
        n
    }

    /// Payload as text, for sinks that consume the entry structurally.
    pub fn message_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl std::fmt::Write for Entry {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.append(s.as_bytes());
        Ok(())
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("level", &self.level)
            .field("subsys", &self.subsys)
            .field("message", &self.message_lossy())
            .finish()
    }
}

/// Get current thread ID for entry attribution
pub(crate) fn current_thread_id() -> u64 {
    #[cfg(target_os = "linux")]
    {
        unsafe { libc::gettid() as u64 }
    }
    #[cfg(not(target_os = "linux"))]
    {
        use std::sync::atomic::AtomicU64;
        static NEXT: AtomicU64 = AtomicU64::new(1);
        thread_local! {
            static ID: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
        }
        ID.with(|id| *id)
    }
}
