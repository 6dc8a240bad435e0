// SPDX-License-Identifier: Apache-2.0 OR MIT
// At-exit flush hook
//
// The process at-exit facility takes a bare callback and cannot
// unregister, so the registration is permanent: a static slot holds a weak
// back-reference to the engine, and the callback upgrades it at exit. Once
// the engine is gone the upgrade fails and the callback degrades to a
// no-op, which is what makes the permanent registration safe.

use crate::engine::Log;
use std::sync::{Arc, Mutex, Once, Weak};

static FLUSH_ON_EXIT: Mutex<Option<Weak<Log>>> = Mutex::new(None);
static REGISTER: Once = Once::new();

extern "C" fn flush_log_at_exit() {
    run_exit_flush();
}

pub(crate) fn run_exit_flush() {
    let slot = FLUSH_ON_EXIT
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(log) = slot.as_ref().and_then(Weak::upgrade) {
        log.flush();
    }
}

/// Point the at-exit hook at `log`, registering the hook with the process
/// on first use.
pub fn set_flush_on_exit(log: &Arc<Log>) {
    *FLUSH_ON_EXIT.lock().unwrap() = Some(Arc::downgrade(log));
    REGISTER.call_once(|| {
        // SAFETY: flush_log_at_exit is a plain extern "C" fn with no
        // arguments, exactly what atexit expects.
        unsafe {
            libc::atexit(flush_log_at_exit);
        }
    });
}
