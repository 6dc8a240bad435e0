// SPDX-License-Identifier: Apache-2.0 OR MIT
// The log engine - dual queues, one consumer thread, flush and crash dump
//
// Producers append to the new queue under the queue mutex and signal the
// consumer; the consumer detaches the whole queue, formats and emits each
// entry, then parks it on the recent ring so a crash can dump a
// high-resolution trace regardless of the steady-state verbosity.

use crate::clock::{append_time, LogClock};
use crate::entry::{current_thread_id, Entry};
use crate::graylog::Graylog;
use crate::queue::EntryQueue;
use crate::router::{route, Mode, SinkLevels, SinkThresholds};
use crate::subsys::SubsystemMap;
use crate::writer::BufferedWriter;
use std::ffi::CString;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

pub const DEFAULT_MAX_NEW: usize = 100;
pub const DEFAULT_MAX_RECENT: usize = 10_000;

/// State guarded by the queue mutex.
struct QueueState {
    new: EntryQueue,
    stop: bool,
}

/// State guarded by the flush mutex.
struct FlushState {
    recent: EntryQueue,
    writer: BufferedWriter,
    levels: SinkThresholds,
    graylog: Option<Arc<Graylog>>,
    max_recent: usize,
    log_file: String,
    stderr_prefix: String,
    uid: u32,
    gid: u32,
}

/// The diagnostic logging engine.
///
/// Meant to be held in an `Arc` and shared freely; every operation takes
/// `&self`. Lock order when both mutexes are held: flush before queue.
pub struct Log {
    subs: Arc<SubsystemMap>,
    clock: LogClock,
    queue: Mutex<QueueState>,
    cond_flusher: Condvar,
    cond_loggers: Condvar,
    state: Mutex<FlushState>,
    // Holder thread ids for the reentrancy check on the crash path.
    queue_holder: AtomicU64,
    flush_holder: AtomicU64,
    // Read without a lock on the producer path; bound violations are
    // transient and self-correct at the next drain.
    max_new: AtomicUsize,
    inject_segv: AtomicBool,
    started: AtomicBool,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl Log {
    pub fn new(subs: Arc<SubsystemMap>) -> Self {
        Self {
            subs,
            clock: LogClock::new(),
            queue: Mutex::new(QueueState {
                new: EntryQueue::new(),
                stop: false,
            }),
            cond_flusher: Condvar::new(),
            cond_loggers: Condvar::new(),
            state: Mutex::new(FlushState {
                recent: EntryQueue::new(),
                writer: BufferedWriter::new(),
                levels: SinkThresholds::default(),
                graylog: None,
                max_recent: DEFAULT_MAX_RECENT,
                log_file: String::new(),
                stderr_prefix: String::new(),
                uid: 0,
                gid: 0,
            }),
            queue_holder: AtomicU64::new(0),
            flush_holder: AtomicU64::new(0),
            max_new: AtomicUsize::new(DEFAULT_MAX_NEW),
            inject_segv: AtomicBool::new(false),
            started: AtomicBool::new(false),
            consumer: Mutex::new(None),
        }
    }

    pub fn subsys(&self) -> &SubsystemMap {
        &self.subs
    }

    pub fn clock(&self) -> &LogClock {
        &self.clock
    }

    pub fn set_coarse_timestamps(&self, coarse: bool) {
        if coarse {
            self.clock.coarsen();
        } else {
            self.clock.refine();
        }
    }

    fn with_flush_state<R>(&self, f: impl FnOnce(&mut FlushState) -> R) -> R {
        let tid = current_thread_id();
        let mut st = self.state.lock().unwrap();
        self.flush_holder.store(tid, Ordering::Relaxed);
        let r = f(&mut st);
        self.flush_holder.store(0, Ordering::Relaxed);
        r
    }

    pub fn set_log_file(&self, path: &str) {
        self.with_flush_state(|st| st.log_file = path.to_string());
    }

    pub fn set_log_stderr_prefix(&self, prefix: &str) {
        self.with_flush_state(|st| st.stderr_prefix = prefix.to_string());
    }

    /// Set the owner applied to the log file at the next reopen.
    pub fn set_log_file_owner(&self, uid: u32, gid: u32) {
        self.with_flush_state(|st| {
            st.uid = uid;
            st.gid = gid;
        });
    }

    /// Close and reopen the configured log file. An empty path runs with no
    /// file sink; failures leave the engine without one and are reported to
    /// stderr.
    pub fn reopen_log_file(&self) {
        self.with_flush_state(|st| {
            let path = st.log_file.clone();
            st.writer.reopen(&path, st.uid, st.gid);
        });
    }

    /// Change ownership of the currently open log file.
    pub fn chown_log_file(&self, uid: u32, gid: u32) {
        self.with_flush_state(|st| st.writer.chown(uid, gid));
    }

    pub fn set_max_new(&self, n: usize) {
        self.max_new.store(n, Ordering::Relaxed);
    }

    pub fn max_new(&self) -> usize {
        self.max_new.load(Ordering::Relaxed)
    }

    pub fn set_max_recent(&self, n: usize) {
        self.with_flush_state(|st| st.max_recent = n);
    }

    pub fn set_file_level(&self, log: i32, crash: i32) {
        self.with_flush_state(|st| st.levels.file = SinkLevels::new(log, crash));
    }

    pub fn set_syslog_level(&self, log: i32, crash: i32) {
        self.with_flush_state(|st| st.levels.syslog = SinkLevels::new(log, crash));
    }

    pub fn set_stderr_level(&self, log: i32, crash: i32) {
        self.with_flush_state(|st| st.levels.stderr = SinkLevels::new(log, crash));
    }

    pub fn set_graylog_level(&self, log: i32, crash: i32) {
        self.with_flush_state(|st| st.levels.graylog = SinkLevels::new(log, crash));
    }

    /// Create the structured remote sink if it does not exist yet.
    pub fn start_graylog(&self) {
        self.with_flush_state(|st| {
            if st.graylog.is_none() {
                st.graylog = Some(Arc::new(Graylog::new("dlog")));
            }
        });
    }

    /// Release the structured remote sink.
    pub fn stop_graylog(&self) {
        self.with_flush_state(|st| st.graylog = None);
    }

    pub fn graylog(&self) -> Option<Arc<Graylog>> {
        self.with_flush_state(|st| st.graylog.clone())
    }

    /// Entries currently parked on the recent ring.
    pub fn recent_len(&self) -> usize {
        self.with_flush_state(|st| st.recent.len())
    }

    /// Entries submitted but not yet drained.
    pub fn new_len(&self) -> usize {
        self.queue.lock().unwrap().new.len()
    }

    /// Construct an entry stamped with the engine clock and the calling
    /// thread's id.
    pub fn create_entry(&self, level: i32, subsys: u32, msg: &str) -> Box<Entry> {
        Box::new(Entry::new(
            self.clock.now(),
            current_thread_id(),
            level,
            subsys,
            msg,
        ))
    }

    /// Construct an entry whose payload storage is reserved from a shared
    /// size hint; the hint is updated when the entry is finalized.
    pub fn create_entry_sized(
        &self,
        level: i32,
        subsys: u32,
        hint: &Arc<AtomicUsize>,
    ) -> Box<Entry> {
        Box::new(Entry::with_size_hint(
            self.clock.now(),
            current_thread_id(),
            level,
            subsys,
            Arc::clone(hint),
        ))
    }

    /// Hand an entry to the engine. Finalizes it, then blocks while the new
    /// queue is at its bound; the wait is released by the next drain. This
    /// is the backpressure policy: producers stall, entries are not dropped.
    pub fn submit_entry(&self, mut e: Box<Entry>) {
        e.finish();
        let tid = current_thread_id();

        let mut q = self.queue.lock().unwrap();
        self.queue_holder.store(tid, Ordering::Relaxed);

        if self.inject_segv.load(Ordering::Relaxed) {
            // Deterministic fault injection: a plain branch on a boolean,
            // then a null dereference.
            unsafe { std::ptr::write_volatile(std::ptr::null_mut::<u32>(), 0xdead) };
        }

        // wait for the flusher to catch up
        loop {
            let max = self.max_new.load(Ordering::Relaxed).max(1);
            if q.new.len() < max {
                break;
            }
            self.queue_holder.store(0, Ordering::Relaxed);
            q = self.cond_loggers.wait(q).unwrap();
            self.queue_holder.store(tid, Ordering::Relaxed);
        }

        q.new.enqueue(e);
        self.cond_flusher.notify_one();
        self.queue_holder.store(0, Ordering::Relaxed);
    }

    /// Synchronously drain the new queue, emit to the routed sinks, park the
    /// batch on the recent ring and trim it to bound. Callable from any
    /// thread.
    pub fn flush(&self) {
        let tid = current_thread_id();
        let mut st = self.state.lock().unwrap();
        self.flush_holder.store(tid, Ordering::Relaxed);

        let mut batch = EntryQueue::new();
        {
            let mut q = self.queue.lock().unwrap();
            self.queue_holder.store(tid, Ordering::Relaxed);
            batch.swap(&mut q.new);
            self.cond_loggers.notify_all();
            self.queue_holder.store(0, Ordering::Relaxed);
        }

        self.flush_batch(&mut st, &mut batch);

        // trim
        while st.recent.len() > st.max_recent {
            st.recent.dequeue();
        }

        self.flush_holder.store(0, Ordering::Relaxed);
    }

    fn flush_batch(&self, st: &mut FlushState, batch: &mut EntryQueue) {
        let FlushState {
            recent,
            writer,
            levels,
            graylog,
            stderr_prefix,
            ..
        } = st;
        while let Some(e) = batch.dequeue() {
            emit_entry(
                &self.subs,
                writer,
                levels,
                graylog.as_deref(),
                stderr_prefix,
                &e,
                None,
            );
            recent.enqueue(e);
        }
        writer.flush();
    }

    /// Dump the recent ring and a configuration summary to the
    /// crash-enabled sinks. Called synchronously from the faulting thread;
    /// best effort throughout.
    ///
    /// Any pending new entries are drained through a normal flush first, so
    /// the ring is complete; the crash pass then walks the ring without
    /// dequeuing, leaving it intact for post-mortem tooling.
    pub fn dump_recent(&self) {
        let tid = current_thread_id();
        let mut st = self.state.lock().unwrap();
        self.flush_holder.store(tid, Ordering::Relaxed);

        let mut batch = EntryQueue::new();
        {
            let mut q = self.queue.lock().unwrap();
            self.queue_holder.store(tid, Ordering::Relaxed);
            batch.swap(&mut q.new);
            self.queue_holder.store(0, Ordering::Relaxed);
        }
        self.flush_batch(&mut st, &mut batch);

        {
            let FlushState {
                recent,
                writer,
                levels,
                graylog,
                stderr_prefix,
                max_recent,
                log_file,
                ..
            } = &mut *st;

            log_message(writer, levels, "--- begin dump of recent events ---");
            let mut countdown = recent.len();
            for e in recent.iter() {
                emit_entry(
                    &self.subs,
                    writer,
                    levels,
                    graylog.as_deref(),
                    stderr_prefix,
                    e,
                    Some(countdown),
                );
                countdown -= 1;
            }
            writer.flush();

            log_message(writer, levels, "--- logging levels ---");
            for s in self.subs.iter() {
                let line = format!("  {:2}/{:2} {}", s.log_level(), s.gather_level(), s.name());
                log_message(writer, levels, &line);
            }
            let line = format!(
                "  {:2}/{:2} (syslog threshold)",
                levels.syslog.log, levels.syslog.crash
            );
            log_message(writer, levels, &line);
            let line = format!(
                "  {:2}/{:2} (stderr threshold)",
                levels.stderr.log, levels.stderr.crash
            );
            log_message(writer, levels, &line);
            let line = format!("  max_recent {:9}", max_recent);
            log_message(writer, levels, &line);
            let line = format!("  max_new    {:9}", self.max_new.load(Ordering::Relaxed));
            log_message(writer, levels, &line);
            let line = format!("  log_file {}", log_file);
            log_message(writer, levels, &line);
            log_message(writer, levels, "--- end dump of recent events ---");
        }

        self.flush_holder.store(0, Ordering::Relaxed);
    }

    /// Spawn the consumer thread. Fatal if the engine is already started or
    /// the thread cannot be created.
    pub fn start(self: &Arc<Self>) {
        assert!(
            !self.started.swap(true, Ordering::SeqCst),
            "log consumer already started"
        );
        {
            let mut q = self.queue.lock().unwrap();
            q.stop = false;
        }
        let log = Arc::clone(self);
        let handle = std::thread::Builder::new()
            .name("log".to_string())
            .spawn(move || log.consumer_loop())
            .expect("failed to spawn log consumer thread");
        *self.consumer.lock().unwrap() = Some(handle);
    }

    /// Stop and join the consumer. Idempotent when not started; the
    /// consumer performs one final flush on its way out.
    pub fn stop(&self) {
        if !self.started.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut q = self.queue.lock().unwrap();
            q.stop = true;
            self.cond_flusher.notify_one();
            self.cond_loggers.notify_all();
        }
        if let Some(handle) = self.consumer.lock().unwrap().take() {
            let _ = handle.join();
        }
        self.started.store(false, Ordering::SeqCst);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn consumer_loop(&self) {
        let tid = current_thread_id();
        let mut q = self.queue.lock().unwrap();
        self.queue_holder.store(tid, Ordering::Relaxed);
        while !q.stop {
            if !q.new.is_empty() {
                self.queue_holder.store(0, Ordering::Relaxed);
                drop(q);
                self.flush();
                q = self.queue.lock().unwrap();
                self.queue_holder.store(tid, Ordering::Relaxed);
                continue;
            }
            self.queue_holder.store(0, Ordering::Relaxed);
            q = self.cond_flusher.wait(q).unwrap();
            self.queue_holder.store(tid, Ordering::Relaxed);
        }
        self.queue_holder.store(0, Ordering::Relaxed);
        drop(q);
        self.flush();
    }

    /// Does the calling thread currently hold one of the engine mutexes?
    /// Crash handlers use this to pick a non-reentrant dump path.
    pub fn is_inside_log_lock(&self) -> bool {
        let tid = current_thread_id();
        tid == self.queue_holder.load(Ordering::Relaxed)
            || tid == self.flush_holder.load(Ordering::Relaxed)
    }

    /// Arm the fault injector: the next `submit_entry` dereferences null.
    pub fn inject_segv(&self) {
        self.inject_segv.store(true, Ordering::Relaxed);
    }

    pub fn reset_segv(&self) {
        self.inject_segv.store(false, Ordering::Relaxed);
    }

    /// Register this engine with the process at-exit hook so pending
    /// entries are flushed at termination.
    pub fn set_flush_on_exit(self: &Arc<Self>) {
        crate::exit::set_flush_on_exit(self);
    }
}

impl Drop for Log {
    fn drop(&mut self) {
        assert!(
            !self.started.load(Ordering::SeqCst),
            "log engine dropped while consumer running"
        );
    }
}

/// Format one entry and hand it to every routed sink. `countdown` is set
/// only by the crash dump and selects crash-mode thresholds along with the
/// countdown prefix.
fn emit_entry(
    subs: &SubsystemMap,
    writer: &mut BufferedWriter,
    levels: &SinkThresholds,
    graylog: Option<&Graylog>,
    stderr_prefix: &str,
    e: &Entry,
    countdown: Option<usize>,
) {
    let mode = if countdown.is_some() {
        Mode::Crash
    } else {
        Mode::Normal
    };
    let r = route(e.level, subs.get_log_level(e.subsys), levels, mode);
    let do_file = r.file && writer.is_open();

    if do_file || r.syslog || r.stderr {
        let mut line: Vec<u8> = Vec::with_capacity(80 + e.size());
        if let Some(k) = countdown {
            line.extend_from_slice(format!("{:6}> ", k).as_bytes());
        }
        append_time(&e.stamp, &mut line);
        line.extend_from_slice(format!(" {:x} {:2} ", e.thread, e.level).as_bytes());
        line.extend_from_slice(e.payload());

        if r.syslog {
            syslog_line(&line);
        }
        if r.stderr {
            let mut out = Vec::with_capacity(stderr_prefix.len() + line.len() + 1);
            out.extend_from_slice(stderr_prefix.as_bytes());
            out.extend_from_slice(&line);
            out.push(b'\n');
            let _ = std::io::stderr().write_all(&out);
        }
        if do_file {
            line.push(b'\n');
            writer.append(&line);
        }
    }

    if r.graylog {
        if let Some(g) = graylog {
            g.log_entry(e);
        }
    }
}

/// Emit one crash-summary message: directly to the file descriptor and to
/// syslog/stderr when their crash thresholds are enabled at all.
fn log_message(writer: &mut BufferedWriter, levels: &SinkThresholds, msg: &str) {
    writer.write_message(msg);
    if levels.syslog.crash >= 0 {
        syslog_line(msg.as_bytes());
    }
    if levels.stderr.crash >= 0 {
        let _ = writeln!(std::io::stderr(), "{}", msg);
    }
}

fn syslog_line(line: &[u8]) {
    let Ok(msg) = CString::new(line) else { return };
    // SAFETY: the format string consumes exactly the one string argument
    // supplied; the CString outlives the call.
    unsafe {
        libc::syslog(libc::LOG_USER | libc::LOG_INFO, c"%s".as_ptr(), msg.as_ptr());
    }
}
