// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Property-based tests for the queue discipline and retention bounds.

use dlog::{Entry, EntryQueue, Log, LogClock, SubsystemMap};
use proptest::prelude::*;
use std::sync::Arc;

fn entry(msg: &str) -> Box<Entry> {
    Box::new(Entry::new(LogClock::new().now(), 1, 0, 0, msg))
}

fn engine() -> Arc<Log> {
    let mut subs = SubsystemMap::new();
    subs.add("none", 99, 99);
    let log = Arc::new(Log::new(Arc::new(subs)));
    // Keep the generated volume off the test harness stderr.
    log.set_stderr_level(-1, -1);
    log
}

proptest! {
    #[test]
    fn queue_preserves_fifo_order(msgs in prop::collection::vec("[a-z0-9]{0,16}", 0..64)) {
        let mut q = EntryQueue::new();
        for m in &msgs {
            q.enqueue(entry(m));
        }
        prop_assert_eq!(q.len(), msgs.len());

        let mut drained = Vec::new();
        while let Some(e) = q.dequeue() {
            drained.push(e.message_lossy().into_owned());
        }
        prop_assert_eq!(drained, msgs);
        prop_assert!(q.is_empty());
    }

    #[test]
    fn swap_exchanges_contents(
        a in prop::collection::vec("[a-z]{1,8}", 0..32),
        b in prop::collection::vec("[0-9]{1,8}", 0..32),
    ) {
        let mut qa = EntryQueue::new();
        let mut qb = EntryQueue::new();
        for m in &a {
            qa.enqueue(entry(m));
        }
        for m in &b {
            qb.enqueue(entry(m));
        }

        qa.swap(&mut qb);
        prop_assert_eq!(qa.len(), b.len());
        prop_assert_eq!(qb.len(), a.len());

        let drained: Vec<String> = std::iter::from_fn(|| qa.dequeue())
            .map(|e| e.message_lossy().into_owned())
            .collect();
        prop_assert_eq!(drained, b);
    }

    #[test]
    fn recent_ring_respects_bound(n in 0usize..150, max_recent in 1usize..40) {
        let log = engine();
        log.set_max_recent(max_recent);
        log.set_max_new(200);

        for i in 0..n {
            let e = log.create_entry(1, 0, &format!("m{}", i));
            log.submit_entry(e);
        }
        log.flush();

        prop_assert_eq!(log.new_len(), 0);
        prop_assert_eq!(log.recent_len(), n.min(max_recent));
    }

    #[test]
    fn repeated_flushes_keep_invariants(batches in prop::collection::vec(0usize..30, 1..8)) {
        let log = engine();
        log.set_max_recent(25);
        log.set_max_new(100);

        let mut total = 0;
        for batch in batches {
            for i in 0..batch {
                let e = log.create_entry(1, 0, &format!("b{}", i));
                log.submit_entry(e);
            }
            total += batch;
            log.flush();
            prop_assert_eq!(log.recent_len(), total.min(25));
        }
    }
}
