// SPDX-License-Identifier: Apache-2.0 OR MIT
// Subsystem table - per-component verbosity levels

use std::sync::atomic::{AtomicI32, Ordering};

/// One subsystem row: the steady-state emission threshold, the gathering
/// threshold producers consult before building an entry, and a display name.
pub struct Subsystem {
    log_level: AtomicI32,
    gather_level: AtomicI32,
    name: String,
}

impl Subsystem {
    pub fn log_level(&self) -> i32 {
        self.log_level.load(Ordering::Relaxed)
    }

    pub fn gather_level(&self) -> i32 {
        self.gather_level.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Registry mapping subsystem ids to verbosity levels.
///
/// Rows are added before the table is shared; level updates afterwards are
/// relaxed atomic stores and readers tolerate stale values. Unknown ids
/// clamp to subsystem 0.
pub struct SubsystemMap {
    subsys: Vec<Subsystem>,
}

impl SubsystemMap {
    pub fn new() -> Self {
        Self { subsys: Vec::new() }
    }

    /// Add a subsystem, returning its id.
    pub fn add(&mut self, name: &str, log_level: i32, gather_level: i32) -> u32 {
        self.subsys.push(Subsystem {
            log_level: AtomicI32::new(log_level),
            gather_level: AtomicI32::new(gather_level),
            name: name.to_string(),
        });
        (self.subsys.len() - 1) as u32
    }

    fn row(&self, sub: u32) -> Option<&Subsystem> {
        let mut idx = sub as usize;
        if idx >= self.subsys.len() {
            idx = 0;
        }
        self.subsys.get(idx)
    }

    pub fn get_log_level(&self, sub: u32) -> i32 {
        self.row(sub).map_or(0, Subsystem::log_level)
    }

    pub fn get_gather_level(&self, sub: u32) -> i32 {
        self.row(sub).map_or(0, Subsystem::gather_level)
    }

    pub fn name(&self, sub: u32) -> &str {
        self.row(sub).map_or("", Subsystem::name)
    }

    /// Should a producer bother constructing an entry at this level?
    pub fn should_gather(&self, sub: u32, level: i32) -> bool {
        self.get_gather_level(sub) >= level
    }

    pub fn set_log_level(&self, sub: u32, level: i32) {
        if let Some(row) = self.row(sub) {
            row.log_level.store(level, Ordering::Relaxed);
        }
    }

    pub fn set_gather_level(&self, sub: u32, level: i32) {
        if let Some(row) = self.row(sub) {
            row.gather_level.store(level, Ordering::Relaxed);
        }
    }

    /// Look up a subsystem id by name.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.subsys
            .iter()
            .position(|s| s.name == name)
            .map(|i| i as u32)
    }

    pub fn len(&self) -> usize {
        self.subsys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsys.is_empty()
    }

    /// Iterate all rows in id order (used by the crash dump).
    pub fn iter(&self) -> impl Iterator<Item = &Subsystem> {
        self.subsys.iter()
    }
}

impl Default for SubsystemMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SubsystemMap {
        let mut subs = SubsystemMap::new();
        subs.add("none", 0, 5);
        subs.add("relay", 1, 5);
        subs.add("journal", 10, 10);
        subs
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut subs = SubsystemMap::new();
        assert_eq!(subs.add("none", 0, 5), 0);
        assert_eq!(subs.add("relay", 1, 5), 1);
    }

    #[test]
    fn test_levels_and_names() {
        let subs = table();
        assert_eq!(subs.get_log_level(1), 1);
        assert_eq!(subs.get_gather_level(2), 10);
        assert_eq!(subs.name(2), "journal");
    }

    #[test]
    fn test_unknown_id_clamps_to_zero() {
        let subs = table();
        assert_eq!(subs.get_log_level(99), 0);
        assert_eq!(subs.name(99), "none");
    }

    #[test]
    fn test_empty_table_defaults() {
        let subs = SubsystemMap::new();
        assert_eq!(subs.get_log_level(0), 0);
        assert_eq!(subs.name(0), "");
        assert!(!subs.should_gather(0, 1));
    }

    #[test]
    fn test_should_gather() {
        let subs = table();
        assert!(subs.should_gather(1, 5));
        assert!(!subs.should_gather(1, 6));
    }

    #[test]
    fn test_set_levels() {
        let subs = table();
        subs.set_log_level(1, 20);
        subs.set_gather_level(1, 20);
        assert_eq!(subs.get_log_level(1), 20);
        assert!(subs.should_gather(1, 15));
    }

    #[test]
    fn test_lookup() {
        let subs = table();
        assert_eq!(subs.lookup("journal"), Some(2));
        assert_eq!(subs.lookup("missing"), None);
    }

    #[test]
    fn test_iter_order() {
        let subs = table();
        let names: Vec<&str> = subs.iter().map(Subsystem::name).collect();
        assert_eq!(names, ["none", "relay", "journal"]);
    }
}
