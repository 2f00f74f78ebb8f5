use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

use crate::types::{AuditEntry, JournalFilter, NewEntry};
use crate::Journal;

/// Default pluggable-journal implementation (spec §6 "Persisted state"):
/// bounded by `max_entries` and pruned by `max_age`. Both bounds are
/// enforced on every write, oldest-first.
pub struct InMemoryJournal {
    entries: Mutex<VecDeque<AuditEntry>>,
    next_id: AtomicU64,
    max_entries: usize,
    max_age: ChronoDuration,
}

impl InMemoryJournal {
    pub fn new(max_entries: usize, max_age_s: i64) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            max_entries,
            max_age: ChronoDuration::seconds(max_age_s),
        }
    }

    fn prune(&self, guard: &mut VecDeque<AuditEntry>) {
        while guard.len() > self.max_entries {
            guard.pop_front();
        }
        let cutoff = Utc::now() - self.max_age;
        while guard.front().is_some_and(|e| e.timestamp < cutoff) {
            guard.pop_front();
        }
    }
}

impl Default for InMemoryJournal {
    fn default() -> Self {
        Self::new(10_000, 24 * 60 * 60)
    }
}

impl Journal for InMemoryJournal {
    fn write(&self, entry: NewEntry) -> AuditEntry {
        let event_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stamped = AuditEntry {
            event_id,
            event_type: entry.event_type,
            timestamp: Utc::now(),
            actor: entry.actor,
            description: entry.description,
            related_ids: entry.related_ids,
            data: entry.data,
            source_ip: entry.source_ip,
            severity: entry.severity,
        };

        let mut guard = self.entries.lock();
        guard.push_back(stamped.clone());
        self.prune(&mut guard);
        stamped
    }

    fn query(&self, filter: &JournalFilter) -> Vec<AuditEntry> {
        self.entries.lock().iter().filter(|e| filter.matches(e)).cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
