use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Abstraction over time so expiry timers and scheduling loops are
/// deterministically testable without real sleeps, mirroring how the
/// teacher parameterizes `now_ms` through call sites instead of calling
/// a wall-clock function deep inside state-machine logic.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        now_ms()
    }
}

/// A manually-advanced clock for unit tests exercising expiry and
/// cooldown logic without real delays.
#[derive(Clone)]
pub struct TestClock {
    now: Arc<AtomicI64>,
}

impl TestClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn advance_ms(&self, delta: i64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set_ms(&self, value: i64) {
        self.now.store(value, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst).max(0) as u64
    }
}
