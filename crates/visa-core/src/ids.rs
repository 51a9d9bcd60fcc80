//! Record id allocation
//!
//! Ids start from the wall clock in milliseconds but never repeat: every
//! allocation moves past the previous one, so two imports landing in the same
//! millisecond still get distinct ids.

use chrono::Utc;

/// Strictly increasing id source owned by a dataset
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: i64,
    use_clock: bool,
}

impl IdGenerator {
    /// Generator seeded from the current time
    pub fn from_clock() -> Self {
        Self {
            next: Utc::now().timestamp_millis(),
            use_clock: true,
        }
    }

    /// Deterministic generator starting at `seed`, ignoring the clock
    pub fn seeded(seed: i64) -> Self {
        Self {
            next: seed,
            use_clock: false,
        }
    }

    /// Allocate a single id
    pub fn next_id(&mut self) -> i64 {
        self.reserve(1)
    }

    /// Allocate `count` consecutive ids and return the first
    ///
    /// A zero count still consumes one id so the returned base is never reused.
    pub fn reserve(&mut self, count: usize) -> i64 {
        let base = if self.use_clock {
            self.next.max(Utc::now().timestamp_millis())
        } else {
            self.next
        };
        let width = i64::try_from(count.max(1)).unwrap_or(i64::MAX);
        self.next = base.saturating_add(width);
        base
    }

    /// Make sure future allocations come after an id seen elsewhere
    pub fn observe(&mut self, id: i64) {
        if id >= self.next {
            self.next = id.saturating_add(1);
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::from_clock()
    }
}
