use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Injected time source. Production uses [`SystemClock`]; tests use
/// [`ManualClock`] and advance it deterministically instead of racing real
/// timers.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Test clock with an explicitly advanced current time.
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.now.lock().unwrap() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

/// A set of item ids that expire: each entry is a cancellable delayed
/// clearing, evaluated lazily against the clock. Backs the in-flight and
/// recently-updated bookkeeping.
pub struct ExpiryMap {
    clock: Arc<dyn Clock>,
    deadlines: HashMap<Uuid, NaiveDateTime>,
}

impl ExpiryMap {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            deadlines: HashMap::new(),
        }
    }

    /// Mark `id` for `ttl`; re-inserting restarts the window.
    pub fn insert(&mut self, id: Uuid, ttl: Duration) {
        self.deadlines.insert(id, self.clock.now() + ttl);
    }

    /// Cancel the scheduled clearing early. Returns whether it was live.
    pub fn cancel(&mut self, id: &Uuid) -> bool {
        let now = self.clock.now();
        self.deadlines.remove(id).is_some_and(|deadline| deadline > now)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        let now = self.clock.now();
        self.deadlines.get(id).is_some_and(|deadline| *deadline > now)
    }

    /// Drop entries whose window has passed.
    pub fn sweep(&mut self) {
        let now = self.clock.now();
        self.deadlines.retain(|_, deadline| *deadline > now);
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    pub fn is_empty(&self) -> bool {
        let now = self.clock.now();
        !self.deadlines.values().any(|deadline| *deadline > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn entries_expire_when_the_clock_advances() {
        let clock = Arc::new(ManualClock::new(start()));
        let mut map = ExpiryMap::new(clock.clone());
        let id = Uuid::new_v4();
        map.insert(id, Duration::seconds(8));
        assert!(map.contains(&id));
        clock.advance(Duration::seconds(9));
        assert!(!map.contains(&id));
        assert!(map.is_empty());
    }

    #[test]
    fn cancel_clears_a_live_entry() {
        let clock = Arc::new(ManualClock::new(start()));
        let mut map = ExpiryMap::new(clock.clone());
        let id = Uuid::new_v4();
        map.insert(id, Duration::seconds(30));
        assert!(map.cancel(&id));
        assert!(!map.contains(&id));
        // Cancelling an expired or absent entry reports false.
        assert!(!map.cancel(&id));
    }

    #[test]
    fn reinsert_restarts_the_window() {
        let clock = Arc::new(ManualClock::new(start()));
        let mut map = ExpiryMap::new(clock.clone());
        let id = Uuid::new_v4();
        map.insert(id, Duration::seconds(10));
        clock.advance(Duration::seconds(8));
        map.insert(id, Duration::seconds(10));
        clock.advance(Duration::seconds(8));
        assert!(map.contains(&id));
    }
}
