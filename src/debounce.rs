//! Latest-wins debouncing of editor input.
//!
//! Each key (a node) holds at most one pending item. Pushing a new item replaces the
//! pending one and restarts its timer, so only the last edit of a burst is ever
//! released. Keys debounce independently of each other.
//!
//! Time is passed in as seconds (egui's `InputState::time`), which keeps the debouncer
//! free of clocks and easy to drive from tests.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Pending<T> {
    item: T,
    deadline: f64,
}

/// Per-key debouncer.
#[derive(Debug, Clone)]
pub struct Debouncer<K, T> {
    delay: Duration,
    pending: HashMap<K, Pending<T>>,
}

impl<K: Eq + Hash + Clone, T> Debouncer<K, T> {
    /// Creates a debouncer releasing items `delay` after their last push.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Changes the delay for items pushed from now on.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Queues `item` for `key`, discarding any item still pending for that key.
    pub fn push(&mut self, key: K, item: T, now: f64) {
        let deadline = now + self.delay.as_secs_f64();
        self.pending.insert(key, Pending { item, deadline });
    }

    /// Releases every item whose deadline has passed, earliest first.
    pub fn poll(&mut self, now: f64) -> Vec<T> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut released: Vec<Pending<T>> = due
            .into_iter()
            .filter_map(|key| self.pending.remove(&key))
            .collect();
        released.sort_by(|a, b| a.deadline.total_cmp(&b.deadline));
        released.into_iter().map(|p| p.item).collect()
    }

    /// Drops the pending item for `key`, if any.
    pub fn cancel(&mut self, key: &K) -> Option<T> {
        self.pending.remove(key).map(|p| p.item)
    }

    /// Time until the next item is due; `None` if nothing is pending.
    pub fn next_deadline_in(&self, now: f64) -> Option<Duration> {
        self.pending
            .values()
            .map(|p| p.deadline)
            .min_by(|a, b| a.total_cmp(b))
            .map(|deadline| Duration::from_secs_f64((deadline - now).max(0.0)))
    }

    /// Returns true if any item is waiting.
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns true if an item is waiting for `key`.
    pub fn is_pending_for(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> Debouncer<u32, &'static str> {
        Debouncer::new(Duration::from_millis(1000))
    }

    #[test]
    fn test_item_released_after_delay() {
        let mut d = debouncer();
        d.push(1, "a", 0.0);

        assert!(d.poll(0.5).is_empty());
        assert_eq!(d.poll(1.0), vec!["a"]);
        assert!(!d.is_pending());
    }

    #[test]
    fn test_only_last_of_burst_is_released() {
        let mut d = debouncer();
        d.push(1, "a", 0.0);
        d.push(1, "ab", 0.4);
        d.push(1, "abc", 0.8);

        assert!(d.poll(1.5).is_empty());
        assert_eq!(d.poll(1.8), vec!["abc"]);
        assert!(d.poll(10.0).is_empty());
    }

    #[test]
    fn test_keys_debounce_independently() {
        let mut d = debouncer();
        d.push(1, "first", 0.0);
        d.push(2, "second", 0.2);

        assert_eq!(d.poll(1.1), vec!["first"]);
        assert_eq!(d.poll(1.2), vec!["second"]);
    }

    #[test]
    fn test_released_in_deadline_order() {
        let mut d = debouncer();
        d.push(2, "later", 0.3);
        d.push(1, "earlier", 0.1);

        assert_eq!(d.poll(5.0), vec!["earlier", "later"]);
    }

    #[test]
    fn test_next_deadline_and_cancel() {
        let mut d = debouncer();
        assert!(d.next_deadline_in(0.0).is_none());

        d.push(1, "a", 0.0);
        let remaining = d.next_deadline_in(0.25).unwrap();
        assert!((remaining.as_secs_f64() - 0.75).abs() < 1e-9);

        assert!(d.is_pending_for(&1));
        assert!(!d.is_pending_for(&2));
        assert_eq!(d.cancel(&1), Some("a"));
        assert!(d.poll(5.0).is_empty());
    }
}
