//! # Action Scheduler
//!
//! Holds delayed actions until their deadline passes.
//!
//! Pending actions are keyed by [`ActionSpec::id`], not by value: two
//! inputs may be configured with identical commands, and releasing one of
//! them must only cancel its own pending action.
//!
//! ## Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//! use evmapd::mapping::{ActionKind, ActionSpec, Trigger};
//! use evmapd::scheduler::ActionScheduler;
//!
//! let spec = ActionSpec {
//!     id: 0,
//!     trigger: Trigger::Delayed(Duration::from_millis(500)),
//!     kind: ActionKind::Exec,
//!     target: "echo held".to_string(),
//! };
//!
//! let start = Instant::now();
//! let mut scheduler = ActionScheduler::new();
//! scheduler.arm(spec, Duration::from_millis(500), start);
//!
//! assert!(scheduler.tick(start + Duration::from_millis(100)).is_empty());
//! assert_eq!(scheduler.tick(start + Duration::from_millis(500)).len(), 1);
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::mapping::ActionSpec;

/// A delayed action waiting for its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub fire_at: Instant,
    pub spec: ActionSpec,
}

/// Pending delayed actions, keyed by action id.
#[derive(Debug, Default)]
pub struct ActionScheduler {
    pending: HashMap<u32, PendingAction>,
}

impl ActionScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `spec` to fire `delay` after `now`.
    ///
    /// Arming an id that is already pending restarts its timer.
    pub fn arm(&mut self, spec: ActionSpec, delay: Duration, now: Instant) {
        debug!("Arming action {} ({:?})", spec.id, delay);
        let fire_at = now + delay;
        self.pending.insert(spec.id, PendingAction { fire_at, spec });
    }

    /// Drops the pending action with this id, if any.
    pub fn cancel(&mut self, id: u32) {
        if self.pending.remove(&id).is_some() {
            debug!("Cancelled action {}", id);
        }
    }

    /// Removes and returns every action due at `now`, earliest first.
    pub fn tick(&mut self, now: Instant) -> Vec<ActionSpec> {
        let mut due: Vec<PendingAction> = Vec::new();
        self.pending.retain(|_, pending| {
            if pending.fire_at <= now {
                due.push(pending.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|pending| (pending.fire_at, pending.spec.id));
        due.into_iter().map(|pending| pending.spec).collect()
    }

    /// Earliest deadline among pending actions.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.fire_at).min()
    }

    /// Drops every pending action.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ActionKind, Trigger};

    fn spec(id: u32, target: &str) -> ActionSpec {
        ActionSpec {
            id,
            trigger: Trigger::Delayed(Duration::from_millis(100)),
            kind: ActionKind::Exec,
            target: target.to_string(),
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fires_after_delay() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        scheduler.arm(spec(1, "a"), ms(100), start);

        assert!(scheduler.tick(start + ms(99)).is_empty());
        let fired = scheduler.tick(start + ms(100));
        assert_eq!(fired, vec![spec(1, "a")]);
        assert!(scheduler.is_empty());
        // Fired once only
        assert!(scheduler.tick(start + ms(500)).is_empty());
    }

    #[test]
    fn test_rearm_replaces_and_resets_timer() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        scheduler.arm(spec(1, "a"), ms(100), start);
        scheduler.arm(spec(1, "a"), ms(100), start + ms(50));

        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.tick(start + ms(120)).is_empty());
        assert_eq!(scheduler.tick(start + ms(150)).len(), 1);
    }

    #[test]
    fn test_cancel_by_id_only() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        // Identical payloads, different ids
        scheduler.arm(spec(1, "same"), ms(100), start);
        scheduler.arm(spec(2, "same"), ms(100), start);

        scheduler.cancel(1);
        let fired = scheduler.tick(start + ms(100));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, 2);
    }

    #[test]
    fn test_cancel_unknown_is_noop() {
        let mut scheduler = ActionScheduler::new();
        scheduler.cancel(42);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_tick_orders_by_deadline() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        scheduler.arm(spec(1, "late"), ms(300), start);
        scheduler.arm(spec(2, "early"), ms(100), start);
        scheduler.arm(spec(3, "middle"), ms(200), start);

        let fired: Vec<u32> = scheduler.tick(start + ms(300)).iter().map(|s| s.id).collect();
        assert_eq!(fired, vec![2, 3, 1]);
    }

    #[test]
    fn test_next_deadline() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        assert_eq!(scheduler.next_deadline(), None);

        scheduler.arm(spec(1, "a"), ms(300), start);
        scheduler.arm(spec(2, "b"), ms(100), start);
        assert_eq!(scheduler.next_deadline(), Some(start + ms(100)));

        scheduler.cancel(2);
        assert_eq!(scheduler.next_deadline(), Some(start + ms(300)));
    }

    #[test]
    fn test_clear() {
        let start = Instant::now();
        let mut scheduler = ActionScheduler::new();
        scheduler.arm(spec(1, "a"), ms(100), start);
        scheduler.clear();
        assert!(scheduler.tick(start + ms(100)).is_empty());
    }
}
