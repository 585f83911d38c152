//! One-shot deferred actions owned by a room
//!
//! Timers are plain deadlines keyed by what they act on. The room decides
//! what firing means; cancelling is just removing the key, so a timer can
//! never touch a combatant that has been reset or removed.

use std::collections::HashMap;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    /// Next countdown step
    Countdown,
    /// Clip refill for a player
    Reload(Uuid),
    /// End of a player's spawn protection
    SpawnProtection(Uuid),
}

impl TimerKey {
    pub fn player(&self) -> Option<Uuid> {
        match self {
            TimerKey::Countdown => None,
            TimerKey::Reload(id) | TimerKey::SpawnProtection(id) => Some(*id),
        }
    }
}

#[derive(Debug, Default)]
pub struct Timers {
    deadlines: HashMap<TimerKey, u64>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `key` to fire at `at` (unix ms), replacing any pending one
    pub fn schedule(&mut self, key: TimerKey, at: u64) {
        self.deadlines.insert(key, at);
    }

    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.deadlines.remove(&key).is_some()
    }

    /// Cancel every timer that acts on `player`
    pub fn cancel_player(&mut self, player: Uuid) {
        self.deadlines.retain(|key, _| key.player() != Some(player));
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    #[cfg(test)]
    pub fn is_pending(&self, key: TimerKey) -> bool {
        self.deadlines.contains_key(&key)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.deadlines.values().copied().min()
    }

    /// Remove and return every timer due at `now`, earliest first. Equal
    /// deadlines come out in key order.
    pub fn take_due(&mut self, now: u64) -> Vec<TimerKey> {
        let mut due: Vec<(u64, TimerKey)> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, at)| (*at, *key))
            .collect();
        due.sort_unstable();

        for (_, key) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }
}
