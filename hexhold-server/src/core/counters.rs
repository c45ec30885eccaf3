//! Saturating counters with interior locking.
//!
//! These small types are shared between tick loops and intent handlers, so
//! each carries its own lock. Increments clamp at the maximum, decrements
//! clamp at zero; no counter ever wraps.

use std::sync::Mutex;

/// `(current, max)` hit points. Alive iff `current > 0`.
pub struct Health {
    inner: Mutex<(u16, u16)>,
}

impl Health {
    pub fn new(current: u16, max: u16) -> Self {
        Self {
            inner: Mutex::new((current.min(max), max)),
        }
    }

    /// Health starting at full.
    pub fn full(max: u16) -> Self {
        Self::new(max, max)
    }

    pub fn reset(&self) {
        let mut h = self.inner.lock().unwrap();
        h.0 = h.1;
    }

    pub fn increment(&self, amount: u16) {
        let mut h = self.inner.lock().unwrap();
        h.0 = h.0.saturating_add(amount).min(h.1);
    }

    pub fn decrement(&self, amount: u16) {
        let mut h = self.inner.lock().unwrap();
        h.0 = h.0.saturating_sub(amount);
    }

    pub fn is_alive(&self) -> bool {
        self.inner.lock().unwrap().0 > 0
    }

    pub fn is_full(&self) -> bool {
        let h = self.inner.lock().unwrap();
        h.0 == h.1
    }

    pub fn current(&self) -> u16 {
        self.inner.lock().unwrap().0
    }

    pub fn max(&self) -> u16 {
        self.inner.lock().unwrap().1
    }

    /// Replace both values, e.g. when an upgrade resets a building.
    pub fn rewrite(&self, current: u16, max: u16) {
        *self.inner.lock().unwrap() = (current.min(max), max);
    }
}

/// Bounded occupancy counter (e.g. active barracks out of a cap).
pub struct Capacity {
    inner: Mutex<(u16, u16)>,
}

impl Capacity {
    pub fn new(current: u16, max: u16) -> Self {
        Self {
            inner: Mutex::new((current, max)),
        }
    }

    pub fn increment(&self, amount: u16) {
        let mut c = self.inner.lock().unwrap();
        c.0 = c.0.saturating_add(amount).min(c.1);
    }

    pub fn decrement(&self, amount: u16) {
        let mut c = self.inner.lock().unwrap();
        c.0 = c.0.saturating_sub(amount);
    }

    pub fn get(&self) -> u16 {
        self.inner.lock().unwrap().0
    }

    pub fn is_at_max(&self) -> bool {
        let c = self.inner.lock().unwrap();
        c.0 == c.1
    }
}

/// Spendable resource (power). Decrement fails atomically on shortfall.
pub struct Resource {
    inner: Mutex<(u16, u16)>,
}

impl Resource {
    pub fn new(current: u16, capacity: u16) -> Self {
        Self {
            inner: Mutex::new((current, capacity)),
        }
    }

    pub fn increment(&self, amount: u16) {
        let mut r = self.inner.lock().unwrap();
        r.0 = r.0.saturating_add(amount).min(r.1);
    }

    /// Spend `amount`; returns false (and leaves the balance untouched) when
    /// there is not enough.
    pub fn decrement(&self, amount: u16) -> bool {
        let mut r = self.inner.lock().unwrap();
        if r.0 >= amount {
            r.0 -= amount;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> u16 {
        self.inner.lock().unwrap().0
    }
}

/// Hard ceiling for population capacity regardless of houses built.
pub const POPULATION_HARD_CAP: u16 = 2048;

/// Used/capacity population pair. `used <= capacity` holds after every
/// atomic step.
pub struct Population {
    inner: Mutex<(u16, u16)>,
}

impl Population {
    pub fn new(used: u16, capacity: u16) -> Self {
        Self {
            inner: Mutex::new((used, capacity)),
        }
    }

    pub fn increment_capacity(&self, amount: u16) {
        let mut p = self.inner.lock().unwrap();
        p.1 = p.1.saturating_add(amount).min(POPULATION_HARD_CAP);
    }

    pub fn decrement_capacity(&self, amount: u16) -> bool {
        let mut p = self.inner.lock().unwrap();
        if p.1 >= amount {
            p.1 -= amount;
            true
        } else {
            false
        }
    }

    /// Claim population for a spawning unit; fails when the cap is hit.
    pub fn increment_used(&self, amount: u16) -> bool {
        let mut p = self.inner.lock().unwrap();
        if p.0.saturating_add(amount) > p.1 {
            return false;
        }
        p.0 += amount;
        true
    }

    pub fn decrement_used(&self, amount: u16) -> bool {
        let mut p = self.inner.lock().unwrap();
        if p.0 >= amount {
            p.0 -= amount;
            true
        } else {
            false
        }
    }

    pub fn used(&self) -> u16 {
        self.inner.lock().unwrap().0
    }

    pub fn capacity(&self) -> u16 {
        self.inner.lock().unwrap().1
    }
}

/// Countdown attached to a spawner. Units count in seconds, bullets in
/// milliseconds; both just decrement toward zero and reset to the original.
pub struct SpawnFrequency {
    inner: Mutex<u16>,
    original: u16,
}

impl SpawnFrequency {
    pub fn new(current: u16, original: u16) -> Self {
        Self {
            inner: Mutex::new(current),
            original,
        }
    }

    pub fn decrement(&self, amount: u16) {
        let mut f = self.inner.lock().unwrap();
        *f = f.saturating_sub(amount);
    }

    pub fn get(&self) -> u16 {
        *self.inner.lock().unwrap()
    }

    pub fn reset(&self) {
        *self.inner.lock().unwrap() = self.original;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_saturates_both_ways() {
        let h = Health::full(100);
        h.increment(50);
        assert_eq!(h.current(), 100);
        h.decrement(40);
        assert_eq!(h.current(), 60);
        h.decrement(1000);
        assert_eq!(h.current(), 0);
        assert!(!h.is_alive());
        h.reset();
        assert!(h.is_full());
    }

    #[test]
    fn health_rewrite_on_upgrade() {
        let h = Health::full(150);
        h.decrement(100);
        h.rewrite(100, 100);
        assert_eq!((h.current(), h.max()), (100, 100));
    }

    #[test]
    fn resource_shortfall_is_atomic() {
        let r = Resource::new(100, 8000);
        assert!(!r.decrement(101));
        assert_eq!(r.current(), 100);
        assert!(r.decrement(100));
        assert_eq!(r.current(), 0);
    }

    #[test]
    fn resource_clamps_at_capacity() {
        let r = Resource::new(7990, 8000);
        r.increment(50);
        assert_eq!(r.current(), 8000);
    }

    #[test]
    fn population_used_never_exceeds_capacity() {
        let p = Population::new(0, 64);
        assert!(p.increment_used(48));
        assert!(p.increment_used(16));
        assert!(!p.increment_used(1));
        assert_eq!(p.used(), 64);
        assert!(p.decrement_used(16));
        assert_eq!(p.used(), 48);
    }

    #[test]
    fn population_capacity_hard_cap() {
        let p = Population::new(0, POPULATION_HARD_CAP - 4);
        p.increment_capacity(100);
        assert_eq!(p.capacity(), POPULATION_HARD_CAP);
    }

    #[test]
    fn frequency_saturates_at_zero_and_resets() {
        let f = SpawnFrequency::new(0, 4);
        f.decrement(3);
        assert_eq!(f.get(), 0);
        f.reset();
        assert_eq!(f.get(), 4);
        f.decrement(10);
        assert_eq!(f.get(), 0);
    }

    #[test]
    fn capacity_toggle_bounds() {
        let c = Capacity::new(0, 5);
        for _ in 0..7 {
            c.increment(1);
        }
        assert_eq!(c.get(), 5);
        assert!(c.is_at_max());
        c.decrement(1);
        assert_eq!(c.get(), 4);
    }
}
