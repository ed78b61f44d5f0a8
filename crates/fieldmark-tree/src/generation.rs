//! Generation Counters
//!
//! Every structural or state mutation of the field tree moves a counter.
//! Derived values keep the counters they read and are reused only while all
//! of them are unchanged.

/// Mutation counter. Counters wrap, so only equality is meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Generation(u32);

impl Generation {
    pub const INITIAL: Self = Generation(0);

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Advance in place and return the new value
    pub fn bump(&mut self) -> Self {
        self.0 = self.0.wrapping_add(1);
        *self
    }
}

/// A derived value and the input stamp it was computed from
#[derive(Debug, Clone)]
pub struct Cached<T, S> {
    value: T,
    stamp: S,
}

impl<T, S: PartialEq> Cached<T, S> {
    pub fn new(value: T, stamp: S) -> Self {
        Self { value, stamp }
    }

    /// The value, if it was computed from `current`
    pub fn get_if_valid(&self, current: &S) -> Option<&T> {
        (self.stamp == *current).then_some(&self.value)
    }
}
