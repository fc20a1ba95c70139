//! Slot generations
//!
//! Every arena slot carries a generation that is bumped when the slot is
//! freed. A `NodeId` remembers the generation it was issued with, so an id
//! kept across a removal stops resolving once its slot is reused.

/// Generation counter of an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Generation(u32);

impl Generation {
    /// Generation of a slot that has never been freed
    pub const INITIAL: Self = Generation(0);

    #[inline]
    pub const fn new(value: u32) -> Self {
        Generation(value)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// The generation after this one (wraps)
    #[inline]
    pub const fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::INITIAL
    }
}
