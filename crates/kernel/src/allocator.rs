use std::marker::PhantomData;

/// Seed for the student id space.
pub const STUDENT_SEED: u32 = 1000;
/// Seed for the course id space.
pub const COURSE_SEED: u32 = 2000;
/// Seed for the enrollment id space.
pub const ENROLLMENT_SEED: u32 = 3000;
/// Largest id an allocator issues. `u32::MAX` marks an exhausted id space.
pub const MAX_ID: u32 = u32::MAX - 1;

/// Issues strictly increasing ids for one entity kind.
///
/// The allocator only moves forward: undoing the command that consumed an id
/// does not hand it out again. Once [`MAX_ID`] has been issued or observed the
/// space is exhausted and [`allocate`](Self::allocate) returns `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator<I> {
    next: u32,
    _kind: PhantomData<fn() -> I>,
}

impl<I: From<u32>> IdAllocator<I> {
    /// Create an allocator whose first issued id is `seed`.
    pub fn new(seed: u32) -> Self {
        Self {
            next: seed,
            _kind: PhantomData,
        }
    }

    /// Issue the next id, or `None` when the id space is used up.
    pub fn allocate(&mut self) -> Option<I> {
        if self.is_exhausted() {
            return None;
        }
        let id = self.next;
        self.next += 1;
        Some(I::from(id))
    }

    /// Whether every id up to [`MAX_ID`] has been issued or observed.
    pub fn is_exhausted(&self) -> bool {
        self.next > MAX_ID
    }

    /// The id that the next call to [`allocate`](Self::allocate) returns,
    /// or `u32::MAX` once exhausted.
    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Record that `raw` is in use, so it is never issued later.
    pub fn observe(&mut self, raw: u32) {
        self.next = self.next.max(raw.saturating_add(1));
    }
}
