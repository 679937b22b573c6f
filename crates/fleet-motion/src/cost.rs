//! Totally ordered `f64` for priority queues.

use std::cmp::Ordering;

/// A search cost (seconds or world units).  Ordered with `f64::total_cmp`,
/// so it can key a `BinaryHeap`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Cost(pub f64);

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
