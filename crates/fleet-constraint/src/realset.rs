//! Closed subsets of the extended real line with a constant-size
//! representation.
//!
//! A [`RealSet`] is one of `Empty`, `Full`, a `Singleton`, or a closed
//! `Interval` whose bounds may be infinite.  Every operation returns a new
//! value; sets are `Copy`.
//!
//! Equality (`==`, `Hash`) is *structural*: `Interval { min: 1, max: 1 }` and
//! `Singleton(1)` are different values.  Use [`RealSet::equivalent`] to
//! compare the sets they denote.

use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Copy, Clone, Debug)]
pub enum RealSet {
    Empty,
    Full,
    Singleton(f64),
    /// Closed interval `[min, max]`.  Either bound may be infinite; a
    /// well-formed value has `min <= max`.
    Interval { min: f64, max: f64 },
}

impl RealSet {
    /// # Panics
    ///
    /// Panics on NaN.
    pub fn singleton(v: f64) -> RealSet {
        assert!(!v.is_nan(), "RealSet::singleton(NaN)");
        RealSet::Singleton(v)
    }

    /// The closed interval `[min, max]`.
    ///
    /// # Panics
    ///
    /// Panics if `min > max` or either bound is NaN.  Constructing an inverted
    /// interval is a caller bug, not an infeasibility.
    pub fn interval(min: f64, max: f64) -> RealSet {
        assert!(
            !min.is_nan() && !max.is_nan() && min <= max,
            "RealSet::interval({min}, {max}) is not a valid interval"
        );
        RealSet::Interval { min, max }
    }

    /// `[min, +∞)`.
    pub fn at_least(min: f64) -> RealSet {
        RealSet::interval(min, f64::INFINITY)
    }

    /// `(-∞, max]`.
    pub fn at_most(max: f64) -> RealSet {
        RealSet::interval(f64::NEG_INFINITY, max)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RealSet::Empty)
    }

    /// `(min, max)` of a non-empty set; `Full` reports infinite bounds.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match *self {
            RealSet::Empty => None,
            RealSet::Full => Some((f64::NEG_INFINITY, f64::INFINITY)),
            RealSet::Singleton(v) => Some((v, v)),
            RealSet::Interval { min, max } => Some((min, max)),
        }
    }

    pub fn min(&self) -> Option<f64> {
        self.bounds().map(|(lo, _)| lo)
    }

    pub fn max(&self) -> Option<f64> {
        self.bounds().map(|(_, hi)| hi)
    }

    pub fn contains(&self, v: f64) -> bool {
        self.bounds().is_some_and(|(lo, hi)| lo <= v && v <= hi)
    }

    /// `{ -x | x ∈ self }`.
    pub fn negate(&self) -> RealSet {
        match *self {
            RealSet::Empty => RealSet::Empty,
            RealSet::Full => RealSet::Full,
            RealSet::Singleton(v) => RealSet::Singleton(-v),
            RealSet::Interval { min, max } => RealSet::Interval { min: -max, max: -min },
        }
    }

    /// Minkowski sum `{ a + b | a ∈ self, b ∈ other }`.
    pub fn add(&self, other: &RealSet) -> RealSet {
        match (self, other) {
            (RealSet::Empty, _) | (_, RealSet::Empty) => RealSet::Empty,
            (RealSet::Full, _) | (_, RealSet::Full) => RealSet::Full,
            // Opposite infinities sum to NaN, read as unbounded both ways.
            (RealSet::Singleton(a), RealSet::Singleton(b)) => match a + b {
                sum if sum.is_nan() => RealSet::Full,
                sum => RealSet::Singleton(sum),
            },
            _ => {
                let (Some((a_lo, a_hi)), Some((b_lo, b_hi))) = (self.bounds(), other.bounds())
                else {
                    return RealSet::Empty;
                };
                // -∞ + +∞ is NaN; the sum is unbounded on that side.
                let lo = a_lo + b_lo;
                let hi = a_hi + b_hi;
                from_bounds(
                    if lo.is_nan() { f64::NEG_INFINITY } else { lo },
                    if hi.is_nan() { f64::INFINITY } else { hi },
                )
            }
        }
    }

    /// Inverse of [`add`](Self::add): `a.add(b).sub(b)` is equivalent to `a`
    /// for every non-empty bounded `b`.
    ///
    /// Bounds subtract component-wise (`min − min`, `max − max`).  The result
    /// is `Empty` when the component-wise difference is inverted, i.e. when no
    /// set `x` satisfies `x + other = self`.  Subtracting `Full` loses all
    /// information and yields `Full`.
    pub fn sub(&self, other: &RealSet) -> RealSet {
        match (self, other) {
            (RealSet::Empty, _) | (_, RealSet::Empty) => RealSet::Empty,
            (RealSet::Full, _) | (_, RealSet::Full) => RealSet::Full,
            (RealSet::Singleton(a), RealSet::Singleton(b)) => match a - b {
                diff if diff.is_nan() => RealSet::Full,
                diff => RealSet::Singleton(diff),
            },
            _ => {
                let (Some((a_lo, a_hi)), Some((b_lo, b_hi))) = (self.bounds(), other.bounds())
                else {
                    return RealSet::Empty;
                };
                let lo = a_lo - b_lo;
                let hi = a_hi - b_hi;
                let lo = if lo.is_nan() { f64::NEG_INFINITY } else { lo };
                let hi = if hi.is_nan() { f64::INFINITY } else { hi };
                if lo > hi { RealSet::Empty } else { from_bounds(lo, hi) }
            }
        }
    }

    /// Set intersection.
    pub fn intersect(&self, other: &RealSet) -> RealSet {
        match (self, other) {
            (RealSet::Empty, _) | (_, RealSet::Empty) => RealSet::Empty,
            (RealSet::Full, x) | (x, RealSet::Full) => *x,
            _ => {
                let (Some((a_lo, a_hi)), Some((b_lo, b_hi))) = (self.bounds(), other.bounds())
                else {
                    return RealSet::Empty;
                };
                let lo = a_lo.max(b_lo);
                let hi = a_hi.min(b_hi);
                if lo > hi { RealSet::Empty } else { from_bounds(lo, hi) }
            }
        }
    }

    /// Canonical form: a degenerate interval becomes a `Singleton` and
    /// `(-∞, +∞)` becomes `Full`.
    pub fn normalize(&self) -> RealSet {
        match *self {
            RealSet::Interval { min, max } => from_bounds(min, max),
            other => other,
        }
    }

    /// `true` if both values denote the same set.
    pub fn equivalent(&self, other: &RealSet) -> bool {
        self.normalize() == other.normalize()
    }
}

fn from_bounds(lo: f64, hi: f64) -> RealSet {
    if lo == hi {
        RealSet::Singleton(lo)
    } else if lo == f64::NEG_INFINITY && hi == f64::INFINITY {
        RealSet::Full
    } else {
        RealSet::Interval { min: lo, max: hi }
    }
}

/// Bit pattern with `-0.0` folded onto `0.0`, so `Eq` and `Hash` agree.
fn key(v: f64) -> u64 {
    if v == 0.0 { 0.0_f64.to_bits() } else { v.to_bits() }
}

impl PartialEq for RealSet {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RealSet::Empty, RealSet::Empty) | (RealSet::Full, RealSet::Full) => true,
            (RealSet::Singleton(a), RealSet::Singleton(b)) => key(*a) == key(*b),
            (
                RealSet::Interval { min: a0, max: a1 },
                RealSet::Interval { min: b0, max: b1 },
            ) => key(*a0) == key(*b0) && key(*a1) == key(*b1),
            _ => false,
        }
    }
}

impl Eq for RealSet {}

impl Hash for RealSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match *self {
            RealSet::Empty | RealSet::Full => {}
            RealSet::Singleton(v) => key(v).hash(state),
            RealSet::Interval { min, max } => {
                key(min).hash(state);
                key(max).hash(state);
            }
        }
    }
}

impl Default for RealSet {
    fn default() -> Self {
        RealSet::Full
    }
}

impl fmt::Display for RealSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RealSet::Empty => write!(f, "∅"),
            RealSet::Full => write!(f, "ℝ"),
            RealSet::Singleton(v) => write!(f, "{{{v}}}"),
            RealSet::Interval { min, max } => write!(f, "[{min}, {max}]"),
        }
    }
}
