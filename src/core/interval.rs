use std::fmt::{Debug, Display, Formatter};

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;

/// Half-open time interval in the account's time zone.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[must_use]
pub struct Interval {
    /// Inclusive.
    pub start: DateTime<Tz>,

    /// Exclusive.
    pub end: DateTime<Tz>,
}

impl Debug for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        const FORMAT: &str = "%Y-%m-%d %H:%M %Z";
        write!(f, "{}..{}", self.start.format(FORMAT), self.end.format(FORMAT))
    }
}

impl Interval {
    pub const fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn duration(self) -> TimeDelta {
        self.end - self.start
    }

    #[must_use]
    pub fn overlaps(self, other: Self) -> bool {
        (self.start < other.end) && (other.start < self.end)
    }

    /// Common part of the two intervals, if they overlap.
    #[must_use]
    pub fn intersection(self, other: Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Self { start, end })
    }

    /// Smallest interval covering all the given ones.
    #[must_use]
    pub fn span(intervals: impl IntoIterator<Item = Self>) -> Option<Self> {
        intervals.into_iter().reduce(|span, interval| Self {
            start: span.start.min(interval.start),
            end: span.end.max(interval.end),
        })
    }
}
