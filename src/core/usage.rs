use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;

use crate::{
    core::{granularity::Granularity, interval::Interval},
    quantity::{cost::Cost, energy::KilowattHours},
};

/// Single interval reading from the utility export.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UsageRecord {
    pub timestamp_start: DateTime<Tz>,
    pub duration: TimeDelta,
    pub usage: KilowattHours,
    pub cost: Option<Cost>,
}

impl UsageRecord {
    pub fn interval(&self) -> Interval {
        Interval::new(self.timestamp_start, self.timestamp_start + self.duration)
    }
}

/// Granularity of the usage series, judged by its first reading.
#[must_use]
pub fn native_granularity(records: &[UsageRecord]) -> Option<Granularity> {
    records.first().and_then(|record| Granularity::from_duration(record.duration))
}

#[must_use]
pub fn total_usage(records: &[UsageRecord]) -> KilowattHours {
    records.iter().map(|record| record.usage).sum()
}
