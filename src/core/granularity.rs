use std::{
    fmt::{Display, Formatter},
    iter,
};

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::core::interval::Interval;

/// Width of the alignment buckets.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, clap::ValueEnum, serde::Serialize,
)]
pub enum Granularity {
    #[value(name = "15min")]
    QuarterHourly,

    Hourly,

    /// Local calendar days, which last 23 or 25 hours on daylight-saving transitions.
    Daily,
}

impl Granularity {
    #[must_use]
    pub fn nominal_duration(self) -> TimeDelta {
        match self {
            Self::QuarterHourly => TimeDelta::minutes(15),
            Self::Hourly => TimeDelta::hours(1),
            Self::Daily => TimeDelta::days(1),
        }
    }

    /// Recognize the granularity of a native series from its interval length.
    #[must_use]
    pub fn from_duration(duration: TimeDelta) -> Option<Self> {
        if duration == TimeDelta::minutes(15) {
            Some(Self::QuarterHourly)
        } else if duration == TimeDelta::hours(1) {
            Some(Self::Hourly)
        } else if (TimeDelta::hours(23)..=TimeDelta::hours(25)).contains(&duration) {
            Some(Self::Daily)
        } else {
            None
        }
    }

    /// Start of the bucket containing the timestamp.
    ///
    /// Sub-daily buckets are truncated on the local wall clock, so that they stay aligned in zones
    /// with a non-whole-hour offset.
    #[must_use]
    pub fn bucket_start(self, timestamp: DateTime<Tz>) -> DateTime<Tz> {
        let step_minutes = match self {
            Self::Daily => return start_of_day(timestamp.timezone(), timestamp.date_naive()),
            Self::QuarterHourly => 15,
            Self::Hourly => 60,
        };
        let local_time = timestamp.time();
        timestamp
            - TimeDelta::minutes(i64::from(local_time.minute() % step_minutes))
            - TimeDelta::seconds(i64::from(local_time.second()))
            - TimeDelta::nanoseconds(i64::from(local_time.nanosecond()))
    }

    #[must_use]
    pub fn next_bucket_start(self, bucket_start: DateTime<Tz>) -> DateTime<Tz> {
        match self {
            Self::Daily => {
                start_of_day(bucket_start.timezone(), bucket_start.date_naive() + Days::new(1))
            }
            Self::QuarterHourly | Self::Hourly => bucket_start + self.nominal_duration(),
        }
    }

    pub fn bucket(self, timestamp: DateTime<Tz>) -> Interval {
        let start = self.bucket_start(timestamp);
        Interval::new(start, self.next_bucket_start(start))
    }

    /// All buckets intersecting the interval, in order.
    pub fn buckets(self, interval: Interval) -> impl Iterator<Item = Interval> {
        let first = (interval.start < interval.end).then(|| self.bucket(interval.start));
        iter::successors(first, move |bucket| {
            (bucket.end < interval.end)
                .then(|| Interval::new(bucket.end, self.next_bucket_start(bucket.end)))
        })
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::QuarterHourly => "15-minute",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        })
    }
}

/// First instant of the local calendar day.
#[must_use]
pub fn start_of_day(time_zone: Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    time_zone
        .from_local_datetime(&midnight)
        .earliest()
        // Some zones skip midnight itself when switching to the summer time:
        .or_else(|| time_zone.from_local_datetime(&(midnight + TimeDelta::hours(1))).earliest())
        .unwrap_or_else(|| time_zone.from_utc_datetime(&midnight))
}
