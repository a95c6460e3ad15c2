use std::collections::BTreeMap;

use average::{Estimate, Mean};
use chrono::{Datelike, NaiveDate, Timelike};
use chrono_tz::Tz;

use crate::{
    core::{
        usage::UsageRecord,
        weather::{WeatherRecord, estimate},
    },
    quantity::{energy::KilowattHours, temperature::TemperatureUnit},
};

pub type HourColumn = [Option<f64>; 24];

/// Values by local date and local hour of day.
///
/// The repeated hour of the fall-back day lands in the same cell as its first occurrence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HourlyPivot {
    pub columns: BTreeMap<NaiveDate, HourColumn>,
}

impl HourlyPivot {
    /// Usage summed per local hour.
    #[must_use]
    pub fn usage(records: &[UsageRecord], time_zone: Tz) -> Self {
        let mut columns: BTreeMap<NaiveDate, HourColumn> = BTreeMap::new();
        for record in records {
            let local = record.timestamp_start.with_timezone(&time_zone);
            let cell = &mut columns.entry(local.date_naive()).or_insert([None; 24])
                [local.hour() as usize];
            *cell = Some(cell.unwrap_or_default() + record.usage.0);
        }
        Self { columns }
    }

    /// Temperature averaged per local hour, in the display unit.
    #[must_use]
    pub fn temperature(
        records: &[WeatherRecord],
        time_zone: Tz,
        temperature_unit: TemperatureUnit,
    ) -> Self {
        let mut means: BTreeMap<NaiveDate, [Mean; 24]> = BTreeMap::new();
        for record in records {
            let Some(temperature) = record.metrics.temperature else { continue };
            let local = record.timestamp.with_timezone(&time_zone);
            means
                .entry(local.date_naive())
                .or_insert_with(|| std::array::from_fn(|_| Mean::new()))[local.hour() as usize]
                .add(temperature_unit.convert(temperature));
        }
        let columns =
            means.into_iter().map(|(date, hours)| (date, hours.each_ref().map(estimate))).collect();
        Self { columns }
    }

    #[cfg(test)]
    pub fn get(&self, date: NaiveDate, hour: usize) -> Option<f64> {
        self.columns.get(&date).and_then(|column| column.get(hour).copied().flatten())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Cumulative usage by month and local hour of day.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HourMonthProfile {
    /// Keyed by `(month, hour)`, the month is 1-based.
    pub usage: BTreeMap<(u32, u32), KilowattHours>,
}

impl HourMonthProfile {
    #[must_use]
    pub fn new(records: &[UsageRecord], time_zone: Tz) -> Self {
        let mut usage = BTreeMap::new();
        for record in records {
            let local = record.timestamp_start.with_timezone(&time_zone);
            *usage.entry((local.month(), local.hour())).or_insert(KilowattHours::ZERO) +=
                record.usage;
        }
        Self { usage }
    }

    /// Months having any usage, in calendar order.
    #[must_use]
    pub fn months(&self) -> Vec<u32> {
        let mut months: Vec<_> = self.usage.keys().map(|(month, _)| *month).collect();
        months.dedup();
        months
    }

    #[must_use]
    pub fn get(&self, month: u32, hour: u32) -> KilowattHours {
        self.usage.get(&(month, hour)).copied().unwrap_or(KilowattHours::ZERO)
    }

    #[cfg(test)]
    pub fn total(&self) -> KilowattHours {
        self.usage.values().copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeDelta;
    use chrono_tz::America::Los_Angeles;

    use super::*;
    use crate::core::fixtures::{local, usage_series, weather_series};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_usage_pivot() {
        let usage = usage_series(local(2024, 1, 1, 22), TimeDelta::hours(1), 4, 1.5);
        let pivot = HourlyPivot::usage(&usage, Los_Angeles);
        assert_eq!(pivot.columns.len(), 2);
        assert_abs_diff_eq!(pivot.get(date(2024, 1, 1), 23).unwrap(), 1.5);
        assert_abs_diff_eq!(pivot.get(date(2024, 1, 2), 1).unwrap(), 1.5);
        assert_eq!(pivot.get(date(2024, 1, 2), 2), None);
    }

    #[test]
    fn test_fall_back_hour_is_merged() {
        let usage = usage_series(local(2024, 11, 3, 0), TimeDelta::hours(1), 25, 1.0);
        let pivot = HourlyPivot::usage(&usage, Los_Angeles);
        let column = pivot.columns[&date(2024, 11, 3)];
        assert_abs_diff_eq!(column[1].unwrap(), 2.0);
        assert_abs_diff_eq!(column.iter().flatten().sum::<f64>(), 25.0);

        let weather = weather_series(local(2024, 11, 3, 0), 25, f64::from);
        let pivot = HourlyPivot::temperature(&weather, Los_Angeles, TemperatureUnit::Celsius);
        assert_abs_diff_eq!(pivot.get(date(2024, 11, 3), 1).unwrap(), 1.5);
        assert_abs_diff_eq!(pivot.get(date(2024, 11, 3), 2).unwrap(), 3.0);
    }

    #[test]
    fn test_spring_forward_hour_is_missing() {
        let usage = usage_series(local(2024, 3, 10, 0), TimeDelta::hours(1), 23, 1.0);
        let pivot = HourlyPivot::usage(&usage, Los_Angeles);
        assert_eq!(pivot.get(date(2024, 3, 10), 2), None);
        assert!(pivot.get(date(2024, 3, 10), 3).is_some());
    }

    #[test]
    fn test_temperature_pivot_converts_units() {
        let weather = weather_series(local(2024, 7, 1, 12), 1, |_| 20.0);
        let pivot = HourlyPivot::temperature(&weather, Los_Angeles, TemperatureUnit::Fahrenheit);
        assert_abs_diff_eq!(pivot.get(date(2024, 7, 1), 12).unwrap(), 68.0);
    }

    #[test]
    fn test_hour_month_profile() {
        let mut usage = usage_series(local(2024, 1, 30, 0), TimeDelta::days(1), 3, 2.0);
        usage.extend(usage_series(local(2024, 2, 1, 18), TimeDelta::hours(1), 1, 1.0));
        let profile = HourMonthProfile::new(&usage, Los_Angeles);
        assert_eq!(profile.months(), [1, 2]);
        assert_abs_diff_eq!(profile.get(1, 0).0, 4.0);
        assert_abs_diff_eq!(profile.get(2, 0).0, 2.0);
        assert_abs_diff_eq!(profile.get(2, 18).0, 1.0);
        assert_abs_diff_eq!(profile.total().0, 7.0);
    }
}
