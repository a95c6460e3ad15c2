//! Series builders shared by the unit tests.

use chrono::{DateTime, TimeDelta, TimeZone};
use chrono_tz::{America::Los_Angeles, Tz};

use crate::{
    core::{
        usage::UsageRecord,
        weather::{WeatherMetrics, WeatherRecord},
    },
    quantity::{cost::Cost, energy::KilowattHours, temperature::Celsius},
};

pub fn local(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Tz> {
    Los_Angeles.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// Contiguous readings of the same usage, starting at `start`.
pub fn usage_series(
    start: DateTime<Tz>,
    step: TimeDelta,
    n_readings: i32,
    kwh: f64,
) -> Vec<UsageRecord> {
    (0..n_readings)
        .map(|index| UsageRecord {
            timestamp_start: start + step * index,
            duration: step,
            usage: KilowattHours(kwh),
            cost: Some(Cost(kwh * 0.4)),
        })
        .collect()
}

/// Hourly observations with the temperature given by the observation index.
pub fn weather_series(
    start: DateTime<Tz>,
    n_hours: i32,
    temperature: impl Fn(i32) -> f64,
) -> Vec<WeatherRecord> {
    (0..n_hours)
        .map(|index| {
            WeatherRecord::hourly(
                start + TimeDelta::hours(1) * index,
                WeatherMetrics { temperature: Some(Celsius(temperature(index))), ..Default::default() },
            )
        })
        .collect()
}
