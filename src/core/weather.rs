use average::{Estimate, Mean};
use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{
    core::interval::Interval,
    quantity::{
        atmosphere::{Hectopascals, KilometersPerHour, Millimeters, Percentage},
        temperature::Celsius,
    },
};

/// Observed weather. Any of the metrics may be missing, which is normal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct WeatherMetrics {
    pub temperature: Option<Celsius>,
    pub dew_point: Option<Celsius>,
    pub relative_humidity: Option<Percentage>,
    pub precipitation: Option<Millimeters>,
    pub wind_speed: Option<KilometersPerHour>,
    pub pressure: Option<Hectopascals>,
}

impl WeatherMetrics {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.dew_point.is_none()
            && self.relative_humidity.is_none()
            && self.precipitation.is_none()
            && self.wind_speed.is_none()
            && self.pressure.is_none()
    }
}

/// Weather observed over `duration` starting at `timestamp`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WeatherRecord {
    pub timestamp: DateTime<Tz>,
    pub duration: TimeDelta,
    pub metrics: WeatherMetrics,
}

impl WeatherRecord {
    pub fn hourly(timestamp: DateTime<Tz>, metrics: WeatherMetrics) -> Self {
        Self { timestamp, duration: TimeDelta::hours(1), metrics }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.timestamp, self.timestamp + self.duration)
    }
}

/// Per-metric arithmetic mean: weather quantities are intensive, so they never get summed up.
///
/// Missing values are skipped, and a metric with no values at all stays missing.
#[derive(Clone, Default)]
pub struct MeanMetrics {
    temperature: Mean,
    dew_point: Mean,
    relative_humidity: Mean,
    precipitation: Mean,
    wind_speed: Mean,
    pressure: Mean,
}

impl MeanMetrics {
    pub fn add(&mut self, metrics: &WeatherMetrics) {
        add_some(&mut self.temperature, metrics.temperature.map(|value| value.0));
        add_some(&mut self.dew_point, metrics.dew_point.map(|value| value.0));
        add_some(&mut self.relative_humidity, metrics.relative_humidity.map(|value| value.0));
        add_some(&mut self.precipitation, metrics.precipitation.map(|value| value.0));
        add_some(&mut self.wind_speed, metrics.wind_speed.map(|value| value.0));
        add_some(&mut self.pressure, metrics.pressure.map(|value| value.0));
    }

    #[must_use]
    pub fn finish(&self) -> WeatherMetrics {
        WeatherMetrics {
            temperature: estimate(&self.temperature).map(Celsius),
            dew_point: estimate(&self.dew_point).map(Celsius),
            relative_humidity: estimate(&self.relative_humidity).map(Percentage),
            precipitation: estimate(&self.precipitation).map(Millimeters),
            wind_speed: estimate(&self.wind_speed).map(KilometersPerHour),
            pressure: estimate(&self.pressure).map(Hectopascals),
        }
    }
}

impl<'a> FromIterator<&'a WeatherMetrics> for MeanMetrics {
    fn from_iter<T: IntoIterator<Item = &'a WeatherMetrics>>(iter: T) -> Self {
        let mut mean = Self::default();
        for metrics in iter {
            mean.add(metrics);
        }
        mean
    }
}

fn add_some(mean: &mut Mean, value: Option<f64>) {
    if let Some(value) = value {
        mean.add(value);
    }
}

/// Mean of the present values, `None` if there are none.
#[must_use]
pub fn estimate(mean: &Mean) -> Option<f64> {
    if mean.is_empty() { None } else { Some(mean.mean()) }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_mean_skips_missing_values() {
        let metrics = [
            WeatherMetrics { temperature: Some(Celsius(10.0)), ..Default::default() },
            WeatherMetrics::default(),
            WeatherMetrics {
                temperature: Some(Celsius(20.0)),
                precipitation: Some(Millimeters(1.0)),
                ..Default::default()
            },
        ];
        let mean = metrics.iter().collect::<MeanMetrics>().finish();
        assert_abs_diff_eq!(mean.temperature.unwrap().0, 15.0);
        assert_abs_diff_eq!(mean.precipitation.unwrap().0, 1.0);
        assert_eq!(mean.wind_speed, None);
    }

    #[test]
    fn test_mean_of_nothing_is_missing() {
        let mean = MeanMetrics::default().finish();
        assert!(mean.is_empty());
    }
}
