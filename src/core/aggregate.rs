use std::{collections::BTreeMap, num::NonZeroUsize};

use average::Mean;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

use crate::{
    core::{
        align::AlignedRecord,
        granularity::start_of_day,
        metric::{Metric, Sample},
        weather::{MeanMetrics, WeatherMetrics, estimate},
    },
    prelude::*,
    quantity::{
        cost::{Cost, add_optional},
        energy::KilowattHours,
        temperature::TemperatureUnit,
    },
};

/// Totals of a local calendar day.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub start: DateTime<Tz>,
    pub usage: KilowattHours,
    pub cost: Option<Cost>,

    /// Mean of the bucket means.
    pub weather: WeatherMetrics,
}

impl Sample for DailyTotal {
    fn timestamp(&self) -> DateTime<Tz> {
        self.start
    }

    fn usage(&self) -> KilowattHours {
        self.usage
    }

    fn cost(&self) -> Option<Cost> {
        self.cost
    }

    fn weather(&self) -> &WeatherMetrics {
        &self.weather
    }
}

/// Sum the buckets by the local date of their start.
#[instrument(skip_all, fields(n_records = records.len()))]
pub fn daily_totals(records: &[AlignedRecord], time_zone: Tz) -> Vec<DailyTotal> {
    let mut days: BTreeMap<NaiveDate, (KilowattHours, Option<Cost>, MeanMetrics)> =
        BTreeMap::new();
    for record in records {
        let date = record.interval.start.with_timezone(&time_zone).date_naive();
        let (usage, cost, weather) =
            days.entry(date).or_insert_with(|| (KilowattHours::ZERO, None, MeanMetrics::default()));
        *usage += record.usage;
        *cost = add_optional(*cost, record.cost);
        weather.add(&record.weather);
    }
    let totals: Vec<_> = days
        .into_iter()
        .map(|(date, (usage, cost, weather))| DailyTotal {
            date,
            start: start_of_day(time_zone, date),
            usage,
            cost,
            weather: weather.finish(),
        })
        .collect();
    debug!(n_days = totals.len(), "aggregated");
    totals
}

/// Trailing average over `window` samples, keyed by the window's last sample.
///
/// Windows shorter than requested are omitted, so the series is `window - 1` samples shorter.
pub fn rolling_average<S: Sample>(
    samples: &[S],
    metric: Metric,
    window: NonZeroUsize,
    temperature_unit: TemperatureUnit,
) -> Vec<(DateTime<Tz>, Option<f64>)> {
    samples
        .windows(window.get())
        .filter_map(|window| {
            let last = window.last()?;
            let values = window.iter().map(|sample| metric.value(sample, temperature_unit));
            Some((last.timestamp(), mean(values)))
        })
        .collect()
}

/// Mean of the metric over the whole series.
pub fn series_mean<S: Sample>(
    samples: &[S],
    metric: Metric,
    temperature_unit: TemperatureUnit,
) -> Option<f64> {
    mean(samples.iter().map(|sample| metric.value(sample, temperature_unit)))
}

/// Mean of the present values.
pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let mean: Mean = values.into_iter().flatten().collect();
    estimate(&mean)
}
