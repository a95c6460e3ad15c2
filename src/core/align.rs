use std::collections::BTreeMap;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::{
    core::{
        error::PipelineError,
        granularity::Granularity,
        interval::Interval,
        metric::Sample,
        usage::{UsageRecord, native_granularity},
        weather::{MeanMetrics, WeatherMetrics, WeatherRecord},
    },
    prelude::*,
    quantity::{
        cost::{Cost, add_optional},
        energy::KilowattHours,
    },
};

/// One bucket of the joined series.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AlignedRecord {
    pub interval: Interval,

    /// Sum of the readings starting within the bucket.
    pub usage: KilowattHours,

    /// Sum of the reported costs, `None` when no reading within the bucket reported one.
    pub cost: Option<Cost>,

    /// Per-metric mean of the observations overlapping the bucket.
    pub weather: WeatherMetrics,
}

impl Sample for AlignedRecord {
    fn timestamp(&self) -> DateTime<Tz> {
        self.interval.start
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

#[derive(Clone, Debug, PartialEq)]
pub struct AlignedSeries {
    pub granularity: Granularity,
    pub records: Vec<AlignedRecord>,
}

impl AlignedSeries {
    #[must_use]
    pub fn total_usage(&self) -> KilowattHours {
        self.records.iter().map(|record| record.usage).sum()
    }

    #[must_use]
    pub fn span(&self) -> Option<Interval> {
        Interval::span(self.records.iter().map(|record| record.interval))
    }

    /// Number of buckets without any weather observation.
    #[must_use]
    pub fn n_missing_weather(&self) -> usize {
        self.records.iter().filter(|record| record.weather.is_empty()).count()
    }

    /// Turn the buckets back into usage readings and weather observations.
    #[cfg(test)]
    pub fn split(&self) -> (Vec<UsageRecord>, Vec<WeatherRecord>) {
        self.records
            .iter()
            .map(|record| {
                let usage = UsageRecord {
                    timestamp_start: record.interval.start,
                    duration: record.interval.duration(),
                    usage: record.usage,
                    cost: record.cost,
                };
                let weather = WeatherRecord {
                    timestamp: record.interval.start,
                    duration: record.interval.duration(),
                    metrics: record.weather,
                };
                (usage, weather)
            })
            .unzip()
    }
}

/// Join the usage and weather series on their common time window.
///
/// Without an explicit granularity, the coarser of the two native ones is used.
#[instrument(skip_all, fields(n_readings = usage.len(), n_observations = weather.len()))]
pub fn align(
    usage: &[UsageRecord],
    weather: &[WeatherRecord],
    granularity: Option<Granularity>,
) -> Result<AlignedSeries, PipelineError> {
    let usage_span = Interval::span(usage.iter().map(UsageRecord::interval));
    let weather_span = Interval::span(weather.iter().map(WeatherRecord::interval));
    let window = usage_span
        .zip(weather_span)
        .and_then(|(usage_span, weather_span)| usage_span.intersection(weather_span))
        .ok_or_else(|| PipelineError::RangeMismatch {
            usage: describe(usage_span),
            weather: describe(weather_span),
        })?;
    let weather_granularity = weather
        .first()
        .and_then(|record| Granularity::from_duration(record.duration))
        .unwrap_or(Granularity::Hourly);
    let granularity = choose_granularity(usage, weather_granularity, granularity);
    info!(%window, ?granularity, "aligning…");
    Ok(bucketize(usage, weather, window, granularity))
}

/// Bucket the usage series alone, leaving the weather missing.
///
/// This is what gets plotted when the weather is unavailable.
#[instrument(skip_all, fields(n_readings = usage.len()))]
pub fn resample(usage: &[UsageRecord], granularity: Option<Granularity>) -> Option<AlignedSeries> {
    let window = Interval::span(usage.iter().map(UsageRecord::interval))?;
    let native = native_granularity(usage).unwrap_or(Granularity::Hourly);
    Some(bucketize(usage, &[], window, choose_granularity(usage, native, granularity)))
}

fn choose_granularity(
    usage: &[UsageRecord],
    other: Granularity,
    requested: Option<Granularity>,
) -> Granularity {
    let native = native_granularity(usage).unwrap_or(Granularity::Hourly);
    match requested {
        None => native.max(other),
        Some(requested) if requested < native => {
            warn!(?requested, ?native, "readings cannot be split, using the native granularity");
            native
        }
        Some(requested) => requested,
    }
}

fn bucketize(
    usage: &[UsageRecord],
    weather: &[WeatherRecord],
    window: Interval,
    granularity: Granularity,
) -> AlignedSeries {
    let mut usage_buckets: BTreeMap<DateTime<Tz>, (KilowattHours, Option<Cost>)> = BTreeMap::new();
    for record in usage {
        let (total, cost) = usage_buckets
            .entry(granularity.bucket_start(record.timestamp_start))
            .or_insert((KilowattHours::ZERO, None));
        *total += record.usage;
        *cost = add_optional(*cost, record.cost);
    }

    let mut weather_buckets: BTreeMap<DateTime<Tz>, MeanMetrics> = BTreeMap::new();
    for record in weather {
        for bucket in granularity.buckets(record.interval()) {
            weather_buckets.entry(bucket.start).or_default().add(&record.metrics);
        }
    }

    // Past the last reading the data has ended, as opposed to a gap which means no consumption:
    let last_reading = usage.iter().map(|record| record.timestamp_start).max();
    let mut n_gaps = 0_usize;
    let records: Vec<_> = granularity
        .buckets(window)
        .take_while(|bucket| last_reading.is_some_and(|last_reading| bucket.start <= last_reading))
        .map(|bucket| {
            let (usage, cost) = usage_buckets.get(&bucket.start).copied().unwrap_or_else(|| {
                n_gaps += 1;
                (KilowattHours::ZERO, None)
            });
            let weather =
                weather_buckets.get(&bucket.start).map(MeanMetrics::finish).unwrap_or_default();
            AlignedRecord { interval: bucket, usage, cost, weather }
        })
        .collect();
    debug!(n_buckets = records.len(), n_gaps, "bucketized");
    AlignedSeries { granularity, records }
}

fn describe(span: Option<Interval>) -> String {
    span.map_or_else(|| "empty".to_string(), |span| span.to_string())
}
