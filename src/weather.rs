pub mod cache;

#[cfg(test)]
pub mod fakes;

use std::{
    fmt::{Display, Formatter},
    num::NonZeroUsize,
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

use self::cache::WeatherCache;
use crate::{
    core::{
        error::PipelineError,
        interval::Interval,
        weather::{WeatherMetrics, WeatherRecord},
    },
    export::PostalCode,
    prelude::*,
};

/// Geographic point of a postal code.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Inclusive range of UTC dates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// UTC dates covering the interval, padded by a day on each side but never past today.
    #[must_use]
    pub fn covering(interval: Interval) -> Self {
        Self::covering_until(interval, Utc::now().date_naive())
    }

    fn covering_until(interval: Interval, today: NaiveDate) -> Self {
        let start = interval.start.to_utc().date_naive() - Days::new(1);
        let end = (interval.end.to_utc().date_naive() + Days::new(1)).min(today).max(start);
        Self { start, end }
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Hourly observation as reported by the source.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub metrics: WeatherMetrics,
}

#[async_trait]
pub trait Geocoder: Sync {
    /// Returns `None` for an unknown postal code.
    async fn locate(&self, postal_code: &PostalCode) -> Result<Option<Location>>;
}

#[async_trait]
pub trait WeatherSource: Sync {
    async fn get_hourly(&self, location: &Location, range: DateRange) -> Result<Vec<Observation>>;
}

/// Hourly weather by postal code, cached for the session.
pub struct WeatherAdapter {
    geocoder: Box<dyn Geocoder>,
    source: Box<dyn WeatherSource>,
    cache: WeatherCache,
}

impl WeatherAdapter {
    pub fn new(
        geocoder: Box<dyn Geocoder>,
        source: Box<dyn WeatherSource>,
        cache_capacity: NonZeroUsize,
    ) -> Self {
        Self { geocoder, source, cache: WeatherCache::new(cache_capacity) }
    }

    /// Fetch the weather and convert it into the time zone.
    ///
    /// Any failure is reported as the weather being unavailable, and nothing gets cached then.
    #[instrument(skip_all, fields(postal_code = %postal_code, range = %range))]
    pub async fn fetch(
        &mut self,
        postal_code: &PostalCode,
        range: DateRange,
        time_zone: Tz,
    ) -> Result<Vec<WeatherRecord>, PipelineError> {
        let key = (postal_code.clone(), range);
        let observations = if let Some(observations) = self.cache.get(&key) {
            debug!(n_observations = observations.len(), "cache hit");
            observations
        } else {
            let observations =
                self.fetch_uncached(postal_code, range).await.map_err(|error| {
                    PipelineError::WeatherUnavailable {
                        postal_code: postal_code.to_string(),
                        reason: format!("{error:#}"),
                    }
                })?;
            self.cache.insert(key, observations.clone());
            debug!(n_entries = self.cache.len(), "cached");
            observations
        };
        Ok(observations
            .iter()
            .map(|observation| {
                let timestamp = observation.timestamp.with_timezone(&time_zone);
                WeatherRecord::hourly(timestamp, observation.metrics)
            })
            .collect())
    }

    async fn fetch_uncached(
        &self,
        postal_code: &PostalCode,
        range: DateRange,
    ) -> Result<Arc<[Observation]>> {
        let location = self
            .geocoder
            .locate(postal_code)
            .await?
            .with_context(|| format!("unknown postal code {postal_code}"))?;
        info!(
            location = %location.name,
            latitude = location.latitude,
            longitude = location.longitude,
            "fetching…",
        );
        let mut observations = self.source.get_hourly(&location, range).await?;
        observations.sort_by_key(|observation| observation.timestamp);
        observations.dedup_by_key(|observation| observation.timestamp);

        // Hours outside the available history come back with every metric missing:
        observations.retain(|observation| !observation.metrics.is_empty());
        ensure!(!observations.is_empty(), "no observations from {range}");

        info!(n_observations = observations.len(), "fetched");
        Ok(observations.into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::TimeZone;
    use chrono_tz::America::Los_Angeles;

    use super::{fakes::*, *};
    use crate::core::fixtures::local;

    fn adapter(source: FakeSource) -> (WeatherAdapter, Counters) {
        let counters = Counters::default();
        let adapter = WeatherAdapter::new(
            Box::new(FakeGeocoder(counters.geocoder.clone())),
            Box::new(source.with_counter(counters.source.clone())),
            NonZeroUsize::new(4).unwrap(),
        );
        (adapter, counters)
    }

    fn january() -> DateRange {
        DateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        }
    }

    #[test]
    fn test_covering_range() {
        // 17:00 in Los Angeles is 01:00 UTC on the next day:
        let interval = Interval::new(local(2024, 1, 1, 0), local(2024, 1, 10, 17));
        let range = DateRange::covering(interval);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 1, 12).unwrap());
    }

    #[test]
    fn test_covering_range_stops_at_today() {
        let interval = Interval::new(local(2024, 1, 1, 0), local(2024, 1, 10, 17));
        let today = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let range = DateRange::covering_until(interval, today);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(range.end, today);
    }

    #[tokio::test]
    async fn test_fetch_sorts_and_converts() -> Result {
        let (mut adapter, _) = adapter(FakeSource::constant(10.0));
        let records = adapter.fetch(&POSTAL_CODE.parse()?, january(), Los_Angeles).await?;
        assert_eq!(records.len(), 48);
        let first = Los_Angeles.with_ymd_and_hms(2023, 12, 31, 16, 0, 0).unwrap();
        assert_eq!(records[0].timestamp, first);
        assert!(records.windows(2).all(|pair| pair[0].timestamp < pair[1].timestamp));
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_hit_skips_calls() -> Result {
        let (mut adapter, counters) = adapter(FakeSource::constant(10.0));
        let postal_code = POSTAL_CODE.parse()?;
        let first = adapter.fetch(&postal_code, january(), Los_Angeles).await?;
        let second = adapter.fetch(&postal_code, january(), Los_Angeles).await?;
        assert_eq!(first, second);
        assert_eq!(counters.geocoder.load(Ordering::Relaxed), 1);
        assert_eq!(counters.source.load(Ordering::Relaxed), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_postal_code_is_not_cached() -> Result {
        let (mut adapter, counters) = adapter(FakeSource::constant(10.0));
        let postal_code = "00000".parse()?;
        for _ in 0..2 {
            let result = adapter.fetch(&postal_code, january(), Los_Angeles).await;
            assert!(matches!(result, Err(PipelineError::WeatherUnavailable { .. })));
        }
        assert_eq!(counters.geocoder.load(Ordering::Relaxed), 2);
        assert_eq!(counters.source.load(Ordering::Relaxed), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_no_coverage() -> Result {
        let (mut adapter, _) = adapter(FakeSource::empty());
        let result = adapter.fetch(&POSTAL_CODE.parse()?, january(), Los_Angeles).await;
        assert!(matches!(result, Err(PipelineError::WeatherUnavailable { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_source_failure() -> Result {
        let (mut adapter, _) = adapter(FakeSource::failing());
        let error = adapter.fetch(&POSTAL_CODE.parse()?, january(), Los_Angeles).await.unwrap_err();
        assert!(error.to_string().contains("service unavailable"), "{error}");
        Ok(())
    }
}
