//! In-memory geocoder and weather source.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{NaiveTime, TimeDelta};

use crate::{
    core::weather::WeatherMetrics,
    export::PostalCode,
    prelude::*,
    quantity::temperature::Celsius,
    weather::{DateRange, Geocoder, Location, Observation, WeatherSource},
};

/// The only postal code the fake geocoder knows.
pub const POSTAL_CODE: &str = "95125";

#[derive(Default)]
pub struct Counters {
    pub geocoder: Arc<AtomicUsize>,
    pub source: Arc<AtomicUsize>,
}

pub struct FakeGeocoder(pub Arc<AtomicUsize>);

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn locate(&self, postal_code: &PostalCode) -> Result<Option<Location>> {
        self.0.fetch_add(1, Ordering::Relaxed);
        Ok((postal_code.as_str() == POSTAL_CODE).then(|| Location {
            name: "San Jose, CA".to_owned(),
            latitude: 37.3,
            longitude: -121.9,
        }))
    }
}

/// Returns every hour of the requested range, in reverse and with a duplicate.
pub struct FakeSource {
    temperature: Option<f64>,
    is_failing: bool,
    n_calls: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn constant(temperature: f64) -> Self {
        Self { temperature: Some(temperature), is_failing: false, n_calls: Arc::default() }
    }

    /// Every metric is missing, like outside of the available history.
    pub fn empty() -> Self {
        Self { temperature: None, is_failing: false, n_calls: Arc::default() }
    }

    pub fn failing() -> Self {
        Self { temperature: None, is_failing: true, n_calls: Arc::default() }
    }

    pub fn with_counter(self, n_calls: Arc<AtomicUsize>) -> Self {
        Self { n_calls, ..self }
    }
}

#[async_trait]
impl WeatherSource for FakeSource {
    async fn get_hourly(&self, _location: &Location, range: DateRange) -> Result<Vec<Observation>> {
        self.n_calls.fetch_add(1, Ordering::Relaxed);
        ensure!(!self.is_failing, "service unavailable");
        let start = range.start.and_time(NaiveTime::MIN).and_utc();
        let n_hours = ((range.end - range.start).num_days() + 1) * 24;
        let metrics =
            WeatherMetrics { temperature: self.temperature.map(Celsius), ..Default::default() };
        let mut observations: Vec<_> = (0..n_hours)
            .rev()
            .map(|hour| Observation { timestamp: start + TimeDelta::hours(hour), metrics })
            .collect();
        observations.push(observations[0]);
        Ok(observations)
    }
}
