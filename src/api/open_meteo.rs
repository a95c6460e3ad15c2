//! [Open-Meteo](https://open-meteo.com/en/docs/historical-weather-api) historical weather archive.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_with::serde_as;

use crate::{
    api::client,
    core::weather::WeatherMetrics,
    prelude::*,
    quantity::{
        atmosphere::{Hectopascals, KilometersPerHour, Millimeters, Percentage},
        temperature::Celsius,
    },
    weather::{DateRange, Location, Observation, WeatherSource},
};

const HOURLY: &str = "temperature_2m,dew_point_2m,relative_humidity_2m,precipitation,wind_speed_10m,pressure_msl";

pub struct Api {
    client: Client,
    base_url: Url,
}

impl Api {
    pub fn try_new(base_url: Url) -> Result<Self> {
        Ok(Self { client: client::try_new()?, base_url })
    }
}

#[async_trait]
impl WeatherSource for Api {
    #[instrument(skip_all, fields(location = %location.name, range = %range))]
    async fn get_hourly(&self, location: &Location, range: DateRange) -> Result<Vec<Observation>> {
        info!("fetching…");
        let mut url = client::join(&self.base_url, &["v1", "archive"])?;
        url.query_pairs_mut()
            .append_pair("latitude", &location.latitude.to_string())
            .append_pair("longitude", &location.longitude.to_string())
            .append_pair("start_date", &range.start.to_string())
            .append_pair("end_date", &range.end.to_string())
            .append_pair("hourly", HOURLY)
            .append_pair("timezone", "GMT")
            .append_pair("timeformat", "unixtime");
        let response = self.client.get(url).send().await.context("failed to call")?;
        if response.status().is_client_error() {
            let error = response
                .json::<ErrorResponse>()
                .await
                .context("failed to deserialize the error")?;
            bail!("{}", error.reason);
        }
        let response = response
            .error_for_status()
            .context("request failed")?
            .json::<Response>()
            .await
            .context("failed to deserialize the response")?;
        let observations = response.hourly.into_observations();
        info!(n_observations = observations.len(), "fetched");
        Ok(observations)
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    reason: String,
}

#[derive(Deserialize)]
struct Response {
    hourly: Hourly,
}

/// Column-oriented hourly series, any metric column may be absent or have gaps.
#[serde_as]
#[derive(Deserialize)]
struct Hourly {
    #[serde_as(as = "Vec<serde_with::TimestampSeconds<i64>>")]
    time: Vec<DateTime<Utc>>,

    #[serde(rename = "temperature_2m", default)]
    temperature: Vec<Option<f64>>,

    #[serde(rename = "dew_point_2m", default)]
    dew_point: Vec<Option<f64>>,

    #[serde(rename = "relative_humidity_2m", default)]
    relative_humidity: Vec<Option<f64>>,

    #[serde(default)]
    precipitation: Vec<Option<f64>>,

    #[serde(rename = "wind_speed_10m", default)]
    wind_speed: Vec<Option<f64>>,

    #[serde(rename = "pressure_msl", default)]
    pressure: Vec<Option<f64>>,
}

impl Hourly {
    fn into_observations(self) -> Vec<Observation> {
        let at = |column: &[Option<f64>], index: usize| column.get(index).copied().flatten();
        self.time
            .iter()
            .enumerate()
            .map(|(index, timestamp)| Observation {
                timestamp: *timestamp,
                metrics: WeatherMetrics {
                    temperature: at(&self.temperature, index).map(Celsius),
                    dew_point: at(&self.dew_point, index).map(Celsius),
                    relative_humidity: at(&self.relative_humidity, index).map(Percentage),
                    precipitation: at(&self.precipitation, index).map(Millimeters),
                    wind_speed: at(&self.wind_speed, index).map(KilometersPerHour),
                    pressure: at(&self.pressure, index).map(Hectopascals),
                },
            })
            .collect()
    }
}
