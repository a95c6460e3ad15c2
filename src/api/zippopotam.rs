//! [Zippopotam.us](https://www.zippopotam.us) postal code lookup.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_with::serde_as;

use crate::{
    api::client,
    export::PostalCode,
    prelude::*,
    weather::{Geocoder, Location},
};

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
impl Geocoder for Api {
    #[instrument(skip_all, fields(postal_code = %postal_code))]
    async fn locate(&self, postal_code: &PostalCode) -> Result<Option<Location>> {
        info!("locating…");
        let url = client::join(&self.base_url, &["us", postal_code.as_str()])?;
        let response = self.client.get(url).send().await.context("failed to call")?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!("not found");
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .context("request failed")?
            .json::<Response>()
            .await
            .context("failed to deserialize the response")?;
        Ok(response.places.into_iter().next().map(Location::from))
    }
}

#[derive(Deserialize)]
struct Response {
    places: Vec<Place>,
}

#[serde_as]
#[derive(Deserialize)]
struct Place {
    #[serde(rename = "place name")]
    name: String,

    #[serde(rename = "state abbreviation")]
    state: String,

    #[serde_as(as = "serde_with::DisplayFromStr")]
    latitude: f64,

    #[serde_as(as = "serde_with::DisplayFromStr")]
    longitude: f64,
}

impl From<Place> for Location {
    fn from(place: Place) -> Self {
        Self {
            name: format!("{}, {}", place.name, place.state),
            latitude: place.latitude,
            longitude: place.longitude,
        }
    }
}
