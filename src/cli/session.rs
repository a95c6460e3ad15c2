use std::num::NonZeroUsize;

use chrono_tz::Tz;
use clap::Parser;
use reqwest::Url;

use crate::{
    api::{OpenMeteo, Zippopotam},
    export::PostalCode,
    prelude::*,
    session::Session,
    weather::WeatherAdapter,
};

#[derive(Parser)]
pub struct SessionArgs {
    /// Look up the weather for this postal code instead of the one in the service address.
    #[clap(long = "postal-code", env = "POSTAL_CODE")]
    pub postal_code: Option<PostalCode>,

    /// Number of weather responses kept for the session.
    #[clap(long = "weather-cache-capacity", env = "WEATHER_CACHE_CAPACITY", default_value = "16")]
    cache_capacity: NonZeroUsize,

    #[clap(long = "geocoder-url", env = "GEOCODER_URL", default_value = "https://api.zippopotam.us")]
    geocoder_url: Url,

    #[clap(
        long = "weather-url",
        env = "WEATHER_URL",
        default_value = "https://archive-api.open-meteo.com"
    )]
    weather_url: Url,
}

impl SessionArgs {
    pub fn new_session(&self, time_zone: Tz) -> Result<Session> {
        let weather = WeatherAdapter::new(
            Box::new(Zippopotam::try_new(self.geocoder_url.clone())?),
            Box::new(OpenMeteo::try_new(self.weather_url.clone())?),
            self.cache_capacity,
        );
        Ok(Session::new(weather, time_zone))
    }
}
