use std::fmt::{Display, Formatter};

use chrono::DateTime;
use chrono_tz::Tz;

use crate::{
    core::weather::WeatherMetrics,
    quantity::{cost::Cost, energy::KilowattHours, temperature::TemperatureUnit},
};

/// Anything carrying the usage and weather metrics of a time bucket.
pub trait Sample {
    fn timestamp(&self) -> DateTime<Tz>;

    fn usage(&self) -> KilowattHours;

    fn cost(&self) -> Option<Cost>;

    fn weather(&self) -> &WeatherMetrics;
}

/// Selectable series.
#[derive(Debug, clap::ValueEnum, enumset::EnumSetType)]
pub enum Metric {
    /// Consumed energy.
    Usage,

    /// Billed cost of the consumed energy.
    Cost,

    Temperature,

    DewPoint,

    RelativeHumidity,

    Precipitation,

    WindSpeed,

    /// Sea-level air pressure.
    Pressure,
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Usage => "Energy usage",
            Self::Cost => "Cost",
            Self::Temperature => "Temperature",
            Self::DewPoint => "Dew point",
            Self::RelativeHumidity => "Relative humidity",
            Self::Precipitation => "Precipitation",
            Self::WindSpeed => "Wind speed",
            Self::Pressure => "Pressure",
        })
    }
}

impl Metric {
    #[must_use]
    pub const fn unit(self, temperature_unit: TemperatureUnit) -> &'static str {
        match self {
            Self::Usage => "kWh",
            Self::Cost => "$",
            Self::Temperature | Self::DewPoint => temperature_unit.symbol(),
            Self::RelativeHumidity => "%",
            Self::Precipitation => "mm",
            Self::WindSpeed => "km/h",
            Self::Pressure => "hPa",
        }
    }

    /// Value of the metric in the display units.
    #[must_use]
    pub fn value<S: Sample>(self, sample: &S, temperature_unit: TemperatureUnit) -> Option<f64> {
        let weather = sample.weather();
        match self {
            Self::Usage => Some(sample.usage().0),
            Self::Cost => sample.cost().map(|cost| cost.0),
            Self::Temperature => weather.temperature.map(|value| temperature_unit.convert(value)),
            Self::DewPoint => weather.dew_point.map(|value| temperature_unit.convert(value)),
            Self::RelativeHumidity => weather.relative_humidity.map(|value| value.0),
            Self::Precipitation => weather.precipitation.map(|value| value.0),
            Self::WindSpeed => weather.wind_speed.map(|value| value.0),
            Self::Pressure => weather.pressure.map(|value| value.0),
        }
    }
}
