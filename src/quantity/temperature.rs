use std::fmt::{Display, Formatter};

quantity!(Celsius, "°C");

impl Celsius {
    #[must_use]
    pub fn to_fahrenheit(self) -> f64 {
        self.0 * 9.0 / 5.0 + 32.0
    }
}

/// Unit the temperatures are displayed in. Everything is stored in Celsius.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum, serde::Serialize)]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

impl TemperatureUnit {
    #[must_use]
    pub fn convert(self, temperature: Celsius) -> f64 {
        match self {
            Self::Fahrenheit => temperature.to_fahrenheit(),
            Self::Celsius => temperature.0,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Fahrenheit => "°F",
            Self::Celsius => "°C",
        }
    }
}

impl Display for TemperatureUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}
