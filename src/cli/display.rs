use std::num::NonZeroUsize;

use clap::Parser;

use crate::{
    chart::DisplayOptions,
    core::{granularity::Granularity, metric::Metric},
    quantity::temperature::TemperatureUnit,
};

#[derive(Parser)]
pub struct DisplayArgs {
    /// Alignment granularity, the coarser native one of the two series by default.
    #[clap(long, env = "GRANULARITY")]
    granularity: Option<Granularity>,

    /// Plotted metrics, comma-separated.
    #[clap(
        long = "metrics",
        env = "METRICS",
        value_delimiter = ',',
        default_value = "usage,temperature"
    )]
    metrics: Vec<Metric>,

    #[clap(long = "temperature-unit", env = "TEMPERATURE_UNIT", default_value = "fahrenheit")]
    temperature_unit: TemperatureUnit,

    /// Add a rolling average over this many buckets.
    #[clap(long = "rolling-window", env = "ROLLING_WINDOW")]
    rolling_window: Option<NonZeroUsize>,
}

impl DisplayArgs {
    pub fn options(&self) -> DisplayOptions {
        DisplayOptions::builder()
            .maybe_granularity(self.granularity)
            .metrics(self.metrics.iter().copied().collect())
            .temperature_unit(self.temperature_unit)
            .maybe_rolling_window(self.rolling_window)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DisplayArgs::parse_from(["display"]).options();
        assert_eq!(options.granularity, None);
        assert_eq!(options.metrics, Metric::Usage | Metric::Temperature);
        assert_eq!(options.temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(options.rolling_window, None);
    }

    #[test]
    fn test_explicit() {
        let options = DisplayArgs::parse_from([
            "display",
            "--granularity",
            "15min",
            "--metrics",
            "cost,dew-point",
            "--temperature-unit",
            "celsius",
            "--rolling-window",
            "24",
        ])
        .options();
        assert_eq!(options.granularity, Some(Granularity::QuarterHourly));
        assert_eq!(options.metrics, Metric::Cost | Metric::DewPoint);
        assert_eq!(options.temperature_unit, TemperatureUnit::Celsius);
        assert_eq!(options.rolling_window.map(NonZeroUsize::get), Some(24));
    }
}
