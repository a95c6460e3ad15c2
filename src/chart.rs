pub mod figure;

use std::num::NonZeroUsize;

use chrono::NaiveDate;
use enumset::EnumSet;

pub use self::figure::{
    Figure,
    HeatmapPanel,
    LinePanel,
    LinePoint,
    Panel,
    Stack,
    StackedBarPanel,
    Trace,
};
use crate::{
    core::{
        aggregate::{DailyTotal, rolling_average, series_mean},
        align::AlignedSeries,
        granularity::Granularity,
        metric::{Metric, Sample},
        pivot::{HourColumn, HourMonthProfile, HourlyPivot},
    },
    prelude::*,
    quantity::temperature::TemperatureUnit,
};

/// What the user has chosen to look at.
#[derive(Clone, Debug, bon::Builder)]
pub struct DisplayOptions {
    /// Alignment granularity, the coarser native one when not set.
    pub granularity: Option<Granularity>,

    #[builder(default = default_metrics())]
    pub metrics: EnumSet<Metric>,

    #[builder(default)]
    pub temperature_unit: TemperatureUnit,

    /// Window of the additional rolling-average trace, in buckets.
    pub rolling_window: Option<NonZeroUsize>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[must_use]
pub fn default_metrics() -> EnumSet<Metric> {
    Metric::Usage | Metric::Temperature
}

/// One line panel per selected metric over the aligned buckets.
#[instrument(skip_all, fields(n_records = series.records.len()))]
pub fn time_series(series: &AlignedSeries, options: &DisplayOptions) -> Figure {
    Figure {
        name: "time_series",
        title: format!("Line plots: {} energy and weather", series.granularity),
        panels: line_panels(&series.records, options),
    }
}

#[instrument(skip_all, fields(n_days = totals.len()))]
pub fn daily(totals: &[DailyTotal], options: &DisplayOptions) -> Figure {
    Figure {
        name: "daily",
        title: "Line plots: daily energy and weather".to_owned(),
        panels: line_panels(totals, options),
    }
}

fn line_panels<S: Sample>(samples: &[S], options: &DisplayOptions) -> Vec<Panel> {
    let unit = options.temperature_unit;
    options
        .metrics
        .iter()
        .map(|metric| {
            let points = samples
                .iter()
                .map(|sample| LinePoint {
                    timestamp: sample.timestamp(),
                    value: metric.value(sample, unit),
                })
                .collect();
            let mut traces = vec![Trace { name: metric.to_string(), points }];
            if let Some(window) = options.rolling_window {
                let points = rolling_average(samples, metric, window, unit)
                    .into_iter()
                    .map(|(timestamp, value)| LinePoint { timestamp, value })
                    .collect();
                traces.push(Trace { name: format!("{window}-bucket rolling average"), points });
            }
            Panel::Line(LinePanel {
                title: metric.to_string(),
                y_label: metric.unit(unit).to_owned(),
                traces,
                reference: series_mean(samples, metric, unit),
            })
        })
        .collect()
}

/// Hourly usage, hourly temperature, and the usage over the temperature.
///
/// Only the usage panel is there when the temperature is unknown.
#[instrument(skip_all, fields(n_days = usage.columns.len()))]
pub fn heatmaps(
    usage: &HourlyPivot,
    temperature: &HourlyPivot,
    location: &str,
    temperature_unit: TemperatureUnit,
) -> Figure {
    let dates: Vec<NaiveDate> = usage.columns.keys().copied().collect();
    let columns = |pivot: &HourlyPivot| -> Vec<HourColumn> {
        dates.iter().map(|date| pivot.columns.get(date).copied().unwrap_or([None; 24])).collect()
    };
    let usage_values = columns(usage);
    let mut panels = vec![Panel::Heatmap(HeatmapPanel {
        title: "Hourly energy usage".to_owned(),
        color_label: "kWh".to_owned(),
        dates: dates.clone(),
        values: usage_values.clone(),
        overlay: None,
    })];
    if !temperature.is_empty() {
        let temperature_values = columns(temperature);
        panels.push(Panel::Heatmap(HeatmapPanel {
            title: format!("Hourly temperature in {location}"),
            color_label: temperature_unit.to_string(),
            dates: dates.clone(),
            values: temperature_values.clone(),
            overlay: None,
        }));
        panels.push(Panel::Heatmap(HeatmapPanel {
            title: "Hourly energy usage (white) over hourly temperature".to_owned(),
            color_label: temperature_unit.to_string(),
            dates,
            values: temperature_values,
            overlay: Some(usage_values),
        }));
    }
    Figure {
        name: "heatmaps",
        title: "Heat maps: hourly energy, weather temperature, and high energy on top of weather"
            .to_owned(),
        panels,
    }
}

/// Cumulative usage by hour stacked by month, and by month stacked by hour.
#[must_use]
pub fn hour_month_bars(profile: &HourMonthProfile) -> [Figure; 2] {
    let months = profile.months();
    let month_names: Vec<_> = months.iter().map(|month| month_name(*month)).collect();
    let hour_names: Vec<_> = (0..24).map(|hour| format!("{hour:02}:00")).collect();

    let by_hour = StackedBarPanel {
        title: "Cumulative energy usage by hour of day".to_owned(),
        x_label: "Hour of day".to_owned(),
        y_label: "kWh".to_owned(),
        categories: hour_names.clone(),
        stacks: months
            .iter()
            .zip(&month_names)
            .map(|(month, name)| Stack {
                name: name.clone(),
                values: (0..24).map(|hour| profile.get(*month, hour).0).collect(),
            })
            .collect(),
    };
    let by_month = StackedBarPanel {
        title: "Cumulative energy usage by month".to_owned(),
        x_label: "Month".to_owned(),
        y_label: "kWh".to_owned(),
        categories: month_names,
        stacks: (0..24)
            .zip(hour_names)
            .map(|(hour, name)| Stack {
                name,
                values: months.iter().map(|month| profile.get(*month, hour).0).collect(),
            })
            .collect(),
    };
    [
        Figure {
            name: "usage_by_hour",
            title: "Bar chart: energy usage by hour, stacked by month".to_owned(),
            panels: vec![Panel::StackedBar(by_hour)],
        },
        Figure {
            name: "usage_by_month",
            title: "Bar chart: energy usage by month, stacked by hour".to_owned(),
            panels: vec![Panel::StackedBar(by_month)],
        },
    ]
}

fn month_name(month: u32) -> String {
    NaiveDate::from_ymd_opt(2000, month, 1)
        .map_or_else(|| month.to_string(), |date| date.format("%b").to_string())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeDelta;
    use chrono_tz::America::Los_Angeles;

    use super::*;
    use crate::core::{
        align::align,
        fixtures::{local, usage_series, weather_series},
    };

    fn line(panel: &Panel) -> &LinePanel {
        match panel {
            Panel::Line(panel) => panel,
            _ => panic!("not a line panel"),
        }
    }

    #[test]
    fn test_time_series_panels() -> Result {
        let usage = usage_series(local(2024, 7, 1, 0), TimeDelta::hours(1), 24, 1.0);
        let weather = weather_series(local(2024, 7, 1, 0), 24, |_| 20.0);
        let series = align(&usage, &weather, None)?;
        let options = DisplayOptions::builder()
            .temperature_unit(TemperatureUnit::Celsius)
            .rolling_window(NonZeroUsize::new(4).unwrap())
            .build();
        let figure = time_series(&series, &options);
        assert_eq!(figure.panels.len(), 2);

        let usage_panel = line(&figure.panels[0]);
        assert_eq!(usage_panel.y_label, "kWh");
        assert_abs_diff_eq!(usage_panel.reference.unwrap(), 1.0);
        assert_eq!(usage_panel.traces[0].points.len(), 24);
        assert_eq!(usage_panel.traces[1].points.len(), 21);

        let temperature_panel = line(&figure.panels[1]);
        assert_eq!(temperature_panel.y_label, "°C");
        assert_abs_diff_eq!(temperature_panel.reference.unwrap(), 20.0);
        Ok(())
    }

    #[test]
    fn test_figure_is_serializable() -> Result {
        let usage = usage_series(local(2024, 7, 1, 0), TimeDelta::hours(1), 2, 1.0);
        let weather = weather_series(local(2024, 7, 1, 0), 2, |_| 20.0);
        let series = align(&usage, &weather, None)?;
        let options = DisplayOptions::builder().metrics(Metric::Usage.into()).build();
        let value = serde_json::to_value(time_series(&series, &options))?;
        assert_eq!(value["name"], "time_series");
        assert_eq!(value["panels"][0]["kind"], "line");
        assert_eq!(value["panels"][0]["traces"][0]["points"][1]["value"], 1.0);
        Ok(())
    }

    #[test]
    fn test_heatmaps_without_temperature() {
        let usage = usage_series(local(2024, 7, 1, 0), TimeDelta::hours(1), 48, 1.0);
        let usage = HourlyPivot::usage(&usage, Los_Angeles);
        let figure =
            heatmaps(&usage, &HourlyPivot::default(), "95125", TemperatureUnit::Fahrenheit);
        assert_eq!(figure.panels.len(), 1);
    }

    #[test]
    fn test_heatmaps_with_overlay() {
        let usage = usage_series(local(2024, 7, 1, 0), TimeDelta::hours(1), 48, 1.0);
        let weather = weather_series(local(2024, 7, 1, 0), 24, |_| 20.0);
        let usage = HourlyPivot::usage(&usage, Los_Angeles);
        let temperature =
            HourlyPivot::temperature(&weather, Los_Angeles, TemperatureUnit::Fahrenheit);
        let figure = heatmaps(&usage, &temperature, "95125", TemperatureUnit::Fahrenheit);
        assert_eq!(figure.panels.len(), 3);
        let Panel::Heatmap(overlaid) = &figure.panels[2] else { panic!("not a heat map") };
        assert_eq!(overlaid.dates.len(), 2);
        assert_eq!(overlaid.values[1], [None; 24]);
        assert!(overlaid.overlay.is_some());
    }

    #[test]
    fn test_hour_month_bars() {
        let mut usage = usage_series(local(2024, 1, 31, 0), TimeDelta::hours(1), 24, 1.0);
        usage.extend(usage_series(local(2024, 2, 1, 0), TimeDelta::hours(1), 24, 2.0));
        let profile = HourMonthProfile::new(&usage, Los_Angeles);
        let [by_hour, by_month] = hour_month_bars(&profile);

        let Panel::StackedBar(by_hour) = &by_hour.panels[0] else { panic!("not a bar chart") };
        assert_eq!(by_hour.categories.len(), 24);
        assert_eq!(by_hour.categories[13], "13:00");
        assert_eq!(by_hour.stacks.len(), 2);
        assert_eq!(by_hour.stacks[1].name, "Feb");

        let Panel::StackedBar(by_month) = &by_month.panels[0] else { panic!("not a bar chart") };
        assert_eq!(by_month.categories, ["Jan", "Feb"]);
        assert_eq!(by_month.stacks.len(), 24);
        let total: f64 = by_month.stacks.iter().flat_map(|stack| &stack.values).sum();
        assert_abs_diff_eq!(total, 72.0);
    }
}
