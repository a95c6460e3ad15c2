use chrono_tz::Tz;

use crate::{
    chart::{self, DisplayOptions, Figure},
    core::{
        aggregate::{DailyTotal, daily_totals},
        align::{AlignedSeries, align, resample},
        error::PipelineError,
        interval::Interval,
        metric::Metric,
        pivot::{HourMonthProfile, HourlyPivot},
        usage::UsageRecord,
    },
    export::{Account, BillingPeriod, Export, PostalCode},
    prelude::*,
    weather::{DateRange, WeatherAdapter},
};

/// Everything one interaction shows.
pub struct Dashboard {
    pub account: Account,
    pub postal_code: PostalCode,
    pub billing: Vec<BillingPeriod>,
    pub series: AlignedSeries,
    pub daily_totals: Vec<DailyTotal>,
    pub figures: Vec<Figure>,

    /// Non-fatal problems the user should know about.
    pub notices: Vec<String>,
}

/// Re-runs the whole pipeline per interaction, the weather cache being the only retained state.
pub struct Session {
    weather: WeatherAdapter,
    time_zone: Tz,
}

impl Session {
    pub const fn new(weather: WeatherAdapter, time_zone: Tz) -> Self {
        Self { weather, time_zone }
    }

    /// Parse the export, fetch the weather, and build the figures.
    ///
    /// Unavailable weather degrades the dashboard to usage-only figures.
    #[instrument(skip_all, fields(n_bytes = content.len()))]
    pub async fn render(
        &mut self,
        content: &[u8],
        postal_code: Option<&PostalCode>,
        options: &DisplayOptions,
    ) -> Result<Dashboard, PipelineError> {
        let export = Export::parse(content, self.time_zone)?;
        let span = Interval::span(export.usage.iter().map(UsageRecord::interval))
            .ok_or_else(|| PipelineError::malformed("no interval readings"))?;
        let postal_code = postal_code
            .or(export.account.postal_code.as_ref())
            .cloned()
            .ok_or_else(|| PipelineError::malformed("no postal code in the service address"))?;
        info!(%span, %postal_code, "rendering…");

        let mut notices = Vec::new();
        let weather = match self
            .weather
            .fetch(&postal_code, DateRange::covering(span), self.time_zone)
            .await
        {
            Ok(weather) => Some(weather),
            Err(error @ PipelineError::WeatherUnavailable { .. }) => {
                warn!("{error}");
                notices.push(format!("{error}, showing the energy usage only"));
                None
            }
            Err(error) => return Err(error),
        };

        let (series, options) = if let Some(weather) = &weather {
            (align(&export.usage, weather, options.granularity)?, options.clone())
        } else {
            let series = resample(&export.usage, options.granularity)
                .ok_or_else(|| PipelineError::malformed("no interval readings"))?;
            (series, usage_only(options))
        };
        let n_missing = series.n_missing_weather();
        if weather.is_some() && n_missing != 0 {
            notices.push(format!("{n_missing} buckets have no weather observations"));
        }

        let daily_totals = daily_totals(&series.records, self.time_zone);
        let usage_pivot = HourlyPivot::usage(&export.usage, self.time_zone);
        let temperature_pivot = weather
            .as_deref()
            .map(|weather| {
                HourlyPivot::temperature(weather, self.time_zone, options.temperature_unit)
            })
            .unwrap_or_default();
        let [by_hour, by_month] =
            chart::hour_month_bars(&HourMonthProfile::new(&export.usage, self.time_zone));
        let figures = vec![
            chart::time_series(&series, &options),
            chart::daily(&daily_totals, &options),
            chart::heatmaps(
                &usage_pivot,
                &temperature_pivot,
                postal_code.as_str(),
                options.temperature_unit,
            ),
            by_hour,
            by_month,
        ];

        Ok(Dashboard {
            account: export.account,
            postal_code,
            billing: export.billing,
            series,
            daily_totals,
            figures,
            notices,
        })
    }
}

/// Drop the weather metrics, falling back to the usage when nothing remains.
fn usage_only(options: &DisplayOptions) -> DisplayOptions {
    let metrics = options.metrics & (Metric::Usage | Metric::Cost);
    DisplayOptions {
        metrics: if metrics.is_empty() { Metric::Usage.into() } else { metrics },
        ..options.clone()
    }
}
