use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{aggregate::DailyTotal, align::AlignedSeries},
    export::{Account, BillingPeriod},
    quantity::{
        cost::{Cost, add_optional},
        energy::KilowattHours,
        temperature::TemperatureUnit,
    },
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

#[must_use]
pub fn build_summary_table(
    account: &Account,
    location: &str,
    series: &AlignedSeries,
    notices: &[String],
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Summary", ""]);
    let total_cost = series.records.iter().map(|record| record.cost).fold(None, add_optional);
    let rows = [
        ("Account", account.name.clone().unwrap_or_default()),
        ("Address", account.address.clone().unwrap_or_default()),
        ("Weather at", location.to_owned()),
        ("Period", series.span().map(|span| span.to_string()).unwrap_or_default()),
        ("Granularity", series.granularity.to_string()),
        ("Buckets", series.records.len().to_string()),
        ("Without weather", series.n_missing_weather().to_string()),
        ("Usage", format!("{:.1}", series.total_usage())),
        ("Cost", total_cost.map(|cost| cost.to_string()).unwrap_or_default()),
    ];
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key).add_attribute(Attribute::Bold), Cell::new(value)]);
    }
    for notice in notices {
        table.add_row(vec![
            Cell::new("Notice").add_attribute(Attribute::Bold).fg(Color::DarkYellow),
            Cell::new(notice).fg(Color::DarkYellow),
        ]);
    }
    table
}

/// Daily totals, usage is coloured against the mean daily usage.
#[must_use]
pub fn build_daily_table(totals: &[DailyTotal], temperature_unit: TemperatureUnit) -> Table {
    #[allow(clippy::cast_precision_loss)]
    let mean_usage =
        totals.iter().map(|total| total.usage).sum::<KilowattHours>() / totals.len().max(1) as f64;

    let mut table = new_table();
    table.set_header(vec!["Date", "Usage", "Cost", "Price", "Temperature", "Dew point"]);
    for total in totals {
        let price = total
            .cost
            .filter(|_| total.usage > KilowattHours::ZERO)
            .map(|cost| format!("{:.3} $/kWh", cost.0 / total.usage.0));
        let temperature = |value: Option<_>| {
            value.map_or_else(String::new, |value| {
                format!("{:.1} {temperature_unit}", temperature_unit.convert(value))
            })
        };
        table.add_row(vec![
            Cell::new(total.date.format("%a %Y-%m-%d")),
            Cell::new(format!("{:.2}", total.usage))
                .set_alignment(CellAlignment::Right)
                .fg(if total.usage >= mean_usage { Color::Red } else { Color::Green }),
            Cell::new(total.cost.map(|cost| cost.to_string()).unwrap_or_default())
                .set_alignment(CellAlignment::Right),
            Cell::new(price.unwrap_or_default())
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            Cell::new(temperature(total.weather.temperature)).set_alignment(CellAlignment::Right),
            Cell::new(temperature(total.weather.dew_point))
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

#[must_use]
pub fn build_billing_table(periods: &[BillingPeriod]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Start", "End", "Usage", "Cost"]);
    for period in periods {
        table.add_row(vec![
            Cell::new(period.start),
            Cell::new(period.end),
            Cell::new(format!("{:.1}", period.usage)).set_alignment(CellAlignment::Right),
            Cell::new(period.cost.as_ref().map(Cost::to_string).unwrap_or_default())
                .set_alignment(CellAlignment::Right)
                .fg(if period.cost.is_some() { Color::Reset } else { Color::DarkGrey }),
        ]);
    }
    table
}
