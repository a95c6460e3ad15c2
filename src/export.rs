//! PG&E «Download My Data» export.

pub mod account;
mod local_time;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use csv::{ReaderBuilder, StringRecord, Trim};
use itertools::Itertools;

pub use self::account::{Account, BillingPeriod, PostalCode};
use self::local_time::LocalTimeResolver;
use crate::{
    core::{
        error::PipelineError,
        granularity::{Granularity, start_of_day},
        usage::{UsageRecord, total_usage},
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours},
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parsed export: the account preamble, the interval readings, and the optional billing summary.
#[derive(Clone, Debug)]
pub struct Export {
    pub account: Account,

    /// Sorted by start, never overlapping, all of the same granularity.
    pub usage: Vec<UsageRecord>,

    pub billing: Vec<BillingPeriod>,
}

impl Export {
    #[instrument(skip_all, fields(n_bytes = content.len(), time_zone = %time_zone))]
    pub fn parse(content: &[u8], time_zone: Tz) -> Result<Self, PipelineError> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(content);

        let mut preamble = Vec::new();
        let mut section = None;
        let mut has_interval_header = false;
        let mut usage = Vec::new();
        let mut billing = Vec::new();
        let mut resolver = LocalTimeResolver::new(time_zone);

        for row in reader.records() {
            let row = row.map_err(PipelineError::malformed)?;
            let line = row.position().map_or(0, csv::Position::line);
            if row.iter().all(str::is_empty) {
                continue;
            }
            if row.get(0) == Some("TYPE") {
                let header = Section::from_header(&row, line)?;
                has_interval_header |= matches!(header, Section::Interval(_));
                section = Some(header);
                continue;
            }
            match &section {
                None => {
                    let key = cell(&row, 0).to_owned();
                    let value = row.iter().skip(1).filter(|cell| !cell.is_empty()).join(", ");
                    preamble.push((key, value));
                }
                Some(Section::Interval(columns)) => {
                    usage.push(columns.parse(&row, line, &mut resolver)?);
                }
                Some(Section::Billing(columns)) => {
                    billing.push(columns.parse(&row, line)?);
                }
            }
        }

        if !has_interval_header {
            return Err(PipelineError::malformed(format!(
                "no header row with the `TYPE`, `{DATE}`, `{START_TIME}`, `{END_TIME}` and `{USAGE}` columns",
            )));
        }
        validate(&mut usage)?;

        let account = Account::from_preamble(preamble);
        info!(
            n_readings = usage.len(),
            total_usage = %total_usage(&usage),
            n_billing_periods = billing.len(),
            postal_code = ?account.postal_code,
            "parsed",
        );
        Ok(Self { account, usage, billing })
    }
}

const DATE: &str = "DATE";
const START_TIME: &str = "START TIME";
const END_TIME: &str = "END TIME";
const START_DATE: &str = "START DATE";
const END_DATE: &str = "END DATE";
const USAGE: &str = "USAGE (kWh)";
const COST: &str = "COST";

enum Section {
    Interval(IntervalColumns),
    Billing(BillingColumns),
}

impl Section {
    /// Column names are matched literally. `NOTES` and anything unknown are ignored.
    fn from_header(header: &StringRecord, line: u64) -> Result<Self, PipelineError> {
        let find = |name: &str| header.iter().position(|cell| cell == name);
        let require = |name: &str| {
            find(name)
                .ok_or_else(|| PipelineError::malformed_at(line, format!("missing column `{name}`")))
        };
        if find(START_DATE).is_some() {
            Ok(Self::Billing(BillingColumns {
                start_date: require(START_DATE)?,
                end_date: require(END_DATE)?,
                usage: require(USAGE)?,
                cost: find(COST),
            }))
        } else {
            Ok(Self::Interval(IntervalColumns {
                date: require(DATE)?,
                start_time: require(START_TIME)?,
                end_time: require(END_TIME)?,
                usage: require(USAGE)?,
                cost: find(COST),
            }))
        }
    }
}

struct IntervalColumns {
    date: usize,
    start_time: usize,
    end_time: usize,
    usage: usize,
    cost: Option<usize>,
}

impl IntervalColumns {
    fn parse(
        &self,
        row: &StringRecord,
        line: u64,
        resolver: &mut LocalTimeResolver,
    ) -> Result<UsageRecord, PipelineError> {
        let date = parse_date(cell(row, self.date), line)?;
        let (start_time, offset) = parse_clock(cell(row, self.start_time), line)?;
        let (end_time, _) = parse_clock(cell(row, self.end_time), line)?;

        let local_start = date.and_time(start_time);
        let timestamp_start = match offset {
            Some(offset) => resolver.resolve_with_offset(local_start, offset),
            None => resolver.resolve(local_start),
        }
        .ok_or_else(|| {
            PipelineError::malformed_at(
                line,
                format!("`{local_start}` does not exist in {}", resolver.time_zone()),
            )
        })?;

        // The end time is inclusive to the minute:
        let mut duration = end_time - start_time + TimeDelta::minutes(1);
        if duration <= TimeDelta::zero() {
            duration += TimeDelta::days(1);
        }
        if duration == TimeDelta::days(1) {
            // A whole-day reading lasts 23 or 25 hours across a daylight-saving transition:
            let timestamp_end = if start_time == NaiveTime::MIN {
                Some(start_of_day(resolver.time_zone(), date + Days::new(1)))
            } else {
                resolver.time_zone().from_local_datetime(&(local_start + duration)).earliest()
            };
            if let Some(timestamp_end) = timestamp_end {
                duration = timestamp_end - timestamp_start;
            }
        }

        Ok(UsageRecord {
            timestamp_start,
            duration,
            usage: parse_usage(cell(row, self.usage), line)?,
            cost: self.cost.map(|index| parse_cost(cell(row, index), line)).transpose()?.flatten(),
        })
    }
}

struct BillingColumns {
    start_date: usize,
    end_date: usize,
    usage: usize,
    cost: Option<usize>,
}

impl BillingColumns {
    fn parse(&self, row: &StringRecord, line: u64) -> Result<BillingPeriod, PipelineError> {
        Ok(BillingPeriod {
            start: parse_date(cell(row, self.start_date), line)?,
            end: parse_date(cell(row, self.end_date), line)?,
            usage: parse_usage(cell(row, self.usage), line)?,
            cost: self.cost.map(|index| parse_cost(cell(row, index), line)).transpose()?.flatten(),
        })
    }
}

/// Sort the readings and check that they form a single series.
fn validate(usage: &mut [UsageRecord]) -> Result<(), PipelineError> {
    let Some(first) = usage.first().copied() else {
        return Err(PipelineError::malformed("there are no interval readings"));
    };
    // Day-long readings differ in length across daylight-saving transitions:
    let granularity = Granularity::from_duration(first.duration);
    if let Some(other) = usage.iter().find(|record| match granularity {
        Some(granularity) => Granularity::from_duration(record.duration) != Some(granularity),
        None => record.duration != first.duration,
    }) {
        return Err(PipelineError::malformed(format!(
            "readings of different lengths: {} and {} minutes",
            first.duration.num_minutes(),
            other.duration.num_minutes(),
        )));
    }
    usage.sort_by_key(|record| record.timestamp_start);
    if let Some((lhs, rhs)) =
        usage.iter().tuple_windows().find(|(lhs, rhs)| lhs.interval().overlaps(rhs.interval()))
    {
        return Err(PipelineError::malformed(format!(
            "readings {} and {} overlap",
            lhs.interval(),
            rhs.interval(),
        )));
    }
    Ok(())
}

fn cell(row: &StringRecord, index: usize) -> &str {
    row.get(index).unwrap_or_default()
}

fn parse_date(cell: &str, line: u64) -> Result<NaiveDate, PipelineError> {
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .map_err(|error| PipelineError::malformed_at(line, format!("invalid date `{cell}`: {error}")))
}

/// `HH:MM`, optionally followed by the UTC offset like in `01:00-07:00`.
fn parse_clock(cell: &str, line: u64) -> Result<(NaiveTime, Option<FixedOffset>), PipelineError> {
    if let Ok(time) = NaiveTime::parse_from_str(cell, "%H:%M") {
        return Ok((time, None));
    }
    DateTime::parse_from_str(&format!("1970-01-01 {cell}"), "%Y-%m-%d %H:%M%:z")
        .map(|timestamp| (timestamp.time(), Some(*timestamp.offset())))
        .map_err(|error| PipelineError::malformed_at(line, format!("invalid time `{cell}`: {error}")))
}

fn parse_usage(cell: &str, line: u64) -> Result<KilowattHours, PipelineError> {
    parse_amount(cell, line, "usage").map(KilowattHours)
}

/// Empty cell means the cost is not reported.
fn parse_cost(cell: &str, line: u64) -> Result<Option<Cost>, PipelineError> {
    let amount = cell.strip_prefix('$').unwrap_or(cell).replace(',', "");
    if amount.is_empty() {
        return Ok(None);
    }
    parse_amount(&amount, line, "cost").map(|amount| Some(Cost(amount)))
}

fn parse_amount(cell: &str, line: u64, what: &str) -> Result<f64, PipelineError> {
    let amount: f64 = cell.parse().map_err(|_| {
        PipelineError::malformed_at(line, format!("{what} `{cell}` is not a number"))
    })?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(PipelineError::malformed_at(line, format!("{what} `{cell}` must be non-negative")));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use chrono_tz::America::Los_Angeles;

    use super::*;

    const PREAMBLE: &str = "\
Name,JANE DOE
Address,\"123 MAIN ST, SAN JOSE CA 951251234\"
Account Number,1234567890
Service,Service 1

";

    const HEADER: &str = "TYPE,DATE,START TIME,END TIME,USAGE (kWh),COST,NOTES\n";

    fn parse(rows: &str) -> Result<Export, PipelineError> {
        Export::parse(format!("{PREAMBLE}{HEADER}{rows}").as_bytes(), Los_Angeles)
    }

    fn hours(export: &Export) -> Vec<i64> {
        let first = export.usage[0].timestamp_start;
        export.usage.iter().map(|record| (record.timestamp_start - first).num_hours()).collect()
    }

    #[test]
    fn test_parse_ok() -> Result {
        let export = parse(
            "\
Electric usage,2024-01-01,00:00,00:59,0.50,$0.20,
Electric usage,2024-01-01,01:00,01:59,1.25,$0.50,
Electric usage,2024-01-01,02:00,02:59,0.00,$0.00,
",
        )?;
        assert_eq!(export.account.postal_code.unwrap().as_str(), "95125");
        assert_eq!(export.account.name.as_deref(), Some("JANE DOE"));
        assert_eq!(export.usage.len(), 3);
        let first = export.usage[0];
        assert_eq!(first.timestamp_start, Los_Angeles.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(first.duration, TimeDelta::hours(1));
        assert_abs_diff_eq!(first.usage.0, 0.5);
        assert_abs_diff_eq!(first.cost.unwrap().0, 0.2);
        assert!(export.billing.is_empty());
        Ok(())
    }

    #[test]
    fn test_byte_order_mark_and_quarter_hours() -> Result {
        let content = format!(
            "\u{feff}{PREAMBLE}{HEADER}\
Electric usage,2024-01-01,00:00,00:14,0.10,,
Electric usage,2024-01-01,00:15,00:29,0.20,,
"
        );
        let export = Export::parse(content.as_bytes(), Los_Angeles)?;
        assert_eq!(export.usage.len(), 2);
        assert_eq!(export.usage[0].duration, TimeDelta::minutes(15));
        assert_eq!(export.usage[1].cost, None);
        Ok(())
    }

    #[test]
    fn test_fall_back_keeps_both_hours() -> Result {
        let export = parse(
            "\
Electric usage,2024-11-03,00:00,00:59,1.0,,
Electric usage,2024-11-03,01:00,01:59,1.0,,
Electric usage,2024-11-03,01:00,01:59,1.0,,
Electric usage,2024-11-03,02:00,02:59,1.0,,
",
        )?;
        assert_eq!(hours(&export), [0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_daily_readings_across_transitions() -> Result {
        let export = parse(
            "\
Electric usage,2024-03-09,00:00,23:59,10.0,,
Electric usage,2024-03-10,00:00,23:59,10.0,,
Electric usage,2024-03-11,00:00,23:59,10.0,,
Electric usage,2024-11-03,00:00,23:59,10.0,,
",
        )?;
        let durations: Vec<_> =
            export.usage.iter().map(|record| record.duration.num_hours()).collect();
        assert_eq!(durations, [24, 23, 24, 25]);
        assert_eq!(export.usage[1].interval().end, export.usage[2].timestamp_start);
        Ok(())
    }

    #[test]
    fn test_explicit_offsets() -> Result {
        // The standard-time hour is listed first, so only the offsets can order them:
        let export = parse(
            "\
Electric usage,2024-11-03,01:00-08:00,01:59-08:00,2.0,,
Electric usage,2024-11-03,01:00-07:00,01:59-07:00,1.0,,
",
        )?;
        assert_eq!(hours(&export), [0, 1]);
        assert_abs_diff_eq!(export.usage[0].usage.0, 1.0);
        Ok(())
    }

    #[test]
    fn test_spring_forward_gap_is_malformed() {
        let result = parse("Electric usage,2024-03-10,02:00,02:59,1.0,,\n");
        assert!(matches!(result, Err(PipelineError::MalformedExport(_))));
    }

    #[test]
    fn test_unsorted_rows_are_sorted() -> Result {
        let export = parse(
            "\
Electric usage,2024-01-01,02:00,02:59,1.0,,
Electric usage,2024-01-01,00:00,00:59,1.0,,
",
        )?;
        assert_eq!(hours(&export), [0, 2]);
        Ok(())
    }

    #[test]
    fn test_duplicate_rows_overlap() {
        let result = parse(
            "\
Electric usage,2024-01-01,00:00,00:59,1.0,,
Electric usage,2024-01-01,00:00,00:59,1.0,,
Electric usage,2024-01-02,00:00,00:59,1.0,,
",
        );
        assert!(matches!(result, Err(PipelineError::MalformedExport(_))));
    }

    #[test]
    fn test_mixed_durations() {
        let result = parse(
            "\
Electric usage,2024-01-01,00:00,00:59,1.0,,
Electric usage,2024-01-01,01:00,01:14,1.0,,
",
        );
        assert!(matches!(result, Err(PipelineError::MalformedExport(_))));
    }

    #[test]
    fn test_missing_column() {
        let content = format!("{PREAMBLE}TYPE,DATE,START TIME,END TIME,COST\n");
        let error = Export::parse(content.as_bytes(), Los_Angeles).unwrap_err();
        assert!(error.to_string().contains("USAGE (kWh)"), "{error}");
    }

    #[test]
    fn test_missing_header() {
        let result = Export::parse(PREAMBLE.as_bytes(), Los_Angeles);
        assert!(matches!(result, Err(PipelineError::MalformedExport(_))));
    }

    #[test]
    fn test_no_readings() {
        assert!(matches!(parse(""), Err(PipelineError::MalformedExport(_))));
    }

    #[test]
    fn test_invalid_date() {
        let error = parse("Electric usage,2024-13-01,00:00,00:59,1.0,,\n").unwrap_err();
        assert!(error.to_string().contains("line 7"), "{error}");
    }

    #[test]
    fn test_invalid_usage() {
        for usage in ["n/a", "-0.5", "NaN"] {
            let result = parse(&format!("Electric usage,2024-01-01,00:00,00:59,{usage},,\n"));
            assert!(matches!(result, Err(PipelineError::MalformedExport(_))), "{usage}");
        }
    }

    #[test]
    fn test_billing_section() -> Result {
        let export = parse(
            "\
Electric usage,2024-01-01,00:00,00:59,1.0,$0.30,

TYPE,START DATE,END DATE,USAGE (kWh),COST,NOTES
Electric usage,2023-12-19,2024-01-18,512.40,\"$1,204.50\",
",
        )?;
        assert_eq!(export.usage.len(), 1);
        assert_eq!(export.billing.len(), 1);
        let period = export.billing[0];
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2023, 12, 19).unwrap());
        assert_abs_diff_eq!(period.cost.unwrap().0, 1204.5);
        Ok(())
    }

    #[test]
    fn test_bundled_demo_export() -> Result {
        let export =
            Export::parse(include_bytes!("../data/pge_electric_usage_demo.csv"), Los_Angeles)?;
        // 61 days and the repeated hour of the fall-back:
        assert_eq!(export.usage.len(), 61 * 24 + 1);
        assert_eq!(export.account.postal_code.unwrap().as_str(), "95125");
        assert_eq!(export.billing.len(), 1);
        Ok(())
    }
}
