use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use log::debug;
use serde::{Serialize, Serializer};

use crate::loader::Dataset;

const PERIOD_PREFIX_CHARS: usize = 6;

/// A calendar month, stored as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(NaiveDate);

impl Period {
    pub fn from_year_month(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Period)
    }

    /// Parses the leading `YYYYMM` of a raw cell; anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let prefix = raw.chars().take(PERIOD_PREFIX_CHARS).collect::<String>();
        if prefix.len() != PERIOD_PREFIX_CHARS || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = prefix[..4].parse().ok()?;
        let month = prefix[4..].parse().ok()?;
        Self::from_year_month(year, month)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m"))
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Period::parse(value).ok_or_else(|| anyhow!("Failed to parse '{value}' as YYYYMM period"))
    }
}

/// Normalized period per row, aligned with `dataset.rows()`.
pub fn normalize(dataset: &Dataset, period_column: Option<usize>) -> Vec<Option<Period>> {
    let Some((index, name)) =
        period_column.and_then(|index| dataset.headers().get(index).map(|name| (index, name)))
    else {
        return vec![None; dataset.row_count()];
    };
    let periods = dataset
        .column_values(index)
        .map(Period::parse)
        .collect::<Vec<_>>();
    let unparsed = periods.iter().filter(|p| p.is_none()).count();
    if unparsed > 0 {
        debug!("{unparsed} row(s) have no parseable period in column '{name}'");
    }
    periods
}

/// Earliest and latest parsed period, if any row parsed.
pub fn bounds(periods: &[Option<Period>]) -> Option<(Period, Period)> {
    let mut parsed = periods.iter().flatten().copied();
    let first = parsed.next()?;
    Some(parsed.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
}

/// Parses a date bound given as `YYYY-MM-DD`, `YYYY-MM` or `YYYYMM`.
pub fn parse_date_bound(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    let compact = trimmed.replacen('-', "", 1);
    if compact.chars().count() == PERIOD_PREFIX_CHARS
        && let Some(period) = Period::parse(&compact)
    {
        return Ok(period.first_day());
    }
    Err(anyhow!(
        "Failed to parse '{value}' as a date (expected YYYY-MM-DD, YYYY-MM or YYYYMM)"
    ))
}
