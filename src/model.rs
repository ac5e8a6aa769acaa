use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime};
use polars::datatypes::TimeUnit;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::reference::{Category, Quarter};
use crate::schema::registration;

/// One row of the registration table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub date: NaiveDate,
    pub year: i32,
    pub quarter: Quarter,
    pub category: Category,
    pub manufacturer: String,
    pub registrations: i64,
}

/// Values a dashboard offers in its filter widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub categories: Vec<Category>,
    pub manufacturers: Vec<String>,
}

/// The registration table, one row per (month-end date, category,
/// manufacturer). Backed by a Polars DataFrame whose `date` column is a
/// microsecond `Datetime` at midnight.
#[derive(Debug, Clone)]
pub struct RegistrationTable {
    frame: DataFrame,
}

impl RegistrationTable {
    /// Build a table from typed records, keeping their order.
    pub fn from_records(records: &[RegistrationRecord]) -> Result<Self, DashboardError> {
        let dates: Vec<i64> = records.iter().map(|r| date_to_micros(r.date)).collect();
        let years: Vec<i32> = records.iter().map(|r| r.year).collect();
        let quarters: Vec<&str> = records.iter().map(|r| r.quarter.as_ref()).collect();
        let categories: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
        let manufacturers: Vec<&str> = records.iter().map(|r| r.manufacturer.as_str()).collect();
        let registrations: Vec<i64> = records.iter().map(|r| r.registrations).collect();

        let date = Series::new(registration::DATE.into(), dates)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

        let frame = DataFrame::new(vec![
            date.into(),
            Series::new(registration::YEAR.into(), years).into(),
            Series::new(registration::QUARTER.into(), quarters).into(),
            Series::new(registration::CATEGORY.into(), categories).into(),
            Series::new(registration::MANUFACTURER.into(), manufacturers).into(),
            Series::new(registration::REGISTRATIONS.into(), registrations).into(),
        ])?;

        Ok(Self { frame })
    }

    /// Wrap a DataFrame handed in from outside (e.g. from Python).
    ///
    /// All schema columns must be present. Column types are normalized so the
    /// aggregations can rely on them; extra columns are preserved.
    pub fn from_frame(frame: DataFrame) -> Result<Self, DashboardError> {
        Self::require_columns(&frame, &registration::ALL)?;

        let frame = frame
            .lazy()
            .with_columns([
                col(registration::DATE).cast(DataType::Datetime(TimeUnit::Microseconds, None)),
                col(registration::YEAR).cast(DataType::Int32),
                col(registration::REGISTRATIONS).cast(DataType::Int64),
            ])
            .collect()?;

        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Same schema, no rows.
    pub fn empty(&self) -> Self {
        Self {
            frame: self.frame.head(Some(0)),
        }
    }

    /// Decode every row into a typed record.
    pub fn records(&self) -> Result<Vec<RegistrationRecord>, DashboardError> {
        let dates = self
            .frame
            .column(registration::DATE)?
            .as_materialized_series();
        let years = self.frame.column(registration::YEAR)?.i32()?;
        let quarters = self.frame.column(registration::QUARTER)?.str()?;
        let categories = self.frame.column(registration::CATEGORY)?.str()?;
        let manufacturers = self.frame.column(registration::MANUFACTURER)?.str()?;
        let registrations = self.frame.column(registration::REGISTRATIONS)?.i64()?;

        let mut records = Vec::with_capacity(self.frame.height());
        for i in 0..self.frame.height() {
            let date = date_at(dates, i)?
                .ok_or_else(|| DashboardError::InvalidData(format!("Null date in row {i}")))?;
            let year = years
                .get(i)
                .ok_or_else(|| DashboardError::InvalidData(format!("Null year in row {i}")))?;
            let quarter = quarters
                .get(i)
                .and_then(|q| Quarter::from_str(q).ok())
                .ok_or_else(|| DashboardError::InvalidData(format!("Bad quarter in row {i}")))?;
            let category = parse_category(categories.get(i))?;
            let manufacturer = manufacturers
                .get(i)
                .ok_or_else(|| {
                    DashboardError::InvalidData(format!("Null manufacturer in row {i}"))
                })?
                .to_string();
            let registrations = registrations.get(i).ok_or_else(|| {
                DashboardError::InvalidData(format!("Null registrations in row {i}"))
            })?;

            records.push(RegistrationRecord {
                date,
                year,
                quarter,
                category,
                manufacturer,
                registrations,
            });
        }
        Ok(records)
    }

    /// Raw-data view: rows sorted by date, newest first. Rows sharing a date
    /// keep their relative order.
    pub fn newest_first(&self) -> Result<Self, DashboardError> {
        let frame = self
            .frame
            .clone()
            .lazy()
            .sort_by_exprs(
                [col(registration::DATE)],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .collect()?;
        Ok(Self { frame })
    }

    /// Date bounds plus the sorted distinct categories and manufacturers.
    pub fn filter_options(&self) -> Result<FilterOptions, DashboardError> {
        let (min_date, max_date) = self.date_bounds()?;

        let categories = self
            .frame
            .column(registration::CATEGORY)?
            .str()?
            .into_iter()
            .flatten()
            .map(|c| parse_category(Some(c)))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let manufacturers: BTreeSet<String> = self
            .frame
            .column(registration::MANUFACTURER)?
            .str()?
            .into_iter()
            .flatten()
            .map(|m| m.to_string())
            .collect();

        Ok(FilterOptions {
            min_date,
            max_date,
            categories: categories.into_iter().collect(),
            manufacturers: manufacturers.into_iter().collect(),
        })
    }

    /// Earliest and latest record dates; `None` for an empty table.
    pub fn date_bounds(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), DashboardError> {
        let bounds = self
            .frame
            .clone()
            .lazy()
            .select([
                col(registration::DATE).min().alias("min_date"),
                col(registration::DATE).max().alias("max_date"),
            ])
            .collect()?;

        let min = date_at(bounds.column("min_date")?.as_materialized_series(), 0)?;
        let max = date_at(bounds.column("max_date")?.as_materialized_series(), 0)?;
        Ok((min, max))
    }

    fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), DashboardError> {
        for &col_name in required {
            if df.column(col_name).is_err() {
                return Err(DashboardError::MissingColumn(col_name.to_string()));
            }
        }
        Ok(())
    }
}

// ── Conversion helpers ──────────────────────────────────────────────────────

/// Microseconds since the epoch at midnight of `date`.
pub(crate) fn date_to_micros(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_micros()
}

/// Datetime literal for comparisons against the `date` column.
pub(crate) fn date_lit(date: NaiveDate) -> Expr {
    lit(date_to_micros(date)).cast(DataType::Datetime(TimeUnit::Microseconds, None))
}

pub(crate) fn micros_to_date(us: i64) -> Result<NaiveDate, DashboardError> {
    DateTime::from_timestamp_micros(us)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| DashboardError::InvalidData(format!("Timestamp out of range: {us}")))
}

/// Read a date out of a Datetime series. Nulls (and out-of-bounds rows of an
/// empty aggregate) come back as `None`.
pub(crate) fn date_at(series: &Series, i: usize) -> Result<Option<NaiveDate>, DashboardError> {
    if i >= series.len() {
        return Ok(None);
    }
    match series.get(i)? {
        AnyValue::Datetime(us, _, _) => micros_to_date(us).map(Some),
        AnyValue::Null => Ok(None),
        other => Err(DashboardError::InvalidData(format!(
            "Expected a datetime, found {other}"
        ))),
    }
}

pub(crate) fn parse_category(value: Option<&str>) -> Result<Category, DashboardError> {
    let value = value.ok_or_else(|| DashboardError::InvalidData("Null category".into()))?;
    Category::from_str(value)
        .map_err(|_| DashboardError::InvalidData(format!("Unknown category: {value}")))
}
