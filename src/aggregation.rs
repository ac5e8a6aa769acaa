use std::collections::{BTreeMap, BTreeSet};

use chrono::{Months, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::filter::{filtered_table, FilterSpec};
use crate::model::{date_at, date_lit, parse_category, RegistrationTable};
use crate::reference::Category;
use crate::schema::registration;

/// Monthly registrations of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub registrations: i64,
}

/// Yearly registrations of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearPoint {
    pub year: i32,
    pub registrations: i64,
}

pub type TrendSeries = BTreeMap<Category, Vec<TrendPoint>>;
pub type DistributionSeries = BTreeMap<Category, i64>;
pub type YearlySeries = BTreeMap<Category, Vec<YearPoint>>;

/// Headline figures. Growth values are percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total: i64,
    pub yoy_growth: f64,
    pub qoq_growth: f64,
}

/// The filter a view was computed with. Date bounds are `None` when the
/// filter was built from an empty table and so has no real bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub categories: BTreeSet<Category>,
    pub manufacturers: BTreeSet<String>,
}

impl From<&FilterSpec> for AppliedFilter {
    fn from(spec: &FilterSpec) -> Self {
        let bound =
            |date: NaiveDate| (date != NaiveDate::MIN && date != NaiveDate::MAX).then_some(date);
        Self {
            date_from: bound(spec.date_from),
            date_to: bound(spec.date_to),
            categories: spec.categories.clone(),
            manufacturers: spec.manufacturers.clone(),
        }
    }
}

/// Everything a dashboard redraws after a filter change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub filter: AppliedFilter,
    pub rows: usize,
    pub kpis: Kpis,
    pub trend: TrendSeries,
    pub distribution: DistributionSeries,
    pub yearly: YearlySeries,
}

// ── Scalars ─────────────────────────────────────────────────────────────────

/// Sum of registrations; `0` for an empty table.
pub fn total(filtered: &RegistrationTable) -> Result<i64, DashboardError> {
    Ok(filtered
        .frame()
        .column(registration::REGISTRATIONS)?
        .i64()?
        .sum()
        .unwrap_or(0))
}

/// Latest year against the year before it, in percent.
pub fn yoy_growth(filtered: &RegistrationTable) -> Result<f64, DashboardError> {
    let latest_year = match filtered.frame().column(registration::YEAR)?.i32()?.max() {
        Some(year) => year,
        None => return Ok(0.0),
    };

    let current = sum_where(filtered, col(registration::YEAR).eq(lit(latest_year)))?;
    let previous = sum_where(filtered, col(registration::YEAR).eq(lit(latest_year - 1)))?;
    Ok(growth(current, previous))
}

/// Latest date bucket against the bucket exactly three calendar months
/// earlier, in percent.
///
/// Only an exact date match counts as the previous bucket. Month arithmetic
/// clamps to the last day of the target month, so from a 30-day month-end the
/// offset can land one day short of the previous month-end; that compares
/// against nothing and reports `0`.
pub fn qoq_growth(filtered: &RegistrationTable) -> Result<f64, DashboardError> {
    let latest_date = match filtered.date_bounds()?.1 {
        Some(date) => date,
        None => return Ok(0.0),
    };
    let prev_date = match latest_date.checked_sub_months(Months::new(3)) {
        Some(date) => date,
        None => return Ok(0.0),
    };

    let latest = sum_where(filtered, col(registration::DATE).eq(date_lit(latest_date)))?;
    let previous = sum_where(filtered, col(registration::DATE).eq(date_lit(prev_date)))?;
    Ok(growth(latest, previous))
}

pub fn kpis(filtered: &RegistrationTable) -> Result<Kpis, DashboardError> {
    Ok(Kpis {
        total: total(filtered)?,
        yoy_growth: yoy_growth(filtered)?,
        qoq_growth: qoq_growth(filtered)?,
    })
}

/// Percentage change; `0` when there is no positive baseline.
fn growth(current: i64, previous: i64) -> f64 {
    if previous > 0 {
        (current - previous) as f64 / previous as f64 * 100.0
    } else {
        0.0
    }
}

fn sum_where(filtered: &RegistrationTable, predicate: Expr) -> Result<i64, DashboardError> {
    let summed = filtered
        .frame()
        .clone()
        .lazy()
        .filter(predicate)
        .select([col(registration::REGISTRATIONS).sum()])
        .collect()?;

    Ok(summed
        .column(registration::REGISTRATIONS)?
        .i64()?
        .get(0)
        .unwrap_or(0))
}

// ── Series ──────────────────────────────────────────────────────────────────

/// Per-category monthly totals, dates ascending.
pub fn trend_series(filtered: &RegistrationTable) -> Result<TrendSeries, DashboardError> {
    let grouped = grouped_sum(filtered, registration::DATE)?;

    let dates = grouped
        .column(registration::DATE)?
        .as_materialized_series();
    let categories = grouped.column(registration::CATEGORY)?.str()?;
    let sums = grouped.column(registration::REGISTRATIONS)?.i64()?;

    let mut series = TrendSeries::new();
    for i in 0..grouped.height() {
        let date = date_at(dates, i)?
            .ok_or_else(|| DashboardError::InvalidData("Null date in trend group".into()))?;
        series
            .entry(parse_category(categories.get(i))?)
            .or_default()
            .push(TrendPoint {
                date,
                registrations: sums.get(i).unwrap_or(0),
            });
    }
    Ok(series)
}

/// Per-category totals for share views.
pub fn distribution_series(
    filtered: &RegistrationTable,
) -> Result<DistributionSeries, DashboardError> {
    let grouped = filtered
        .frame()
        .clone()
        .lazy()
        .group_by([col(registration::CATEGORY)])
        .agg([col(registration::REGISTRATIONS).sum()])
        .collect()?;

    let categories = grouped.column(registration::CATEGORY)?.str()?;
    let sums = grouped.column(registration::REGISTRATIONS)?.i64()?;

    let mut series = DistributionSeries::new();
    for i in 0..grouped.height() {
        series.insert(parse_category(categories.get(i))?, sums.get(i).unwrap_or(0));
    }
    Ok(series)
}

/// Per-category yearly totals, years ascending.
pub fn yearly_series(filtered: &RegistrationTable) -> Result<YearlySeries, DashboardError> {
    let grouped = grouped_sum(filtered, registration::YEAR)?;

    let years = grouped.column(registration::YEAR)?.i32()?;
    let categories = grouped.column(registration::CATEGORY)?.str()?;
    let sums = grouped.column(registration::REGISTRATIONS)?.i64()?;

    let mut series = YearlySeries::new();
    for i in 0..grouped.height() {
        let year = years
            .get(i)
            .ok_or_else(|| DashboardError::InvalidData("Null year in yearly group".into()))?;
        series
            .entry(parse_category(categories.get(i))?)
            .or_default()
            .push(YearPoint {
                year,
                registrations: sums.get(i).unwrap_or(0),
            });
    }
    Ok(series)
}

/// Registrations summed per (`period`, category), sorted by `period`.
fn grouped_sum(filtered: &RegistrationTable, period: &str) -> Result<DataFrame, DashboardError> {
    Ok(filtered
        .frame()
        .clone()
        .lazy()
        .group_by([col(period), col(registration::CATEGORY)])
        .agg([col(registration::REGISTRATIONS).sum()])
        .sort_by_exprs(
            [col(period), col(registration::CATEGORY)],
            SortMultipleOptions::default(),
        )
        .collect()?)
}

// ── Dashboard ───────────────────────────────────────────────────────────────

/// Filter once and derive every view from the result.
pub fn dashboard_view(
    table: &RegistrationTable,
    spec: &FilterSpec,
) -> Result<DashboardView, DashboardError> {
    let filtered = filtered_table(table, spec)?;
    Ok(DashboardView {
        filter: AppliedFilter::from(spec),
        rows: filtered.height(),
        kpis: kpis(&filtered)?,
        trend: trend_series(&filtered)?,
        distribution: distribution_series(&filtered)?,
        yearly: yearly_series(&filtered)?,
    })
}
