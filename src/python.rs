use std::collections::BTreeMap;

use chrono::NaiveDate;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3_polars::PyDataFrame;

use crate::aggregation;
use crate::cache::shared_table;
use crate::error::DashboardError;
use crate::filter::{categories_from_labels, filtered_table, FilterSpec};
use crate::generator::{generate_at, DEFAULT_HISTORY_MONTHS};
use crate::model::RegistrationTable;
use crate::schema::{kpi, options};

#[pyclass]
pub struct RegistrationDashboard {
    table: RegistrationTable,
}

#[pymethods]
impl RegistrationDashboard {
    /// Wrap the process-wide memoized table (generated on first use).
    #[new]
    fn new() -> PyResult<Self> {
        let table = shared_table()?.clone();
        Ok(Self { table })
    }

    /// Build a fresh, unshared table for an explicit anchor date.
    #[staticmethod]
    #[pyo3(signature = (anchor, history_months=DEFAULT_HISTORY_MONTHS))]
    fn generate(anchor: NaiveDate, history_months: u32) -> PyResult<Self> {
        let table = generate_at(anchor, history_months)?;
        Ok(Self { table })
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn table(&self) -> PyDataFrame {
        PyDataFrame(self.table.frame().clone())
    }

    /// Widget options: date bounds and sorted distinct categories and
    /// manufacturers.
    fn filter_options<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let opts = self.table.filter_options()?;
        let dict = PyDict::new(py);
        dict.set_item(options::MIN_DATE, opts.min_date)?;
        dict.set_item(options::MAX_DATE, opts.max_date)?;
        dict.set_item(
            options::CATEGORIES,
            opts.categories
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>(),
        )?;
        dict.set_item(options::MANUFACTURERS, opts.manufacturers)?;
        Ok(dict)
    }

    // ── Filtering ───────────────────────────────────────────────────────────

    /// Filter the table. `None` for any argument keeps the full selection for
    /// that field. Unknown category labels are ignored.
    #[pyo3(signature = (date_from=None, date_to=None, categories=None, manufacturers=None))]
    fn filter(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        categories: Option<Vec<String>>,
        manufacturers: Option<Vec<String>>,
    ) -> PyResult<PyDataFrame> {
        let mut spec = FilterSpec::from_options(&self.table.filter_options()?);
        if let Some(from) = date_from {
            spec.date_from = from;
        }
        if let Some(to) = date_to {
            spec.date_to = to;
        }
        if let Some(labels) = categories {
            spec.categories = categories_from_labels(labels.as_slice());
        }
        if let Some(names) = manufacturers {
            spec.manufacturers = names.into_iter().collect();
        }

        let filtered = filtered_table(&self.table, &spec)?;
        Ok(PyDataFrame(filtered.into_frame()))
    }

    // ── Aggregation ─────────────────────────────────────────────────────────

    #[staticmethod]
    fn total(filtered: PyDataFrame) -> PyResult<i64> {
        Ok(aggregation::total(&wrap(filtered)?)?)
    }

    #[staticmethod]
    fn yoy_growth(filtered: PyDataFrame) -> PyResult<f64> {
        Ok(aggregation::yoy_growth(&wrap(filtered)?)?)
    }

    #[staticmethod]
    fn qoq_growth(filtered: PyDataFrame) -> PyResult<f64> {
        Ok(aggregation::qoq_growth(&wrap(filtered)?)?)
    }

    /// `{"total": int, "yoy_growth": float, "qoq_growth": float}`
    #[staticmethod]
    fn kpis<'py>(py: Python<'py>, filtered: PyDataFrame) -> PyResult<Bound<'py, PyDict>> {
        let kpis = aggregation::kpis(&wrap(filtered)?)?;
        let dict = PyDict::new(py);
        dict.set_item(kpi::TOTAL, kpis.total)?;
        dict.set_item(kpi::YOY_GROWTH, kpis.yoy_growth)?;
        dict.set_item(kpi::QOQ_GROWTH, kpis.qoq_growth)?;
        Ok(dict)
    }

    /// `{category: [(date, registrations), ...]}`, dates ascending.
    #[staticmethod]
    fn trend_series(filtered: PyDataFrame) -> PyResult<BTreeMap<String, Vec<(NaiveDate, i64)>>> {
        let series = aggregation::trend_series(&wrap(filtered)?)?;
        Ok(series
            .into_iter()
            .map(|(category, points)| {
                let points = points
                    .into_iter()
                    .map(|p| (p.date, p.registrations))
                    .collect();
                (category.to_string(), points)
            })
            .collect())
    }

    /// `{category: registrations}`
    #[staticmethod]
    fn distribution_series(filtered: PyDataFrame) -> PyResult<BTreeMap<String, i64>> {
        let series = aggregation::distribution_series(&wrap(filtered)?)?;
        Ok(series
            .into_iter()
            .map(|(category, total)| (category.to_string(), total))
            .collect())
    }

    /// `{category: [(year, registrations), ...]}`, years ascending.
    #[staticmethod]
    fn yearly_series(filtered: PyDataFrame) -> PyResult<BTreeMap<String, Vec<(i32, i64)>>> {
        let series = aggregation::yearly_series(&wrap(filtered)?)?;
        Ok(series
            .into_iter()
            .map(|(category, points)| {
                let points = points
                    .into_iter()
                    .map(|p| (p.year, p.registrations))
                    .collect();
                (category.to_string(), points)
            })
            .collect())
    }

    /// Raw-data view, newest rows first.
    #[staticmethod]
    fn newest_first(filtered: PyDataFrame) -> PyResult<PyDataFrame> {
        let sorted = wrap(filtered)?.newest_first()?;
        Ok(PyDataFrame(sorted.into_frame()))
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

fn wrap(df: PyDataFrame) -> Result<RegistrationTable, DashboardError> {
    RegistrationTable::from_frame(df.0)
}
