pub mod aggregation;
pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod generator;
pub mod model;
pub mod reference;
pub mod schema;

#[cfg(feature = "python")]
mod python;

pub use aggregation::{
    dashboard_view, distribution_series, kpis, qoq_growth, total, trend_series, yearly_series,
    yoy_growth, AppliedFilter, DashboardView, Kpis, TrendPoint, YearPoint,
};
pub use cache::shared_table;
pub use config::DashboardConfig;
pub use error::DashboardError;
pub use filter::{filtered_table, FilterSpec};
pub use generator::{generate, generate_at};
pub use model::{FilterOptions, RegistrationRecord, RegistrationTable};
pub use reference::{Category, Quarter};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Registration columns
    let columns = PyModule::new(m.py(), "columns")?;
    columns.add("DATE", schema::registration::DATE)?;
    columns.add("YEAR", schema::registration::YEAR)?;
    columns.add("QUARTER", schema::registration::QUARTER)?;
    columns.add("CATEGORY", schema::registration::CATEGORY)?;
    columns.add("MANUFACTURER", schema::registration::MANUFACTURER)?;
    columns.add("REGISTRATIONS", schema::registration::REGISTRATIONS)?;
    m.add_submodule(&columns)?;

    // Categories
    let category = PyModule::new(m.py(), "category")?;
    category.add("TWO_WHEELER", schema::category::TWO_WHEELER)?;
    category.add("THREE_WHEELER", schema::category::THREE_WHEELER)?;
    category.add("FOUR_WHEELER", schema::category::FOUR_WHEELER)?;
    m.add_submodule(&category)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn vehicle_registrations(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::RegistrationDashboard>()?;
    add_schema_exports(m)?;
    Ok(())
}
