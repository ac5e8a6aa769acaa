use chrono::{Datelike, Local, Months, NaiveDate};

use crate::error::DashboardError;
use crate::model::{RegistrationRecord, RegistrationTable};
use crate::reference::{manufacturer_slots, Category, Quarter};

/// Default window length: five years.
pub const DEFAULT_HISTORY_MONTHS: u32 = 60;

/// Generate the table for a window ending today (local time).
///
/// The window moves with the wall clock, so two processes started on
/// different days see different dates.
pub fn generate() -> Result<RegistrationTable, DashboardError> {
    generate_at(Local::now().date_naive(), DEFAULT_HISTORY_MONTHS)
}

/// Generate the table for the window `[anchor - history_months, anchor]`.
pub fn generate_at(
    anchor: NaiveDate,
    history_months: u32,
) -> Result<RegistrationTable, DashboardError> {
    let records = generate_records(anchor, history_months)?;
    log::info!(
        "Generated {} registration records for window ending {anchor} ({history_months} months)",
        records.len()
    );
    RegistrationTable::from_records(&records)
}

/// Typed form of [`generate_at`]. Each count is
/// `floor(base_volume * annual_growth * quarterly_variation * manufacturer_factor)`.
pub fn generate_records(
    anchor: NaiveDate,
    history_months: u32,
) -> Result<Vec<RegistrationRecord>, DashboardError> {
    let start = anchor
        .checked_sub_months(Months::new(history_months))
        .ok_or_else(|| {
            DashboardError::InvalidData(format!(
                "{history_months} months before {anchor} is out of range"
            ))
        })?;

    let dates = month_ends(start, anchor);
    let mut records = Vec::with_capacity(dates.len() * manufacturer_slots());

    for date in dates {
        let quarter = Quarter::from_month(date.month());
        let annual_growth = 1.0 + 0.1 * f64::from(date.year() - start.year());
        let quarterly_variation = 1.0 + 0.02 * f64::from(quarter.index());

        for category in Category::all() {
            for &manufacturer in category.manufacturers() {
                let value = category.base_volume()
                    * annual_growth
                    * quarterly_variation
                    * manufacturer_factor(manufacturer, category);

                records.push(RegistrationRecord {
                    date,
                    year: date.year(),
                    quarter,
                    category,
                    manufacturer: manufacturer.to_string(),
                    // Every factor is positive inside a five-year window.
                    registrations: value.floor().max(0.0) as i64,
                });
            }
        }
    }

    Ok(records)
}

/// Month-end dates falling within `[start, end]`, ascending.
pub fn month_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = month_end(start);
    while let Some(date) = current {
        if date > end {
            break;
        }
        dates.push(date);
        current = date.succ_opt().and_then(month_end);
    }
    dates
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    let first = date.with_day(1)?;
    first.checked_add_months(Months::new(1))?.pred_opt()
}

/// Multiplier in `[0.8, 1.2)` for a (manufacturer, category) pair.
pub fn manufacturer_factor(manufacturer: &str, category: Category) -> f64 {
    let key = format!("{manufacturer}{}", category.as_str());
    let bucket = stable_hash(&key) % 100;
    // bucket < 100, exact in f64
    0.8 + 0.4 * (bucket as f64 / 100.0)
}

/// Polynomial string hash over UTF-8 bytes: `h = h * 31 + byte`, wrapping
/// at 64 bits, starting from zero. Unlike `std`'s `DefaultHasher` it carries
/// no per-process seed, so factors are identical across runs and platforms.
pub fn stable_hash(value: &str) -> u64 {
    value
        .bytes()
        .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)))
}
