use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::model::{date_lit, FilterOptions, RegistrationTable};
use crate::reference::Category;
use crate::schema::registration;

/// User-chosen constraints applied before aggregation.
///
/// Both date bounds are inclusive at day granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub categories: BTreeSet<Category>,
    pub manufacturers: BTreeSet<String>,
}

impl FilterSpec {
    /// The dashboard's default selection: every date, category and
    /// manufacturer the options offer. An empty table yields a spec that
    /// matches nothing.
    pub fn from_options(options: &FilterOptions) -> Self {
        Self {
            date_from: options.min_date.unwrap_or(NaiveDate::MAX),
            date_to: options.max_date.unwrap_or(NaiveDate::MIN),
            categories: options.categories.iter().copied().collect(),
            manufacturers: options.manufacturers.iter().cloned().collect(),
        }
    }

    /// Whether this spec can match any row at all.
    pub fn is_satisfiable(&self) -> bool {
        self.date_from <= self.date_to
            && !self.categories.is_empty()
            && !self.manufacturers.is_empty()
    }
}

/// Rows within the date range whose category and manufacturer are both
/// selected. Input order is preserved. An unsatisfiable spec yields an empty
/// table.
pub fn filtered_table(
    table: &RegistrationTable,
    spec: &FilterSpec,
) -> Result<RegistrationTable, DashboardError> {
    if !spec.is_satisfiable() {
        log::debug!("Filter matches nothing: {spec:?}");
        return Ok(table.empty());
    }

    let from = col(registration::DATE).gt_eq(date_lit(spec.date_from));
    // Exclusive upper bound: midnight after `date_to`.
    let to = match spec.date_to.succ_opt() {
        Some(next) => col(registration::DATE).lt(date_lit(next)),
        None => lit(true),
    };

    let categories = Series::new(
        registration::CATEGORY.into(),
        spec.categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>(),
    );
    let manufacturers = Series::new(
        registration::MANUFACTURER.into(),
        spec.manufacturers
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>(),
    );

    let frame = table
        .frame()
        .clone()
        .lazy()
        .filter(
            from.and(to)
                .and(col(registration::CATEGORY).is_in(lit(categories).implode(), false))
                .and(col(registration::MANUFACTURER).is_in(lit(manufacturers).implode(), false)),
        )
        .collect()?;

    log::debug!("Filter kept {} of {} rows", frame.height(), table.height());
    RegistrationTable::from_frame(frame)
}

/// Parse category labels coming from a user surface. Unknown labels are
/// dropped, so a selection of only unknown labels matches nothing.
pub fn categories_from_labels<S: AsRef<str>>(labels: &[S]) -> BTreeSet<Category> {
    labels
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|label| match Category::from_str(label) {
            Ok(category) => Some(category),
            Err(_) => {
                log::debug!("Ignoring unknown category {label:?}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_at;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table() -> RegistrationTable {
        generate_at(ymd(2026, 10, 19), 60).unwrap()
    }

    fn spec(
        from: NaiveDate,
        to: NaiveDate,
        categories: &[Category],
        manufacturers: &[&str],
    ) -> FilterSpec {
        FilterSpec {
            date_from: from,
            date_to: to,
            categories: categories.iter().copied().collect(),
            manufacturers: manufacturers.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn default_spec_keeps_everything() {
        let table = table();
        let spec = FilterSpec::from_options(&table.filter_options().unwrap());
        assert_eq!(spec.date_from, ymd(2021, 10, 31));
        assert_eq!(spec.date_to, ymd(2026, 9, 30));
        assert_eq!(spec.categories.len(), 3);
        // Bajaj, Honda, Mahindra and TVS appear under two categories.
        assert_eq!(spec.manufacturers.len(), 11);

        let filtered = filtered_table(&table, &spec).unwrap();
        assert_eq!(filtered.height(), table.height());
    }

    #[test]
    fn single_month_single_manufacturer() {
        let table = table();
        let day = ymd(2025, 3, 31);
        let filtered =
            filtered_table(&table, &spec(day, day, &[Category::TwoWheeler], &["Hero"])).unwrap();

        let records = filtered.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, day);
        assert_eq!(records[0].category, Category::TwoWheeler);
        assert_eq!(records[0].manufacturer, "Hero");
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let table = table();
        let filtered = filtered_table(
            &table,
            &spec(
                ymd(2025, 1, 31),
                ymd(2025, 3, 31),
                &[Category::ThreeWheeler],
                &["Piaggio"],
            ),
        )
        .unwrap();
        let dates: Vec<NaiveDate> = filtered
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.date)
            .collect();
        assert_eq!(
            dates,
            vec![ymd(2025, 1, 31), ymd(2025, 2, 28), ymd(2025, 3, 31)]
        );
    }

    #[test]
    fn manufacturer_outside_selected_categories_matches_nothing() {
        let table = table();
        let filtered = filtered_table(
            &table,
            &spec(
                ymd(2021, 1, 1),
                ymd(2026, 12, 31),
                &[Category::TwoWheeler],
                &["Maruti"],
            ),
        )
        .unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn empty_selections_and_reversed_ranges_yield_empty_tables() {
        let table = table();
        let all = FilterSpec::from_options(&table.filter_options().unwrap());

        let mut no_categories = all.clone();
        no_categories.categories.clear();
        assert!(filtered_table(&table, &no_categories).unwrap().is_empty());

        let mut no_manufacturers = all.clone();
        no_manufacturers.manufacturers.clear();
        assert!(filtered_table(&table, &no_manufacturers).unwrap().is_empty());

        let mut reversed = all;
        std::mem::swap(&mut reversed.date_from, &mut reversed.date_to);
        assert!(filtered_table(&table, &reversed).unwrap().is_empty());
    }

    #[test]
    fn shared_manufacturer_follows_category_selection() {
        let table = table();
        let day = ymd(2024, 6, 30);
        let both = filtered_table(
            &table,
            &spec(
                day,
                day,
                &[Category::TwoWheeler, Category::ThreeWheeler],
                &["Bajaj"],
            ),
        )
        .unwrap();
        assert_eq!(both.height(), 2);

        let three_only =
            filtered_table(&table, &spec(day, day, &[Category::ThreeWheeler], &["Bajaj"])).unwrap();
        assert_eq!(three_only.height(), 1);
    }

    #[test]
    fn single_and_multi_value_selections() {
        let table = table();
        let day = ymd(2025, 6, 30);

        let one = filtered_table(&table, &spec(day, day, &[Category::FourWheeler], &["Tata"]))
            .unwrap()
            .records()
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].manufacturer, "Tata");

        let many = filtered_table(
            &table,
            &spec(
                day,
                day,
                &[Category::ThreeWheeler, Category::FourWheeler],
                &["Tata", "Toyota", "Piaggio", "Mahindra"],
            ),
        )
        .unwrap()
        .records()
        .unwrap();
        // Mahindra sells both 3W and 4W.
        assert_eq!(many.len(), 5);
        assert!(many
            .iter()
            .all(|r| r.category != Category::TwoWheeler && r.date == day));
    }

    #[test]
    fn widest_bounds_keep_every_row() {
        let table = table();
        let mut wide = FilterSpec::from_options(&table.filter_options().unwrap());
        wide.date_from = NaiveDate::MIN;
        wide.date_to = NaiveDate::MAX;
        assert_eq!(filtered_table(&table, &wide).unwrap().height(), 900);
    }

    #[test]
    fn category_labels_drop_unknown_values() {
        assert_eq!(
            categories_from_labels(&["2W", "5W", "4W"]),
            [Category::TwoWheeler, Category::FourWheeler].into()
        );
        assert!(categories_from_labels(&["bikes"]).is_empty());
    }

    #[test]
    fn empty_table_default_spec_is_unsatisfiable() {
        let empty = generate_at(ymd(2026, 10, 19), 0).unwrap();
        let spec = FilterSpec::from_options(&empty.filter_options().unwrap());
        assert!(!spec.is_satisfiable());
        assert!(filtered_table(&empty, &spec).unwrap().is_empty());
    }
}
