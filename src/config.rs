use std::collections::BTreeSet;
use std::path::Path;

use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::cache::shared_table;
use crate::error::DashboardError;
use crate::filter::FilterSpec;
use crate::generator::{generate_at, DEFAULT_HISTORY_MONTHS};
use crate::model::{FilterOptions, RegistrationTable};
use crate::reference::Category;

/// Settings read from a TOML file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Window length in months; five years when absent.
    pub history_months: Option<u32>,
    /// Fixed end of the window; today when absent.
    pub anchor: Option<NaiveDate>,
    pub filter: FilterDefaults,
}

/// Partial filter. Absent fields fall back to the full selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterDefaults {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub categories: Option<BTreeSet<Category>>,
    pub manufacturers: Option<BTreeSet<String>>,
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, DashboardError> {
        Ok(toml::from_str(text)?)
    }

    pub fn history_months(&self) -> u32 {
        self.history_months.unwrap_or(DEFAULT_HISTORY_MONTHS)
    }

    /// Layer `overrides` (e.g. command-line flags) over this config. Fields
    /// set in `overrides` win.
    pub fn merge(&self, overrides: &DashboardConfig) -> DashboardConfig {
        DashboardConfig {
            history_months: overrides.history_months.or(self.history_months),
            anchor: overrides.anchor.or(self.anchor),
            filter: self.filter.merge(&overrides.filter),
        }
    }

    /// Window to generate when the config pins one; `None` means the
    /// memoized table is used.
    pub fn explicit_window(&self) -> Option<(NaiveDate, u32)> {
        if self.anchor.is_none() && self.history_months.is_none() {
            return None;
        }
        Some((
            self.anchor.unwrap_or_else(|| Local::now().date_naive()),
            self.history_months(),
        ))
    }

    pub fn load_table(&self) -> Result<RegistrationTable, DashboardError> {
        match self.explicit_window() {
            Some((anchor, history_months)) => generate_at(anchor, history_months),
            None => Ok(shared_table()?.clone()),
        }
    }
}

impl FilterDefaults {
    /// Fields set in `overrides` win.
    pub fn merge(&self, overrides: &FilterDefaults) -> FilterDefaults {
        FilterDefaults {
            date_from: overrides.date_from.or(self.date_from),
            date_to: overrides.date_to.or(self.date_to),
            categories: overrides
                .categories
                .clone()
                .or_else(|| self.categories.clone()),
            manufacturers: overrides
                .manufacturers
                .clone()
                .or_else(|| self.manufacturers.clone()),
        }
    }

    /// Fill absent fields from the table's filter options.
    pub fn resolve(&self, options: &FilterOptions) -> FilterSpec {
        let mut spec = FilterSpec::from_options(options);
        if let Some(from) = self.date_from {
            spec.date_from = from;
        }
        if let Some(to) = self.date_to {
            spec.date_to = to;
        }
        if let Some(categories) = &self.categories {
            spec.categories = categories.clone();
        }
        if let Some(manufacturers) = &self.manufacturers {
            spec.manufacturers = manufacturers.clone();
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{categories_from_labels, filtered_table};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_full_config() {
        let config = DashboardConfig::from_toml_str(
            r#"
            history_months = 24
            anchor = "2026-10-19"

            [filter]
            date_from = "2025-01-01"
            categories = ["2W", "4W"]
            manufacturers = ["Honda"]
            "#,
        )
        .unwrap();

        assert_eq!(config.history_months(), 24);
        assert_eq!(config.anchor, Some(ymd(2026, 10, 19)));
        assert_eq!(config.filter.date_from, Some(ymd(2025, 1, 1)));
        assert_eq!(config.filter.date_to, None);
        assert_eq!(
            config.filter.categories,
            Some([Category::TwoWheeler, Category::FourWheeler].into())
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.history_months(), DEFAULT_HISTORY_MONTHS);
    }

    #[test]
    fn rejects_unknown_category_and_fields() {
        assert!(matches!(
            DashboardConfig::from_toml_str("[filter]\ncategories = [\"5W\"]"),
            Err(DashboardError::Config(_))
        ));
        assert!(matches!(
            DashboardConfig::from_toml_str("history = 3"),
            Err(DashboardError::Config(_))
        ));
    }

    #[test]
    fn resolve_fills_missing_fields() {
        let options = FilterOptions {
            min_date: Some(ymd(2021, 10, 31)),
            max_date: Some(ymd(2026, 9, 30)),
            categories: vec![Category::TwoWheeler, Category::ThreeWheeler],
            manufacturers: vec!["Bajaj".to_string(), "Hero".to_string()],
        };
        let defaults = FilterDefaults {
            date_to: Some(ymd(2025, 12, 31)),
            manufacturers: Some(["Hero".to_string()].into()),
            ..Default::default()
        };

        let spec = defaults.resolve(&options);
        assert_eq!(spec.date_from, ymd(2021, 10, 31));
        assert_eq!(spec.date_to, ymd(2025, 12, 31));
        assert_eq!(spec.categories.len(), 2);
        assert_eq!(spec.manufacturers.len(), 1);
    }

    fn file_config() -> DashboardConfig {
        DashboardConfig::from_toml_str(
            r#"
            anchor = "2026-10-19"

            [filter]
            date_from = "2025-01-01"
            date_to = "2025-12-31"
            categories = ["2W"]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn flags_beat_the_config_file() {
        let flags = DashboardConfig {
            anchor: Some(ymd(2025, 6, 30)),
            filter: FilterDefaults {
                date_from: Some(ymd(2025, 3, 1)),
                categories: Some([Category::FourWheeler].into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = file_config().merge(&flags);
        assert_eq!(merged.anchor, Some(ymd(2025, 6, 30)));
        assert_eq!(merged.filter.date_from, Some(ymd(2025, 3, 1)));
        assert_eq!(merged.filter.date_to, Some(ymd(2025, 12, 31)));
        assert_eq!(
            merged.filter.categories,
            Some([Category::FourWheeler].into())
        );
    }

    #[test]
    fn config_file_beats_the_full_selection() {
        let config = file_config().merge(&DashboardConfig::default());
        let table = config.load_table().unwrap();
        let spec = config.filter.resolve(&table.filter_options().unwrap());

        assert_eq!(spec.date_from, ymd(2025, 1, 1));
        assert_eq!(spec.date_to, ymd(2025, 12, 31));
        assert_eq!(spec.categories, [Category::TwoWheeler].into());
        // Not set anywhere: every manufacturer in the table.
        assert_eq!(spec.manufacturers.len(), 11);

        let filtered = filtered_table(&table, &spec).unwrap();
        assert_eq!(filtered.height(), 12 * 5);
    }

    #[test]
    fn unknown_category_flag_selects_nothing() {
        let flags = DashboardConfig {
            filter: FilterDefaults {
                categories: Some(categories_from_labels(&["5W"])),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = file_config().merge(&flags);
        let table = config.load_table().unwrap();
        let spec = config.filter.resolve(&table.filter_options().unwrap());

        assert!(spec.categories.is_empty());
        assert!(filtered_table(&table, &spec).unwrap().is_empty());
    }

    #[test]
    fn explicit_window_bypasses_the_shared_table() {
        assert_eq!(DashboardConfig::default().explicit_window(), None);

        let anchored = file_config();
        assert_eq!(
            anchored.explicit_window(),
            Some((ymd(2026, 10, 19), DEFAULT_HISTORY_MONTHS))
        );
        let table = anchored.load_table().unwrap();
        assert_eq!(table.date_bounds().unwrap().1, Some(ymd(2026, 9, 30)));

        let short = DashboardConfig {
            history_months: Some(12),
            ..anchored
        };
        assert_eq!(short.load_table().unwrap().height(), 12 * 15);
    }
}
