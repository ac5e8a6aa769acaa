/// Column-name constants for the registration table.
/// Single source of truth - exported to Python via PyO3.

// ── Registration columns ────────────────────────────────────────────────────
pub mod registration {
    pub const DATE: &str = "date";
    pub const YEAR: &str = "year";
    pub const QUARTER: &str = "quarter";
    pub const CATEGORY: &str = "category";
    pub const MANUFACTURER: &str = "manufacturer";
    pub const REGISTRATIONS: &str = "registrations";

    pub const ALL: [&str; 6] = [DATE, YEAR, QUARTER, CATEGORY, MANUFACTURER, REGISTRATIONS];
}

// ── Category values ─────────────────────────────────────────────────────────
pub mod category {
    pub const TWO_WHEELER: &str = "2W";
    pub const THREE_WHEELER: &str = "3W";
    pub const FOUR_WHEELER: &str = "4W";
}

// ── Filter option keys ──────────────────────────────────────────────────────
pub mod options {
    pub const MIN_DATE: &str = "min_date";
    pub const MAX_DATE: &str = "max_date";
    pub const CATEGORIES: &str = "categories";
    pub const MANUFACTURERS: &str = "manufacturers";
}

// ── KPI keys ────────────────────────────────────────────────────────────────
pub mod kpi {
    pub const TOTAL: &str = "total";
    pub const YOY_GROWTH: &str = "yoy_growth";
    pub const QOQ_GROWTH: &str = "qoq_growth";
}
