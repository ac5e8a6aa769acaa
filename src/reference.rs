use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::schema::category;

/// Vehicle category. Ordering follows the number of wheels.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum Category {
    #[serde(rename = "2W")]
    #[strum(serialize = "2W")]
    TwoWheeler,
    #[serde(rename = "3W")]
    #[strum(serialize = "3W")]
    ThreeWheeler,
    #[serde(rename = "4W")]
    #[strum(serialize = "4W")]
    FourWheeler,
}

impl Category {
    /// Every category, in generation order.
    pub fn all() -> impl Iterator<Item = Category> {
        Category::iter()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TwoWheeler => category::TWO_WHEELER,
            Self::ThreeWheeler => category::THREE_WHEELER,
            Self::FourWheeler => category::FOUR_WHEELER,
        }
    }

    /// Monthly registrations of an average manufacturer before growth factors.
    pub fn base_volume(self) -> f64 {
        match self {
            Self::TwoWheeler => 1000.0,
            Self::ThreeWheeler => 500.0,
            Self::FourWheeler => 200.0,
        }
    }

    pub fn manufacturers(self) -> &'static [&'static str] {
        match self {
            Self::TwoWheeler => &["Hero", "Honda", "Bajaj", "TVS", "Royal Enfield"],
            Self::ThreeWheeler => &["Bajaj", "Piaggio", "Mahindra", "TVS"],
            Self::FourWheeler => &["Maruti", "Hyundai", "Tata", "Mahindra", "Toyota", "Honda"],
        }
    }
}

/// Number of (category, manufacturer) pairs generated for every month.
pub fn manufacturer_slots() -> usize {
    Category::all().map(|c| c.manufacturers().len()).sum()
}

/// Calendar quarter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString, AsRefStr,
)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Quarter containing the given month (1-12).
    pub fn from_month(month: u32) -> Quarter {
        match month {
            1..=3 => Self::Q1,
            4..=6 => Self::Q2,
            7..=9 => Self::Q3,
            _ => Self::Q4,
        }
    }

    /// 1-based quarter number.
    pub fn index(self) -> u32 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn category_labels_round_trip() {
        for c in Category::all() {
            assert_eq!(Category::from_str(c.as_str()).unwrap(), c);
            assert_eq!(c.to_string(), c.as_str());
        }
        assert!(Category::from_str("5W").is_err());
    }

    #[test]
    fn reference_volumes_and_lineups() {
        assert_eq!(Category::TwoWheeler.base_volume(), 1000.0);
        assert_eq!(Category::ThreeWheeler.base_volume(), 500.0);
        assert_eq!(Category::FourWheeler.base_volume(), 200.0);
        assert_eq!(Category::TwoWheeler.manufacturers().len(), 5);
        assert_eq!(Category::ThreeWheeler.manufacturers().len(), 4);
        assert_eq!(Category::FourWheeler.manufacturers().len(), 6);
        assert_eq!(manufacturer_slots(), 15);
    }

    #[test]
    fn quarters_from_months() {
        assert_eq!(Quarter::from_month(1), Quarter::Q1);
        assert_eq!(Quarter::from_month(3), Quarter::Q1);
        assert_eq!(Quarter::from_month(4), Quarter::Q2);
        assert_eq!(Quarter::from_month(9), Quarter::Q3);
        assert_eq!(Quarter::from_month(12), Quarter::Q4);
        assert_eq!(Quarter::Q3.index(), 3);
        assert_eq!(Quarter::Q2.to_string(), "Q2");
    }

    #[test]
    fn categories_serialize_as_labels() {
        let json = serde_json::to_string(&Category::ThreeWheeler).unwrap();
        assert_eq!(json, "\"3W\"");
    }
}
