//! Configuration access port trait.

use crate::domain::error::StockpickError;
use chrono::NaiveDate;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// A key that must be present, for values with no sensible default
    /// (database paths, provider credentials).
    fn require_string(&self, section: &str, key: &str) -> Result<String, StockpickError> {
        self.get_string(section, key)
            .ok_or_else(|| StockpickError::ConfigMissing {
                section: section.into(),
                key: key.into(),
            })
    }

    /// A date value in `YYYY-MM-DD` form. Unparseable values read as absent.
    fn get_date(&self, section: &str, key: &str) -> Option<NaiveDate> {
        self.get_string(section, key)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
    }
}
