//! INI file configuration adapter.

use crate::domain::error::StockpickError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StockpickError> {
        let mut config = Ini::new();
        config
            .load(path.as_ref())
            .map_err(|reason| StockpickError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, StockpickError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| StockpickError::ConfigParse {
                file: "<inline>".into(),
                reason,
            })?;
        Ok(Self { config })
    }
}

fn truthy(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(truthy)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[database]
backend = sqlite
path = /var/lib/stockpick/stockpick.db
pool_size = 8

[provider]
api_key = test-key
timeout_secs = 10

[ingest]
window_days = 365
from = 2024-01-01

[scan]
threshold = 55.5
workers = 2

[web]
listen = 127.0.0.1:8080
"#;

    #[test]
    fn typed_getters_read_sample_sections() {
        let config = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            config.get_string("database", "backend"),
            Some("sqlite".to_string())
        );
        assert_eq!(config.get_int("database", "pool_size", 4), 8);
        assert_eq!(config.get_double("scan", "threshold", 50.0), 55.5);
        assert_eq!(config.get_int("ingest", "window_days", 30), 365);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = FileConfigAdapter::from_string("[scan]\n").unwrap();
        assert_eq!(config.get_string("scan", "threshold"), None);
        assert_eq!(config.get_int("scan", "workers", 4), 4);
        assert_eq!(config.get_double("scan", "threshold", 50.0), 50.0);
        assert!(config.get_bool("scan", "verbose", true));
    }

    #[test]
    fn non_numeric_values_fall_back_to_defaults() {
        let config = FileConfigAdapter::from_string("[scan]\nworkers = many\n").unwrap();
        assert_eq!(config.get_int("scan", "workers", 4), 4);
        assert_eq!(config.get_double("scan", "workers", 1.5), 1.5);
    }

    #[test]
    fn bool_spellings() {
        let config = FileConfigAdapter::from_string(
            "[flags]\na = yes\nb = on\nc = 1\nd = no\ne = off\nf = 0\ng = maybe\n",
        )
        .unwrap();
        assert!(config.get_bool("flags", "a", false));
        assert!(config.get_bool("flags", "b", false));
        assert!(config.get_bool("flags", "c", false));
        assert!(!config.get_bool("flags", "d", true));
        assert!(!config.get_bool("flags", "e", true));
        assert!(!config.get_bool("flags", "f", true));
        // Unrecognized spelling reads as the default.
        assert!(config.get_bool("flags", "g", true));
    }

    #[test]
    fn get_date_parses_iso_dates() {
        let config = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            config.get_date("ingest", "from"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(config.get_date("ingest", "to"), None);
    }

    #[test]
    fn get_date_rejects_malformed_dates() {
        let config = FileConfigAdapter::from_string("[ingest]\nfrom = 01/02/2024\n").unwrap();
        assert_eq!(config.get_date("ingest", "from"), None);
    }

    #[test]
    fn require_string_reports_the_missing_key() {
        let config = FileConfigAdapter::from_string("[provider]\n").unwrap();
        match config.require_string("provider", "api_key") {
            Err(StockpickError::ConfigMissing { section, key }) => {
                assert_eq!(section, "provider");
                assert_eq!(key, "api_key");
            }
            other => panic!("expected ConfigMissing, got: {other:?}"),
        }
    }

    #[test]
    fn from_file_round_trips() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            config.get_string("web", "listen"),
            Some("127.0.0.1:8080".to_string())
        );
    }

    #[test]
    fn from_file_missing_path_is_a_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/stockpick.ini");
        assert!(matches!(result, Err(StockpickError::ConfigParse { .. })));
    }
}
