//! Bracket tables that feed a [`JurisdictionComposer`].
//!
//! Tables are JSON documents with one federal schedule and any number of
//! named regional schedules. Rates are fractions, not percents:
//!
//! ```json
//! {
//!   "federal": { "limits": [0, 55867], "rates": [0.15, 0.205] },
//!   "jurisdictions": {
//!     "Ontario": { "limits": [0, 51446], "rates": [0.0505, 0.0915] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::core::{FEDERAL_NAME, JurisdictionComposer, TaxError};

const BUILTIN_SCHEDULES: &str = include_str!("../schedules/canada_2024.json");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read schedule table {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schedule table JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid {name} schedule: {source}")]
    Schedule {
        name: String,
        #[source]
        source: TaxError,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BracketTable {
    pub limits: Vec<f64>,
    pub rates: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScheduleTable {
    pub federal: BracketTable,
    #[serde(default)]
    pub jurisdictions: BTreeMap<String, BracketTable>,
}

impl ScheduleTable {
    /// Canadian federal and provincial brackets for the 2024 tax year.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_SCHEDULES)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            jurisdictions = table.jurisdictions.len(),
            "loaded schedule table"
        );
        Ok(table)
    }

    /// Loads `path` when given, otherwise the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    pub fn build_composer(&self) -> Result<JurisdictionComposer, ConfigError> {
        let composer = JurisdictionComposer::new(&self.federal.limits, &self.federal.rates)
            .map_err(|source| ConfigError::Schedule {
                name: FEDERAL_NAME.to_string(),
                source,
            })?;
        for (name, table) in &self.jurisdictions {
            composer
                .register(name, &table.limits, &table.rates)
                .map_err(|source| ConfigError::Schedule {
                    name: name.clone(),
                    source,
                })?;
        }
        Ok(composer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn builtin_table_builds_every_province() {
        let table = ScheduleTable::builtin().expect("builtin table parses");
        let composer = table.build_composer().expect("builtin table is valid");
        let names = composer.list_jurisdictions();
        assert_eq!(names.len(), 10);
        assert!(names.contains("Ontario"));
        assert!(names.contains("British Columbia"));
        assert!(!names.contains("Federal"));
    }

    #[test]
    fn builtin_ontario_matches_hand_calculation() {
        let composer = ScheduleTable::builtin()
            .and_then(|t| t.build_composer())
            .expect("builtin composer");
        // Federal: 55,867 at 15% + 44,133 at 20.5%. Ontario: 51,446 at 5.05% + 48,554 at 9.15%.
        let expected = 8_380.05 + 9_047.265 + 2_598.023 + 4_442.691;
        assert_approx(
            composer.combined_tax("Ontario", 100_000.0, 0.0).unwrap(),
            expected,
        );
    }

    #[test]
    fn missing_jurisdictions_defaults_to_empty() {
        let table =
            ScheduleTable::from_json(r#"{"federal": {"limits": [0], "rates": [0.1]}}"#).unwrap();
        assert!(table.jurisdictions.is_empty());
        let composer = table.build_composer().unwrap();
        assert_approx(composer.federal().tax(50.0).unwrap(), 5.0);
    }

    #[test]
    fn invalid_regional_schedule_names_jurisdiction() {
        let json = r#"{
          "federal": {"limits": [0, 10], "rates": [0.1, 0.2]},
          "jurisdictions": {"Bad": {"limits": [5], "rates": [0.1]}}
        }"#;
        let err = ScheduleTable::from_json(json)
            .unwrap()
            .build_composer()
            .expect_err("must reject non-zero first limit");
        match err {
            ConfigError::Schedule { name, source } => {
                assert_eq!(name, "Bad");
                assert!(matches!(source, TaxError::Validation(_)));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            ScheduleTable::from_json("{\"federal\": 3}"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ScheduleTable::load(Some(Path::new("/nonexistent/schedules.json")))
            .expect_err("file does not exist");
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/schedules.json"));
    }

    #[test]
    fn loads_table_from_file() {
        let path = std::env::temp_dir().join(format!(
            "taxbands-schedule-{}.json",
            std::process::id()
        ));
        fs::write(
            &path,
            r#"{"federal": {"limits": [0], "rates": [0.2]},
                "jurisdictions": {"X": {"limits": [0], "rates": [0.1]}}}"#,
        )
        .expect("write temp table");
        let composer = ScheduleTable::load(Some(&path))
            .and_then(|t| t.build_composer())
            .expect("table from file");
        fs::remove_file(&path).ok();
        assert_approx(composer.combined_tax("X", 100.0, 0.0).unwrap(), 30.0);
    }
}
