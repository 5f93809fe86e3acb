use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CatalogConfig, SlotCatalog};
use crate::error::{CoreError, Result};

pub const DEFAULT_SCOPE: &str = "default";

/// Top-level config (timetable.toml + TIMETABLE_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimetableConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub school: SchoolConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Which tenant the operator works in when no scope is given explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolConfig {
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
        }
    }
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.timetable/timetable.db", home)
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.timetable/timetable.toml", home)
}

impl TimetableConfig {
    /// Load config from a TOML file with TIMETABLE_* env var overrides.
    ///
    /// Uses the explicit path if given, otherwise `~/.timetable/timetable.toml`.
    /// A missing file is not an error; every section has defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(%path, "loading timetable config");

        Self::extract(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("TIMETABLE_").split("_")),
        )
    }

    /// Parse config from an inline TOML document (no env overrides).
    pub fn from_toml(toml: &str) -> Result<Self> {
        Self::extract(Figment::new().merge(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: TimetableConfig = figment
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Build and validate the slot catalog described by `[catalog]`.
    pub fn slot_catalog(&self) -> Result<SlotCatalog> {
        SlotCatalog::from_config(&self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Day, Slot};

    #[test]
    fn empty_document_uses_defaults() {
        let config = TimetableConfig::from_toml("").unwrap();
        assert_eq!(config.school.scope, DEFAULT_SCOPE);
        assert!(config.database.path.ends_with("timetable.db"));

        let catalog = config.slot_catalog().unwrap();
        assert_eq!(catalog.days().len(), 6);
        assert_eq!(catalog.slots().len(), 8);
    }

    #[test]
    fn custom_catalog_is_read() {
        let config = TimetableConfig::from_toml(
            r#"
            [database]
            path = "/tmp/school.db"

            [school]
            scope = "north-campus"

            [catalog]
            days = ["monday", "wednesday"]

            [[catalog.slots]]
            label = "P1"
            start = "09:00"
            end = "10:00"

            [[catalog.slots]]
            label = "P2"
            start = "10:30"
            end = "11:30"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, "/tmp/school.db");
        assert_eq!(config.school.scope, "north-campus");

        let catalog = config.slot_catalog().unwrap();
        assert_eq!(catalog.days(), &[Day::Monday, Day::Wednesday]);
        assert!(catalog.contains_slot(&Slot::new("P2")));
        assert!(!catalog.contains_day(Day::Tuesday));
    }

    #[test]
    fn malformed_document_is_config_error() {
        let err = TimetableConfig::from_toml("[catalog]\ndays = [\"funday\"]").unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
