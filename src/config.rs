//! Environment-driven configuration
//!
//! Read once at process start. Missing credentials are fatal here; the rest
//! of the system receives dependencies explicitly and never touches the
//! environment.

use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TELEGRAM_TOKEN is not set")]
    MissingToken,
    #[error("invalid value for {name}: {value}")]
    Invalid { name: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub db_path: PathBuf,
    pub cards_dir: PathBuf,
    pub admin_ids: HashSet<i64>,
    pub yandex_folder_id: Option<String>,
    pub yandex_api_key: Option<String>,
    /// Append a failure entry for cooldown-rejected requests.
    pub log_rejected: bool,
    /// Purge cooldown records and log entries older than this many days.
    pub retention_days: Option<i64>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(|name| std::env::var(name).ok())
    }

    fn parse(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let telegram_token = var("TELEGRAM_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let db_path = var("ARCANA_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.arcana/arcana.db"))
            },
            PathBuf::from,
        );

        let cards_dir = var("ARCANA_CARDS_DIR")
            .map_or_else(|| PathBuf::from("assets/cards"), PathBuf::from);

        let admin_ids = match var("ADMIN_USER_IDS") {
            Some(raw) => parse_id_list(&raw)?,
            None => HashSet::new(),
        };

        let log_rejected = var("ARCANA_LOG_REJECTED")
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let retention_days = match var("ARCANA_RETENTION_DAYS") {
            Some(raw) => {
                let days = raw.parse::<i64>().ok().filter(|d| *d >= 1).ok_or_else(|| {
                    ConfigError::Invalid {
                        name: "ARCANA_RETENTION_DAYS".to_string(),
                        value: raw,
                    }
                })?;
                Some(days)
            }
            None => None,
        };

        Ok(Self {
            telegram_token,
            db_path,
            cards_dir,
            admin_ids,
            yandex_folder_id: var("YANDEX_FOLDER_ID").filter(|v| !v.is_empty()),
            yandex_api_key: var("YANDEX_AUTH_TOKEN").filter(|v| !v.is_empty()),
            log_rejected,
            retention_days,
        })
    }

    /// Folder id and API key, when both are configured.
    pub fn interpreter_credentials(&self) -> Option<(&str, &str)> {
        match (&self.yandex_folder_id, &self.yandex_api_key) {
            (Some(folder), Some(key)) => Some((folder, key)),
            _ => None,
        }
    }
}

fn parse_id_list(raw: &str) -> Result<HashSet<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| ConfigError::Invalid {
                name: "ADMIN_USER_IDS".to_string(),
                value: raw.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |name| map.get(name).map(|v| (*v).to_string())
    }

    #[test]
    fn token_is_required() {
        let err = Config::parse(env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::parse(env(&[("TELEGRAM_TOKEN", "t"), ("HOME", "/home/ada")]))
            .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/home/ada/.arcana/arcana.db"));
        assert_eq!(config.cards_dir, PathBuf::from("assets/cards"));
        assert!(config.admin_ids.is_empty());
        assert!(!config.log_rejected);
        assert_eq!(config.retention_days, None);
        assert!(config.interpreter_credentials().is_none());
    }

    #[test]
    fn admin_ids_parse_as_list() {
        let config = Config::parse(env(&[
            ("TELEGRAM_TOKEN", "t"),
            ("ADMIN_USER_IDS", "1, 42 ,7"),
        ]))
        .unwrap();
        assert_eq!(config.admin_ids, HashSet::from([1, 42, 7]));

        let err = Config::parse(env(&[
            ("TELEGRAM_TOKEN", "t"),
            ("ADMIN_USER_IDS", "1,abc"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name, .. } if name == "ADMIN_USER_IDS"));
    }

    #[test]
    fn interpreter_needs_both_credentials() {
        let config = Config::parse(env(&[
            ("TELEGRAM_TOKEN", "t"),
            ("YANDEX_FOLDER_ID", "folder"),
        ]))
        .unwrap();
        assert!(config.interpreter_credentials().is_none());

        let config = Config::parse(env(&[
            ("TELEGRAM_TOKEN", "t"),
            ("YANDEX_FOLDER_ID", "folder"),
            ("YANDEX_AUTH_TOKEN", "key"),
        ]))
        .unwrap();
        assert_eq!(config.interpreter_credentials(), Some(("folder", "key")));
    }

    #[test]
    fn retention_rejects_non_positive_values() {
        let err = Config::parse(env(&[
            ("TELEGRAM_TOKEN", "t"),
            ("ARCANA_RETENTION_DAYS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let config = Config::parse(env(&[
            ("TELEGRAM_TOKEN", "t"),
            ("ARCANA_RETENTION_DAYS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.retention_days, Some(30));
    }
}
