use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::{bail, Context};
use regex::Regex;

use crate::error::{ResourcesError, Result};
use crate::i18n::LocaleId;
use crate::properties::Properties;

/// Which backing store resources are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Property,
    Db,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "property" | "properties" | "file" => Ok(Backend::Property),
            "db" | "database" | "sqlite" => Ok(Backend::Db),
            other => bail!("Unknown resources backend: '{}'", other),
        }
    }
}

/// Settings of the `resources` command-line tool.
#[derive(Debug, Clone)]
pub struct Config {
    /// Logical name of the resources to open
    pub name: String,

    pub backend: Backend,

    /// Base path of the property files, or of the database configuration file
    pub config_path: PathBuf,

    pub default_locale: LocaleId,

    /// Whether a missing key yields an empty value instead of an error
    pub return_null: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let default_locale = match std::env::var("RESOURCES_DEFAULT_LOCALE") {
            Ok(raw) => raw
                .parse::<LocaleId>()
                .with_context(|| format!("RESOURCES_DEFAULT_LOCALE is invalid: '{}'", raw))?,
            Err(_) => LocaleId::system_default().unwrap_or(LocaleId::US),
        };

        Ok(Self {
            name: std::env::var("RESOURCES_NAME").unwrap_or_else(|_| "Resources".to_string()),
            backend: std::env::var("RESOURCES_BACKEND")
                .unwrap_or_else(|_| "property".to_string())
                .parse()?,
            config_path: std::env::var("RESOURCES_CONFIG")
                .context("RESOURCES_CONFIG not set")?
                .into(),
            default_locale,
            return_null: std::env::var("RESOURCES_RETURN_NULL")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),
        })
    }
}

// Keys of a database resources configuration file.
pub const DB_CONNECT_DRIVER: &str = "db.connect.driver";
pub const DB_CONNECT_DATABASE: &str = "db.connect.database";
pub const DB_CONNECT_USER: &str = "db.connect.user";
pub const DB_CONNECT_PASSWORD: &str = "db.connect.password";
pub const DB_CONNECT_HOST: &str = "db.connect.host";
pub const DB_CONNECT_PORT: &str = "db.connect.port";
pub const DB_CONNECT_OPTIONS: &str = "db.connect.options";
pub const DB_CHARSET: &str = "db.charset";
pub const DB_SQL_TABLE: &str = "db.sql.table";
pub const DB_SQL_LOCALE_COLUMN: &str = "db.sql.locale.column";
pub const DB_SQL_KEY_COLUMN: &str = "db.sql.key.column";
pub const DB_SQL_VAL_COLUMN: &str = "db.sql.val.column";
pub const RESOURCE_CACHE: &str = "resource.cache";

/// Connection and schema settings of a database-backed bundle.
///
/// Read from `<config>.properties`. Only the SQLite driver is supported;
/// user, password, host, port and options are carried for other drivers and
/// ignored by SQLite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub driver: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub options: Option<String>,
    pub charset: String,
    pub table: String,
    pub locale_column: String,
    pub key_column: String,
    pub value_column: String,

    /// Memoize found values per bundle
    pub cache_resources: bool,
}

impl DbConfig {
    /// Load `<config>.properties`.
    pub fn load(config: &Path) -> Result<Self> {
        let mut file = config.as_os_str().to_owned();
        file.push(".properties");
        let properties = Properties::load(PathBuf::from(file))?;
        Self::from_properties(&properties)
    }

    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let optional = |key: &str| {
            properties
                .get(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let required = |key: &str| {
            optional(key).ok_or_else(|| {
                ResourcesError::Config(format!("missing required key {}", key))
            })
        };
        let identifier = |key: &str| {
            let value = required(key)?;
            if !is_identifier(&value) {
                return Err(ResourcesError::Config(format!(
                    "{} is not a plain SQL identifier: '{}'",
                    key, value
                )));
            }
            Ok(value)
        };

        let driver = optional(DB_CONNECT_DRIVER).unwrap_or_else(|| "sqlite".to_string());
        if !matches!(driver.to_ascii_lowercase().as_str(), "sqlite" | "sqlite3") {
            return Err(ResourcesError::Config(format!(
                "unsupported database driver '{}'",
                driver
            )));
        }

        let charset = optional(DB_CHARSET).unwrap_or_else(|| "utf8".to_string());
        if !matches!(
            charset.to_ascii_lowercase().as_str(),
            "utf8" | "utf-8" | "utf8mb4"
        ) {
            return Err(ResourcesError::Config(format!(
                "unsupported charset '{}'",
                charset
            )));
        }

        let port = optional(DB_CONNECT_PORT)
            .map(|raw| {
                raw.parse::<u16>().map_err(|_| {
                    ResourcesError::Config(format!("{} is not a port: '{}'", DB_CONNECT_PORT, raw))
                })
            })
            .transpose()?;

        let cache_resources = match optional(RESOURCE_CACHE) {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ResourcesError::Config(format!("{} is not a boolean: '{}'", RESOURCE_CACHE, raw))
            })?,
            None => false,
        };

        // Each bundle opens its own connection.
        let database = required(DB_CONNECT_DATABASE)?;
        if is_in_memory(&database) {
            return Err(ResourcesError::Config(format!(
                "{} must name a database file, not '{}'",
                DB_CONNECT_DATABASE, database
            )));
        }

        Ok(Self {
            driver,
            database,
            user: optional(DB_CONNECT_USER),
            password: optional(DB_CONNECT_PASSWORD),
            host: optional(DB_CONNECT_HOST),
            port,
            options: optional(DB_CONNECT_OPTIONS),
            charset,
            table: identifier(DB_SQL_TABLE)?,
            locale_column: identifier(DB_SQL_LOCALE_COLUMN)?,
            key_column: identifier(DB_SQL_KEY_COLUMN)?,
            value_column: identifier(DB_SQL_VAL_COLUMN)?,
            cache_resources,
        })
    }
}

fn is_in_memory(database: &str) -> bool {
    database == ":memory:"
        || database.starts_with("file::memory:")
        || (database.starts_with("file:") && database.contains("mode=memory"))
}

fn is_identifier(value: &str) -> bool {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
        .is_match(value)
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn db_properties() -> Properties {
        Properties::parse(
            "db.connect.driver=sqlite\n\
             db.connect.database=/var/lib/app/resources.db\n\
             db.charset=UTF-8\n\
             db.sql.table=resources\n\
             db.sql.locale.column=locale\n\
             db.sql.key.column=res_key\n\
             db.sql.val.column=res_value\n\
             resource.cache=true\n",
            "dbresources.properties",
        )
        .expect("Should parse")
    }

    fn clear_env() {
        for key in [
            "RESOURCES_NAME",
            "RESOURCES_BACKEND",
            "RESOURCES_CONFIG",
            "RESOURCES_DEFAULT_LOCALE",
            "RESOURCES_RETURN_NULL",
        ] {
            std::env::remove_var(key);
        }
    }

    // ==================== DbConfig Tests ====================

    #[test]
    fn test_db_config_from_properties() {
        let config = DbConfig::from_properties(&db_properties()).expect("Should parse");

        assert_eq!(config.driver, "sqlite");
        assert_eq!(config.database, "/var/lib/app/resources.db");
        assert_eq!(config.table, "resources");
        assert_eq!(config.key_column, "res_key");
        assert_eq!(config.value_column, "res_value");
        assert_eq!(config.port, None);
        assert!(config.cache_resources);
    }

    #[test]
    fn test_db_config_missing_required_key() {
        let mut properties = db_properties();
        properties.insert(DB_SQL_TABLE, "");

        let err = DbConfig::from_properties(&properties).unwrap_err();
        assert!(err.to_string().contains("db.sql.table"));
    }

    #[test]
    fn test_db_config_rejects_non_identifier_columns() {
        let mut properties = db_properties();
        properties.insert(DB_SQL_KEY_COLUMN, "key; DROP TABLE resources");

        assert!(DbConfig::from_properties(&properties).is_err());
    }

    #[test]
    fn test_db_config_rejects_other_drivers() {
        let mut properties = db_properties();
        properties.insert(DB_CONNECT_DRIVER, "mysql");

        let err = DbConfig::from_properties(&properties).unwrap_err();
        assert!(err.to_string().contains("mysql"));
    }

    #[test]
    fn test_db_config_rejects_non_utf8_charset() {
        let mut properties = db_properties();
        properties.insert(DB_CHARSET, "latin1");

        assert!(DbConfig::from_properties(&properties).is_err());
    }

    #[test]
    fn test_db_config_rejects_in_memory_database() {
        let mut properties = db_properties();
        for database in [":memory:", "file::memory:?cache=shared", "file:res?mode=memory"] {
            properties.insert(DB_CONNECT_DATABASE, database);

            match DbConfig::from_properties(&properties) {
                Err(ResourcesError::Config(message)) => assert!(message.contains(database)),
                other => panic!("Expected config error for {}, got {:?}", database, other),
            }
        }
    }

    #[test]
    fn test_db_config_parses_port() {
        let mut properties = db_properties();
        properties.insert(DB_CONNECT_PORT, "3306");
        assert_eq!(DbConfig::from_properties(&properties).unwrap().port, Some(3306));

        properties.insert(DB_CONNECT_PORT, "huge");
        assert!(DbConfig::from_properties(&properties).is_err());
    }

    #[test]
    fn test_db_config_cache_defaults_to_off() {
        let mut properties = Properties::new();
        for (key, value) in db_properties().iter() {
            if key != RESOURCE_CACHE {
                properties.insert(key, value);
            }
        }

        assert!(!DbConfig::from_properties(&properties).unwrap().cache_resources);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    // ==================== Environment Tests ====================

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env();
        std::env::set_var("RESOURCES_CONFIG", "data/testresources");
        std::env::set_var("RESOURCES_DEFAULT_LOCALE", "de_DE");

        let config = Config::from_env().expect("Should load config");
        assert_eq!(config.name, "Resources");
        assert_eq!(config.backend, Backend::Property);
        assert_eq!(config.config_path, PathBuf::from("data/testresources"));
        assert_eq!(config.default_locale, LocaleId::GERMANY);
        assert!(config.return_null);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides() {
        clear_env();
        std::env::set_var("RESOURCES_NAME", "DBResources");
        std::env::set_var("RESOURCES_BACKEND", "db");
        std::env::set_var("RESOURCES_CONFIG", "conf/dbresources");
        std::env::set_var("RESOURCES_DEFAULT_LOCALE", "en-US");
        std::env::set_var("RESOURCES_RETURN_NULL", "false");

        let config = Config::from_env().expect("Should load config");
        assert_eq!(config.name, "DBResources");
        assert_eq!(config.backend, Backend::Db);
        assert_eq!(config.default_locale, LocaleId::US);
        assert!(!config.return_null);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_requires_config_path() {
        clear_env();

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("RESOURCES_CONFIG"));
    }

    #[test]
    #[serial]
    fn test_config_rejects_unknown_backend() {
        clear_env();
        std::env::set_var("RESOURCES_CONFIG", "x");
        std::env::set_var("RESOURCES_BACKEND", "ldap");

        assert!(Config::from_env().is_err());

        clear_env();
    }
}
