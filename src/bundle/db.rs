use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use rusqlite::{params, Connection, OpenFlags};
use tracing::debug;

use crate::bundle::{substitute, BundleLoader, BundleState, Params, ResourceBundle};
use crate::config::DbConfig;
use crate::error::{ResourcesError, Result};
use crate::i18n::LocaleId;

/// SQL for every bundle operation, built once from the configured schema.
#[derive(Debug, Clone)]
struct Statements {
    select_value: String,
    update_value: String,
    insert: String,
    select_key: String,
    count: String,
    keys: String,
}

impl Statements {
    fn new(config: &DbConfig) -> Self {
        let table = quote(&config.table);
        let locale = quote(&config.locale_column);
        let key = quote(&config.key_column);
        let value = quote(&config.value_column);

        Self {
            select_value: format!(
                "SELECT {value} FROM {table} WHERE {key} = ?1 AND {locale} = ?2"
            ),
            update_value: format!(
                "UPDATE {table} SET {value} = ?1, {locale} = ?2 WHERE {key} = ?3 AND {locale} = ?2"
            ),
            insert: format!("INSERT INTO {table} ({key}, {value}, {locale}) VALUES (?1, ?2, ?3)"),
            select_key: format!(
                "SELECT {key} FROM {table} WHERE {value} = ?1 AND {locale} = ?2"
            ),
            count: format!(
                "SELECT COUNT({key}) AS size FROM {table} WHERE {locale} = ?1 GROUP BY {key}"
            ),
            keys: format!("SELECT {key} FROM {table} WHERE {locale} = ?1 GROUP BY {key}"),
        }
    }

    fn all(&self) -> [&str; 6] {
        [
            self.select_value.as_str(),
            self.update_value.as_str(),
            self.insert.as_str(),
            self.select_key.as_str(),
            self.count.as_str(),
            self.keys.as_str(),
        ]
    }
}

/// Identifiers are validated by `DbConfig`; quoting guards against keywords.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

/// A bundle backed by the rows of one locale in a resources table.
///
/// Every mutation is written immediately, so `save` has nothing to do.
/// When `resource.cache` is enabled, found values are memoized for the
/// lifetime of the bundle.
pub struct DbResourceBundle {
    config_path: PathBuf,
    locale: LocaleId,
    conn: Option<Connection>,
    statements: Option<Statements>,
    cache: Option<RefCell<HashMap<String, String>>>,
    state: BundleState,
}

impl DbResourceBundle {
    /// Create an uninitialized bundle reading its settings from
    /// `<config_path>.properties`.
    pub fn new(config_path: impl Into<PathBuf>, locale: LocaleId) -> Self {
        Self {
            config_path: config_path.into(),
            locale,
            conn: None,
            statements: None,
            cache: None,
            state: BundleState::Uninitialized,
        }
    }

    /// Create and initialize the bundle for `locale`.
    pub fn get_bundle(config_path: impl Into<PathBuf>, locale: LocaleId) -> Result<Self> {
        let mut bundle = Self::new(config_path, locale);
        bundle.initialize()?;
        Ok(bundle)
    }

    /// Initialize from an already parsed configuration.
    pub fn initialize_with(&mut self, config: &DbConfig) -> Result<()> {
        self.state.ensure_uninitialized()?;

        let conn = Connection::open_with_flags(
            &config.database,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            ResourcesError::Initialization(format!(
                "cannot connect to database {}: {}",
                config.database, e
            ))
        })?;

        let statements = Statements::new(config);
        for sql in statements.all() {
            conn.prepare_cached(sql).map_err(|e| {
                ResourcesError::Initialization(format!(
                    "resources table {} does not match the configured schema: {}",
                    config.table, e
                ))
            })?;
        }

        self.conn = Some(conn);
        self.statements = Some(statements);
        self.cache = config
            .cache_resources
            .then(|| RefCell::new(HashMap::new()));
        self.state = BundleState::Initialized;

        debug!(
            "Initialized database bundle {} for {} (cache: {})",
            config.database, self.locale, config.cache_resources
        );
        Ok(())
    }

    fn session(&self, operation: &'static str) -> Result<(&Connection, &Statements)> {
        self.state.ensure_initialized(operation)?;
        match (&self.conn, &self.statements) {
            (Some(conn), Some(statements)) => Ok((conn, statements)),
            _ => Err(ResourcesError::InvalidState {
                state: self.state.as_str(),
                operation,
            }),
        }
    }

    fn cached(&self, key: &str) -> Option<String> {
        self.cache
            .as_ref()
            .and_then(|cache| cache.borrow().get(key).cloned())
    }

    fn remember(&self, key: &str, value: &str) {
        if let Some(cache) = &self.cache {
            cache.borrow_mut().insert(key.to_string(), value.to_string());
        }
    }
}

impl ResourceBundle for DbResourceBundle {
    fn locale(&self) -> &LocaleId {
        &self.locale
    }

    fn state(&self) -> BundleState {
        self.state
    }

    fn initialize(&mut self) -> Result<()> {
        self.state.ensure_uninitialized()?;
        let config = DbConfig::load(&self.config_path)
            .map_err(|e| ResourcesError::Initialization(e.to_string()))?;
        self.initialize_with(&config)
    }

    fn find(&self, key: &str, params: Option<&Params<'_>>) -> Result<String> {
        let (conn, statements) = self.session("find")?;

        let resource = match self.cached(key) {
            Some(value) => value,
            None => {
                let mut stmt = conn.prepare_cached(&statements.select_value)?;
                let mut rows = stmt.query(params![key, self.locale.to_string()])?;

                // Several matching rows: the last one fetched wins.
                let mut resource = String::new();
                while let Some(row) = rows.next()? {
                    resource = row.get::<_, Option<String>>(0)?.unwrap_or_default();
                }
                if !resource.is_empty() {
                    self.remember(key, &resource);
                }
                resource
            }
        };

        Ok(substitute(&resource, params))
    }

    fn replace(&mut self, key: &str, value: &str) -> Result<()> {
        let (conn, statements) = self.session("replace")?;

        let rows = conn
            .prepare_cached(&statements.update_value)?
            .execute(params![value, self.locale.to_string(), key])?;
        if rows > 0 {
            self.remember(key, value);
        } else {
            debug!("Replace of {} in {} matched no rows", key, self.locale);
        }
        Ok(())
    }

    fn attach(&mut self, key: &str, value: &str) -> Result<bool> {
        let (conn, statements) = self.session("attach")?;

        let rows = conn
            .prepare_cached(&statements.insert)?
            .execute(params![key, value, self.locale.to_string()])?;
        if rows > 1 {
            return Err(ResourcesError::DuplicateInsert {
                key: key.to_string(),
                rows,
            });
        }
        if rows == 1 {
            self.remember(key, value);
        }
        Ok(rows == 1)
    }

    fn find_key_by_value(&self, value: &str) -> Result<Option<String>> {
        let (conn, statements) = self.session("search")?;

        let mut stmt = conn.prepare_cached(&statements.select_key)?;
        let mut rows = stmt.query(params![value, self.locale.to_string()])?;

        let mut key = None;
        while let Some(row) = rows.next()? {
            key = row.get::<_, Option<String>>(0)?;
        }
        Ok(key)
    }

    /// Size of the first group of rows sharing a key, or 0 for an empty
    /// locale.
    fn count(&self) -> Result<usize> {
        let (conn, statements) = self.session("count")?;

        let mut stmt = conn.prepare_cached(&statements.count)?;
        let mut rows = stmt.query(params![self.locale.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(row.get::<_, i64>("size")?.max(0) as usize),
            None => Ok(0),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let (conn, statements) = self.session("list keys of")?;

        let mut stmt = conn.prepare_cached(&statements.keys)?;
        let keys = stmt
            .query_map(params![self.locale.to_string()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn save(&mut self) -> Result<()> {
        self.state.ensure_initialized("save")
    }

    fn destroy(&mut self) -> Result<()> {
        self.state.ensure_initialized("destroy")?;

        self.statements = None;
        self.cache = None;
        self.state = BundleState::Destroyed;
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| ResourcesError::Database(e))?;
        }
        debug!("Closed database bundle for {}", self.locale);
        Ok(())
    }
}

/// Loads database bundles that share one configuration file.
#[derive(Debug, Clone)]
pub struct DbBundleLoader {
    config_path: PathBuf,
    config: DbConfig,
}

impl DbBundleLoader {
    /// Parse `<config_path>.properties` once for every bundle this loader
    /// creates.
    pub fn new(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();
        let config = DbConfig::load(&config_path)
            .map_err(|e| ResourcesError::Initialization(e.to_string()))?;
        Ok(Self {
            config_path,
            config,
        })
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }
}

impl BundleLoader for DbBundleLoader {
    fn load(&self, locale: &LocaleId) -> Result<Box<dyn ResourceBundle>> {
        let mut bundle = DbResourceBundle::new(self.config_path.clone(), locale.clone());
        bundle.initialize_with(&self.config)?;
        Ok(Box::new(bundle))
    }
}
