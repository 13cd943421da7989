use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bundle::{substitute, BundleLoader, BundleState, Params, ResourceBundle};
use crate::error::{ResourcesError, Result};
use crate::i18n::LocaleId;
use crate::properties::Properties;

/// Joins the base path and the locale in a bundle file name.
pub const SEPARATOR: char = '_';

/// Extension of every bundle file.
pub const EXTENSION: &str = "properties";

/// A bundle backed by `<base>_<locale>.properties`.
///
/// The whole file is held in memory; `replace` and `attach` only touch the
/// in-memory copy until `save` writes it back.
#[derive(Debug)]
pub struct PropertyResourceBundle {
    base: PathBuf,
    locale: LocaleId,
    properties: Properties,
    state: BundleState,
}

impl PropertyResourceBundle {
    /// Create an uninitialized bundle. Call `initialize` before use.
    pub fn new(base: impl Into<PathBuf>, locale: LocaleId) -> Self {
        Self {
            base: base.into(),
            locale,
            properties: Properties::new(),
            state: BundleState::Uninitialized,
        }
    }

    /// Create and initialize the bundle for `locale`.
    pub fn get_bundle(base: impl Into<PathBuf>, locale: LocaleId) -> Result<Self> {
        let mut bundle = Self::new(base, locale);
        bundle.initialize()?;
        Ok(bundle)
    }

    /// The file this bundle reads from and saves to.
    pub fn path(&self) -> PathBuf {
        bundle_path(&self.base, &self.locale)
    }
}

/// `<base>_<locale>.properties`, appended to the base's final component.
pub fn bundle_path(base: &Path, locale: &LocaleId) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!("{}{}.{}", SEPARATOR, locale, EXTENSION));
    PathBuf::from(name)
}

impl ResourceBundle for PropertyResourceBundle {
    fn locale(&self) -> &LocaleId {
        &self.locale
    }

    fn state(&self) -> BundleState {
        self.state
    }

    fn initialize(&mut self) -> Result<()> {
        self.state.ensure_uninitialized()?;

        let path = self.path();
        self.properties = Properties::load(&path).map_err(|e| {
            ResourcesError::Initialization(format!(
                "cannot load resource bundle {}: {}",
                path.display(),
                e
            ))
        })?;
        self.state = BundleState::Initialized;

        debug!(
            "Initialized property bundle {} with {} keys",
            path.display(),
            self.properties.len()
        );
        Ok(())
    }

    fn find(&self, key: &str, params: Option<&Params<'_>>) -> Result<String> {
        self.state.ensure_initialized("find")?;
        let value = self.properties.get(key).unwrap_or_default();
        Ok(substitute(value, params))
    }

    fn replace(&mut self, key: &str, value: &str) -> Result<()> {
        self.state.ensure_initialized("replace")?;
        self.properties.insert(key, value);
        Ok(())
    }

    fn attach(&mut self, key: &str, value: &str) -> Result<bool> {
        self.state.ensure_initialized("attach")?;
        if self.properties.contains_key(key) {
            return Ok(false);
        }
        self.properties.insert(key, value);
        Ok(true)
    }

    fn find_key_by_value(&self, value: &str) -> Result<Option<String>> {
        self.state.ensure_initialized("search")?;
        Ok(self.properties.find_key_by_value(value).map(str::to_string))
    }

    fn count(&self) -> Result<usize> {
        self.state.ensure_initialized("count")?;
        Ok(self.properties.len())
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.state.ensure_initialized("list keys of")?;
        Ok(self.properties.keys().map(str::to_string).collect())
    }

    fn save(&mut self) -> Result<()> {
        self.state.ensure_initialized("save")?;
        self.properties.store(self.path())
    }

    fn destroy(&mut self) -> Result<()> {
        self.state.ensure_initialized("destroy")?;
        self.properties = Properties::new();
        self.state = BundleState::Destroyed;
        Ok(())
    }
}

/// Loads property bundles that share one base path.
#[derive(Debug, Clone)]
pub struct PropertyBundleLoader {
    base: PathBuf,
}

impl PropertyBundleLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl BundleLoader for PropertyBundleLoader {
    fn load(&self, locale: &LocaleId) -> Result<Box<dyn ResourceBundle>> {
        let bundle = PropertyResourceBundle::get_bundle(self.base.clone(), locale.clone())?;
        Ok(Box::new(bundle))
    }
}
