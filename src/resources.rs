//! Resources container: every locale of one logical resource name.
//!
//! Bundles are loaded lazily, one per locale, the first time a locale is
//! used, and stay cached until the container is destroyed.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::bundle::{BundleLoader, BundleState, Params, ResourceBundle};
use crate::error::{ResourcesError, Result};
use crate::i18n::{LocaleId, ResourceMetrics};

type BundleMap = HashMap<String, Box<dyn ResourceBundle>>;

pub struct Resources {
    name: String,
    default_locale: Mutex<LocaleId>,
    return_null: AtomicBool,
    loader: Box<dyn BundleLoader>,
    bundles: Mutex<BundleMap>,
    metrics: Arc<ResourceMetrics>,
}

impl Resources {
    /// Create an empty container. Missing keys yield `None` until
    /// `set_return_null(false)` is called.
    pub fn new(
        name: impl Into<String>,
        default_locale: LocaleId,
        loader: Box<dyn BundleLoader>,
    ) -> Self {
        Self {
            name: name.into(),
            default_locale: Mutex::new(default_locale),
            return_null: AtomicBool::new(true),
            loader,
            bundles: Mutex::new(HashMap::new()),
            metrics: Arc::new(ResourceMetrics::new()),
        }
    }

    /// Count lookups into a shared metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<ResourceMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_locale(&self) -> Result<LocaleId> {
        self.default_locale
            .lock()
            .map(|locale| locale.clone())
            .map_err(|_| ResourcesError::Poisoned("default locale"))
    }

    pub fn set_default_locale(&self, locale: LocaleId) -> Result<()> {
        *self
            .default_locale
            .lock()
            .map_err(|_| ResourcesError::Poisoned("default locale"))? = locale;
        Ok(())
    }

    pub fn is_return_null(&self) -> bool {
        self.return_null.load(Ordering::Relaxed)
    }

    pub fn set_return_null(&self, return_null: bool) {
        self.return_null.store(return_null, Ordering::Relaxed);
    }

    pub fn metrics(&self) -> &Arc<ResourceMetrics> {
        &self.metrics
    }

    /// Resolve `key` in `locale` (the default locale if `None`).
    ///
    /// An empty value is returned as `Ok(None)` when the container returns
    /// nulls, and as `ResourcesError::KeyNotFound` otherwise.
    pub fn find(
        &self,
        key: &str,
        locale: Option<&LocaleId>,
        params: Option<&Params<'_>>,
    ) -> Result<Option<String>> {
        self.metrics.record_lookup();

        let locale = match locale {
            Some(locale) => locale.clone(),
            None => self.default_locale()?,
        };
        let value = self.with_bundle(&locale, |bundle| bundle.find(key, params))?;

        if value.is_empty() {
            self.metrics.record_key_miss();
            if !self.is_return_null() {
                return Err(ResourcesError::KeyNotFound {
                    key: key.to_string(),
                });
            }
            debug!("No value for {} in {} ({})", key, self.name, locale);
            return Ok(None);
        }

        Ok(Some(value))
    }

    /// Run `f` against the bundle for `locale`, loading it on first use.
    pub fn with_bundle<R>(
        &self,
        locale: &LocaleId,
        f: impl FnOnce(&mut dyn ResourceBundle) -> Result<R>,
    ) -> Result<R> {
        let mut bundles = self.lock_bundles()?;

        let bundle = match bundles.entry(locale.to_string()) {
            Entry::Occupied(entry) => {
                self.metrics.record_bundle_hit();
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                let bundle = self.loader.load(locale)?;
                self.metrics.record_bundle_load();
                debug!("Loaded bundle {} for {}", self.name, locale);
                entry.insert(bundle)
            }
        };

        f(bundle.as_mut())
    }

    /// Cache an initialized bundle, destroying any bundle it replaces.
    pub fn add(&self, bundle: Box<dyn ResourceBundle>) -> Result<()> {
        bundle.state().ensure_initialized("cache")?;

        let replaced = self
            .lock_bundles()?
            .insert(bundle.locale().to_string(), bundle);
        match replaced {
            Some(mut old) if old.state() == BundleState::Initialized => old.destroy(),
            _ => Ok(()),
        }
    }

    /// Locale strings of the bundles loaded so far, sorted.
    pub fn loaded_locales(&self) -> Result<Vec<String>> {
        let mut locales: Vec<String> = self.lock_bundles()?.keys().cloned().collect();
        locales.sort();
        Ok(locales)
    }

    /// Union of the keys of every loaded bundle.
    ///
    /// Bundles are visited in locale order and keys keep the order in which
    /// they were first seen. Locales never used contribute nothing.
    pub fn keys(&self) -> Result<Vec<String>> {
        let bundles = self.lock_bundles()?;
        let mut locales: Vec<&String> = bundles.keys().collect();
        locales.sort();

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for locale in locales {
            for key in bundles[locale].keys()? {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    /// Persist every loaded bundle.
    pub fn save(&self) -> Result<()> {
        for bundle in self.lock_bundles()?.values_mut() {
            bundle.save()?;
        }
        Ok(())
    }

    /// Destroy every loaded bundle and empty the cache.
    ///
    /// All bundles are destroyed even if one fails; the first failure is
    /// returned.
    pub fn destroy(&self) -> Result<()> {
        let drained: Vec<_> = self.lock_bundles()?.drain().collect();
        let count = drained.len();

        let mut first_error = None;
        for (_, mut bundle) in drained {
            if let Err(e) = bundle.destroy() {
                first_error.get_or_insert(e);
            }
        }

        info!("Destroyed {} bundles of {}", count, self.name);
        first_error.map_or(Ok(()), Err)
    }

    fn lock_bundles(&self) -> Result<MutexGuard<'_, BundleMap>> {
        self.bundles
            .lock()
            .map_err(|_| ResourcesError::Poisoned("bundle cache"))
    }
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resources")
            .field("name", &self.name)
            .field("return_null", &self.is_return_null())
            .field("loaded_locales", &self.loaded_locales().unwrap_or_default())
            .finish()
    }
}
