//! Factories that hand out one shared `Resources` container per name.
//!
//! The first request for a name builds and caches the container; later
//! requests for the same name get the cached instance, whatever
//! configuration they pass.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::bundle::{DbBundleLoader, PropertyBundleLoader};
use crate::error::{ResourcesError, Result};
use crate::i18n::{LocaleId, ResourceMetrics};
use crate::resources::Resources;

type Entries = HashMap<String, (PathBuf, Arc<Resources>)>;

/// Cache and settings shared by every factory implementation.
#[derive(Debug)]
pub struct FactoryState {
    entries: Mutex<Entries>,
    return_null: AtomicBool,
    default_locale: LocaleId,
    metrics: Arc<ResourceMetrics>,
}

impl FactoryState {
    pub fn new(default_locale: LocaleId) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            return_null: AtomicBool::new(true),
            default_locale,
            metrics: Arc::new(ResourceMetrics::new()),
        }
    }

    pub fn default_locale(&self) -> &LocaleId {
        &self.default_locale
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| ResourcesError::Poisoned("resources cache"))
    }
}

impl Default for FactoryState {
    fn default() -> Self {
        Self::new(LocaleId::system_default().unwrap_or(LocaleId::US))
    }
}

pub trait ResourcesFactory: Send + Sync {
    /// Build a fresh container for `name` backed by `config`.
    fn create_resources(&self, name: &str, config: &Path, return_null: bool) -> Result<Resources>;

    fn state(&self) -> &FactoryState;

    /// The container for `name`, created from `config` on first request.
    fn get_resources(&self, name: &str, config: &Path) -> Result<Arc<Resources>> {
        let state = self.state();
        let mut entries = state.lock()?;

        if let Some((cached_config, resources)) = entries.get(name) {
            if cached_config != config {
                warn!(
                    "Resources {} already created from {}, ignoring {}",
                    name,
                    cached_config.display(),
                    config.display()
                );
            }
            return Ok(Arc::clone(resources));
        }

        let resources = self
            .create_resources(name, config, self.is_return_null())
            .map_err(|e| match e {
                ResourcesError::Initialization(_) => e,
                other => ResourcesError::Initialization(format!(
                    "failed to create resources {}: {}",
                    name, other
                )),
            })?
            .with_metrics(Arc::clone(&state.metrics));
        let resources = Arc::new(resources);

        info!("Created resources {} from {}", name, config.display());
        entries.insert(name.to_string(), (config.to_path_buf(), Arc::clone(&resources)));
        Ok(resources)
    }

    /// Value of the return-null flag given to containers created from now on.
    fn is_return_null(&self) -> bool {
        self.state().return_null.load(Ordering::Relaxed)
    }

    fn set_return_null(&self, return_null: bool) {
        self.state().return_null.store(return_null, Ordering::Relaxed);
    }

    /// Destroy every cached container and empty the cache.
    ///
    /// Handles still held by callers survive but are left with no loaded
    /// bundles. The first destroy failure is returned.
    fn release(&self) -> Result<()> {
        let drained: Vec<_> = self.state().lock()?.drain().collect();
        if drained.is_empty() {
            return Ok(());
        }

        info!("Releasing {} resources", drained.len());
        let mut first_error = None;
        for (_, (_, resources)) in drained {
            if let Err(e) = resources.destroy() {
                warn!("Failed to destroy resources {}: {}", resources.name(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Counters shared by every container this factory created.
    fn metrics(&self) -> Arc<ResourceMetrics> {
        Arc::clone(&self.state().metrics)
    }

    fn contains(&self, name: &str) -> bool {
        self.state()
            .lock()
            .map(|entries| entries.contains_key(name))
            .unwrap_or(false)
    }

    fn len(&self) -> usize {
        self.state().lock().map(|entries| entries.len()).unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Containers backed by `<config>_<locale>.properties` files.
#[derive(Debug, Default)]
pub struct PropertyResourcesFactory {
    state: FactoryState,
}

impl PropertyResourcesFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_locale(default_locale: LocaleId) -> Self {
        Self {
            state: FactoryState::new(default_locale),
        }
    }
}

impl ResourcesFactory for PropertyResourcesFactory {
    fn create_resources(&self, name: &str, config: &Path, return_null: bool) -> Result<Resources> {
        let resources = Resources::new(
            name,
            self.state.default_locale().clone(),
            Box::new(PropertyBundleLoader::new(config)),
        );
        resources.set_return_null(return_null);
        Ok(resources)
    }

    fn state(&self) -> &FactoryState {
        &self.state
    }
}

/// Containers backed by a SQLite table described in
/// `<config>.properties`.
#[derive(Debug, Default)]
pub struct DbResourcesFactory {
    state: FactoryState,
}

impl DbResourcesFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_locale(default_locale: LocaleId) -> Self {
        Self {
            state: FactoryState::new(default_locale),
        }
    }
}

impl ResourcesFactory for DbResourcesFactory {
    fn create_resources(&self, name: &str, config: &Path, return_null: bool) -> Result<Resources> {
        // The configuration is read here so a bad file fails the request,
        // not the first lookup.
        let loader = DbBundleLoader::new(config)?;
        let resources = Resources::new(name, self.state.default_locale().clone(), Box::new(loader));
        resources.set_return_null(return_null);
        Ok(resources)
    }

    fn state(&self) -> &FactoryState {
        &self.state
    }
}
