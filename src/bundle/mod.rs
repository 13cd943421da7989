//! Resource bundles: the localized key/value data of one resource name in
//! one locale.
//!
//! Two backing stores are provided:
//!
//! - `property`: a `<base>_<locale>.properties` file held in memory until
//!   `save()` writes it back
//! - `db`: rows of a SQLite table, read and written statement by statement
//!
//! Every bundle moves through `Uninitialized -> Initialized -> Destroyed`.
//! Operations are only valid while `Initialized`; anything else fails with
//! `ResourcesError::InvalidState`.

mod db;
mod property;

pub use db::{DbBundleLoader, DbResourceBundle};
pub use property::{bundle_path, PropertyBundleLoader, PropertyResourceBundle};

#[cfg(test)]
pub(crate) use db::tests::create_test_db;

use crate::error::{ResourcesError, Result};
use crate::i18n::LocaleId;

/// Ordered placeholder replacements: each `{name}` becomes `value`.
pub type Params<'a> = [(&'a str, &'a str)];

/// Lifecycle of a bundle's backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleState {
    Uninitialized,
    Initialized,
    Destroyed,
}

impl BundleState {
    pub fn as_str(self) -> &'static str {
        match self {
            BundleState::Uninitialized => "uninitialized",
            BundleState::Initialized => "initialized",
            BundleState::Destroyed => "destroyed",
        }
    }

    /// Fail unless the bundle is ready to serve `operation`.
    pub(crate) fn ensure_initialized(self, operation: &'static str) -> Result<()> {
        match self {
            BundleState::Initialized => Ok(()),
            other => Err(ResourcesError::InvalidState {
                state: other.as_str(),
                operation,
            }),
        }
    }

    pub(crate) fn ensure_uninitialized(self) -> Result<()> {
        match self {
            BundleState::Uninitialized => Ok(()),
            other => Err(ResourcesError::InvalidState {
                state: other.as_str(),
                operation: "initialize",
            }),
        }
    }
}

/// The localized data for one (resource name, locale) pair.
pub trait ResourceBundle: Send {
    /// The locale this bundle is bound to for its lifetime.
    fn locale(&self) -> &LocaleId;

    fn state(&self) -> BundleState;

    /// Open the backing store. Valid exactly once.
    fn initialize(&mut self) -> Result<()>;

    /// The value stored under `key` with `params` substituted, or an empty
    /// string if the key is absent.
    fn find(&self, key: &str, params: Option<&Params<'_>>) -> Result<String>;

    /// Store `value` under `key`.
    fn replace(&mut self, key: &str, value: &str) -> Result<()>;

    /// Add `key` with `value`, returning whether the insert happened.
    fn attach(&mut self, key: &str, value: &str) -> Result<bool>;

    fn find_key_by_value(&self, value: &str) -> Result<Option<String>>;

    fn count(&self) -> Result<usize>;

    fn keys(&self) -> Result<Vec<String>>;

    /// Persist pending changes to the backing store.
    fn save(&mut self) -> Result<()>;

    /// Release the backing store. No operation is valid afterwards.
    fn destroy(&mut self) -> Result<()>;
}

/// Builds initialized bundles for one resource name, one locale at a time.
pub trait BundleLoader: Send + Sync {
    fn load(&self, locale: &LocaleId) -> Result<Box<dyn ResourceBundle>>;
}

/// Replace every `{name}` in `value` with its parameter, in order.
///
/// Replacement is literal: a later parameter also sees text inserted by an
/// earlier one. Placeholders without a parameter are left intact.
pub fn substitute(value: &str, params: Option<&Params<'_>>) -> String {
    let mut resource = value.to_string();
    for (name, replacement) in params.unwrap_or_default() {
        resource = resource.replace(&format!("{{{}}}", name), replacement);
    }
    resource
}
