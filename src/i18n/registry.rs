//! Locale registry: the well-known locales resources are usually kept in.
//!
//! Bulk export walks this registry when the caller does not name the locales
//! to export. The registry is immutable and initialized on first access.

use std::sync::OnceLock;

use crate::i18n::LocaleId;

/// Metadata for a well-known locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    pub locale: LocaleId,

    /// English name of the locale (e.g., "German (Germany)")
    pub name: &'static str,

    /// Native name of the locale (e.g., "Deutsch (Deutschland)")
    pub native_name: &'static str,

    /// Whether bulk operations include this locale by default
    pub enabled: bool,
}

pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global locale registry instance.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: default_locales(),
        })
    }

    /// Look up a locale by its canonical string (e.g., "de_DE").
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales
            .iter()
            .find(|config| config.locale.to_string() == code)
    }

    pub fn list_enabled(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().filter(|config| config.enabled).collect()
    }

    pub fn list_all(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().collect()
    }

    /// The enabled locales as plain identifiers, in registry order.
    pub fn enabled_locales(&self) -> Vec<LocaleId> {
        self.list_enabled()
            .into_iter()
            .map(|config| config.locale.clone())
            .collect()
    }

    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|config| config.enabled)
            .unwrap_or(false)
    }
}

/// Germany and the US are the locales every resource set is expected to
/// carry; the rest are known but opt-in.
fn default_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig {
            locale: LocaleId::GERMANY,
            name: "German (Germany)",
            native_name: "Deutsch (Deutschland)",
            enabled: true,
        },
        LocaleConfig {
            locale: LocaleId::US,
            name: "English (United States)",
            native_name: "English (United States)",
            enabled: true,
        },
        LocaleConfig {
            locale: LocaleId::UK,
            name: "English (United Kingdom)",
            native_name: "English (United Kingdom)",
            enabled: false,
        },
        LocaleConfig {
            locale: LocaleId::FRANCE,
            name: "French (France)",
            native_name: "Français (France)",
            enabled: false,
        },
        LocaleConfig {
            locale: LocaleId::ITALY,
            name: "Italian (Italy)",
            native_name: "Italiano (Italia)",
            enabled: false,
        },
        LocaleConfig {
            locale: LocaleId::SPAIN,
            name: "Spanish (Spain)",
            native_name: "Español (España)",
            enabled: false,
        },
    ]
}
