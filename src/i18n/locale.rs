//! Locale identifier: language + country value object.
//!
//! A `LocaleId` renders to a canonical string such as `de_DE`, which is used
//! both as the key of a container's bundle cache and as the suffix of
//! per-locale property file names.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{ResourcesError, Result};

/// A validated language + country identifier.
///
/// Equality and hashing follow the canonical string: the language code is
/// always lowercase, the country code always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocaleId {
    /// ISO 639-1 language code (e.g., "de", "en")
    language: Cow<'static, str>,

    /// ISO 3166-1 country code (e.g., "DE", "US"), empty if unspecified
    country: Cow<'static, str>,
}

impl LocaleId {
    /// German as spoken in Germany.
    pub const GERMANY: LocaleId = LocaleId::from_static("de", "DE");

    /// English as spoken in the United States.
    pub const US: LocaleId = LocaleId::from_static("en", "US");

    /// English as spoken in the United Kingdom.
    pub const UK: LocaleId = LocaleId::from_static("en", "GB");

    /// French as spoken in France.
    pub const FRANCE: LocaleId = LocaleId::from_static("fr", "FR");

    /// Italian as spoken in Italy.
    pub const ITALY: LocaleId = LocaleId::from_static("it", "IT");

    /// Spanish as spoken in Spain.
    pub const SPAIN: LocaleId = LocaleId::from_static("es", "ES");

    const fn from_static(language: &'static str, country: &'static str) -> Self {
        LocaleId {
            language: Cow::Borrowed(language),
            country: Cow::Borrowed(country),
        }
    }

    /// Create a locale from its language and country codes.
    ///
    /// The language is lowercased and the country uppercased. The country may
    /// be empty; the language may not. Both must be ASCII letters only.
    pub fn new(language: &str, country: &str) -> Result<Self> {
        let language = language.trim();
        let country = country.trim();

        if language.is_empty() {
            return Err(ResourcesError::InvalidLocale(
                "language code is empty".to_string(),
            ));
        }
        for part in [language, country] {
            if !part.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ResourcesError::InvalidLocale(format!(
                    "'{}' is not an alphabetic code",
                    part
                )));
            }
        }

        Ok(LocaleId {
            language: Cow::Owned(language.to_ascii_lowercase()),
            country: Cow::Owned(country.to_ascii_uppercase()),
        })
    }

    /// Detect the locale of the running process.
    ///
    /// Returns `None` if the platform reports no locale or one that does not
    /// parse (e.g. `C` or `POSIX`).
    pub fn system_default() -> Option<LocaleId> {
        sys_locale::get_locale()
            .and_then(|raw| raw.parse().ok())
            .filter(|locale: &LocaleId| locale.language() != "c" && locale.language() != "posix")
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.country.is_empty() {
            f.write_str(&self.language)
        } else {
            write!(f, "{}_{}", self.language, self.country)
        }
    }
}

impl FromStr for LocaleId {
    type Err = ResourcesError;

    /// Parse `de_DE`, `de-DE`, `de_DE.UTF-8`, `de_DE@euro` or `de`.
    fn from_str(s: &str) -> Result<Self> {
        let base = s
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim();

        let mut parts = base.splitn(2, ['_', '-']);
        let language = parts.next().unwrap_or_default();
        let country = parts.next().unwrap_or_default();

        LocaleId::new(language, country).map_err(|_| {
            ResourcesError::InvalidLocale(format!("cannot parse locale '{}'", s))
        })
    }
}
