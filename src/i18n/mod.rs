//! Locale handling and lookup observability.
//!
//! - `locale`: the `LocaleId` value object bundles are keyed by
//! - `registry`: the well-known locales bulk operations default to
//! - `metrics`: counters shared by a factory and its containers
//!
//! # Example
//!
//! ```rust
//! use resource_bundles::i18n::{LocaleId, LocaleRegistry};
//!
//! let german: LocaleId = "de_DE".parse().unwrap();
//! assert_eq!(german, LocaleId::GERMANY);
//! assert!(LocaleRegistry::get().is_enabled("de_DE"));
//! ```

mod locale;
mod metrics;
mod registry;

pub use locale::LocaleId;
pub use metrics::{MetricsReport, ResourceMetrics};
pub use registry::{LocaleConfig, LocaleRegistry};
