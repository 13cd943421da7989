//! Localized string resources with pluggable backing stores.
//!
//! A [`ResourcesFactory`] hands out one shared [`Resources`] container per
//! logical name. The container loads one [`bundle::ResourceBundle`] per
//! locale on first use, from property files or from a SQLite table.

pub mod bundle;
pub mod config;
pub mod error;
pub mod factory;
pub mod i18n;
pub mod properties;
pub mod resources;
pub mod transfer;

pub use error::{ResourcesError, Result};
pub use factory::{DbResourcesFactory, PropertyResourcesFactory, ResourcesFactory};
pub use i18n::LocaleId;
pub use resources::Resources;
