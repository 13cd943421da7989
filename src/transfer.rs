//! CSV export and import of a resources container.
//!
//! The sheet has one header row, `keys` followed by one locale per column,
//! and one row per key:
//!
//! ```text
//! keys,de_DE,en_US
//! test.key,Testwert,Testvalue
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ResourcesError, Result};
use crate::i18n::LocaleId;
use crate::resources::Resources;

const KEYS_HEADER: &str = "keys";

/// Write every key of the default locale with its value in each of
/// `locales`. Returns the number of key rows written.
pub fn export<W: Write>(resources: &Resources, locales: &[LocaleId], writer: W) -> Result<usize> {
    let default_locale = resources.default_locale()?;
    let keys = resources.with_bundle(&default_locale, |bundle| bundle.keys())?;

    let mut csv = csv::Writer::from_writer(writer);
    let mut header = vec![KEYS_HEADER.to_string()];
    header.extend(locales.iter().map(ToString::to_string));
    csv.write_record(&header)?;

    for key in &keys {
        let mut row = Vec::with_capacity(locales.len() + 1);
        row.push(key.clone());
        for locale in locales {
            row.push(resources.with_bundle(locale, |bundle| bundle.find(key, None))?);
        }
        csv.write_record(&row)?;
    }

    csv.flush().map_err(csv::Error::from)?;
    info!(
        "Exported {} keys of {} in {} locales",
        keys.len(),
        resources.name(),
        locales.len()
    );
    Ok(keys.len())
}

/// Export into `<dir>/<name>.csv`, returning the written path.
pub fn export_to_path(resources: &Resources, locales: &[LocaleId], dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("{}.csv", resources.name()));
    let file = File::create(&path).map_err(|e| ResourcesError::io(&path, e))?;
    export(resources, locales, file)?;
    Ok(path)
}

/// Apply every cell of a sheet with `replace`. Returns the number of values
/// written.
///
/// Rows without a key, columns without a locale header and empty cells are
/// skipped. Nothing is saved; call `Resources::save` to persist the imported
/// values.
pub fn import<R: Read>(resources: &Resources, reader: R) -> Result<usize> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = csv.records();

    let header = match records.next() {
        Some(record) => record?,
        None => return Err(ResourcesError::Import("sheet has no header row".to_string())),
    };
    // Columns with an empty header are ignored.
    let columns = header
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, column)| !column.trim().is_empty())
        .map(|(index, column)| {
            column
                .trim()
                .parse::<LocaleId>()
                .map(|locale| (index, locale))
                .map_err(|_| ResourcesError::Import(format!("header '{}' is not a locale", column)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut written = 0;
    for record in records {
        let record = record?;
        let key = match record.get(0).map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => continue,
        };

        for (index, locale) in &columns {
            let value = match record.get(*index) {
                Some(value) if !value.is_empty() => value,
                _ => continue,
            };
            resources.with_bundle(locale, |bundle| bundle.replace(key, value))?;
            written += 1;
        }
        debug!("Imported {}", key);
    }

    info!("Imported {} values into {}", written, resources.name());
    Ok(written)
}

pub fn import_from_path(resources: &Resources, path: &Path) -> Result<usize> {
    let file = File::open(path).map_err(|e| ResourcesError::io(path, e))?;
    import(resources, file)
}
