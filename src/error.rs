use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by resource bundles, containers and factories.
#[derive(Error, Debug)]
pub enum ResourcesError {
    /// A bundle or container could not be set up: bad configuration,
    /// unreachable database, missing resource file.
    #[error("resources initialization failed: {0}")]
    Initialization(String),

    /// A key resolved to an empty value while the container disallows nulls.
    #[error("found no value for requested resource {key}")]
    KeyNotFound { key: String },

    /// An operation was invoked on a bundle in the wrong lifecycle state.
    #[error("cannot {operation} a bundle that is {state}")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An insert reported more than one affected row.
    #[error("insert of resource {key} affected {rows} rows")]
    DuplicateInsert { key: String, rows: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed properties file {}:{line}: {message}", path.display())]
    Properties {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("invalid locale: {0}")]
    InvalidLocale(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("import failed: {0}")]
    Import(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A cache mutex was poisoned by a panicking holder.
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

impl ResourcesError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is the expected-miss outcome of a strict lookup.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

pub type Result<T, E = ResourcesError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_not_found_names_the_key() {
        let err = ResourcesError::KeyNotFound {
            key: "test.key".to_string(),
        };
        assert!(err.is_key_not_found());
        assert_eq!(err.to_string(), "found no value for requested resource test.key");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = ResourcesError::InvalidState {
            state: "destroyed",
            operation: "find",
        };
        assert!(!err.is_key_not_found());
        assert_eq!(err.to_string(), "cannot find a bundle that is destroyed");
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = ResourcesError::io(
            "/tmp/missing.properties",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("/tmp/missing.properties"));
    }
}
