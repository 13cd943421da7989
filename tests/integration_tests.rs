//! Integration tests for resource bundles
//!
//! These tests drive the public API end to end: factory, container and
//! bundles over property files and over a SQLite table.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use tempfile::TempDir;

use resource_bundles::bundle::{bundle_path, PropertyResourceBundle, ResourceBundle};
use resource_bundles::{
    transfer, DbResourcesFactory, LocaleId, PropertyResourcesFactory, ResourcesError,
    ResourcesFactory,
};

// ==================== Test Helpers ====================

/// Write the TestResources property files for de_DE and en_US
fn create_property_files(temp_dir: &TempDir) -> PathBuf {
    let base = temp_dir.path().join("TestResources");
    fs::write(
        bundle_path(&base, &LocaleId::GERMANY),
        "# German\ntest.key=Testwert\ngreeting=Hallo {0}\n",
    )
    .expect("Failed to write de_DE bundle");
    fs::write(
        bundle_path(&base, &LocaleId::US),
        "# English\ntest.key=Testvalue\ngreeting=Hello {0}\n",
    )
    .expect("Failed to write en_US bundle");
    base
}

/// Create a SQLite resources table plus its configuration file
fn create_database(temp_dir: &TempDir) -> PathBuf {
    let db_path = temp_dir.path().join("resources.db");
    let conn = Connection::open(&db_path).expect("Failed to create database");
    conn.execute_batch(
        "CREATE TABLE translations (
            lang TEXT NOT NULL,
            name TEXT NOT NULL,
            text TEXT,
            UNIQUE(name, lang)
        );
        INSERT INTO translations VALUES ('de_DE', 'test.key', 'Testwert');
        INSERT INTO translations VALUES ('en_US', 'test.key', 'Testvalue');
        INSERT INTO translations VALUES ('de_DE', 'greeting', 'Hallo {0}');",
    )
    .expect("Failed to fill database");

    let config = temp_dir.path().join("dbresources");
    fs::write(
        config.with_extension("properties"),
        format!(
            "db.connect.driver=sqlite\n\
             db.connect.database={}\n\
             db.connect.user=\n\
             db.connect.password=\n\
             db.connect.host=\n\
             db.connect.options=\n\
             db.charset=UTF-8\n\
             db.sql.table=translations\n\
             db.sql.locale.column=lang\n\
             db.sql.key.column=name\n\
             db.sql.val.column=text\n\
             resource.cache=true\n",
            db_path.display()
        ),
    )
    .expect("Failed to write database config");
    config
}

fn read_bundle(base: &Path, locale: &LocaleId) -> String {
    fs::read_to_string(bundle_path(base, locale)).expect("Failed to read bundle")
}

// ==================== Property Backend Tests ====================

#[test]
fn test_property_resources_per_locale() {
    let temp_dir = TempDir::new().unwrap();
    let base = create_property_files(&temp_dir);
    let factory = PropertyResourcesFactory::with_default_locale(LocaleId::US);

    let resources = factory.get_resources("TestResources", &base).unwrap();

    assert_eq!(
        resources
            .find("test.key", Some(&LocaleId::GERMANY), None)
            .unwrap()
            .as_deref(),
        Some("Testwert")
    );
    assert_eq!(
        resources.find("test.key", None, None).unwrap().as_deref(),
        Some("Testvalue")
    );
    assert_eq!(
        resources
            .find("greeting", None, Some(&[("0", "World")]))
            .unwrap()
            .as_deref(),
        Some("Hello World")
    );
}

#[test]
fn test_missing_key_behaviour_follows_return_null() {
    let temp_dir = TempDir::new().unwrap();
    let base = create_property_files(&temp_dir);
    let factory = PropertyResourcesFactory::with_default_locale(LocaleId::US);

    let lenient = factory.get_resources("Lenient", &base).unwrap();
    assert_eq!(lenient.find("no.such.key", None, None).unwrap(), None);

    factory.set_return_null(false);
    let strict = factory.get_resources("Strict", &base).unwrap();
    let err = strict.find("no.such.key", None, None).unwrap_err();
    assert!(err.is_key_not_found());
    assert_eq!(err.to_string(), "found no value for requested resource no.such.key");
}

#[test]
fn test_factory_returns_shared_instance() {
    let temp_dir = TempDir::new().unwrap();
    let base = create_property_files(&temp_dir);
    let factory = PropertyResourcesFactory::with_default_locale(LocaleId::US);

    let first = factory.get_resources("TestResources", &base).unwrap();
    let second = factory.get_resources("TestResources", &base).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // A change through one handle is visible through the other.
    first
        .with_bundle(&LocaleId::US, |bundle| bundle.replace("test.key", "shared"))
        .unwrap();
    assert_eq!(
        second.find("test.key", None, None).unwrap().as_deref(),
        Some("shared")
    );
}

#[test]
fn test_keys_grow_as_locales_are_used() {
    let temp_dir = TempDir::new().unwrap();
    let base = create_property_files(&temp_dir);
    fs::write(
        bundle_path(&base, &LocaleId::GERMANY),
        "test.key=Testwert\ngreeting=Hallo {0}\nonly.de=Nur hier\n",
    )
    .unwrap();
    let factory = PropertyResourcesFactory::with_default_locale(LocaleId::US);
    let resources = factory.get_resources("TestResources", &base).unwrap();

    assert!(resources.keys().unwrap().is_empty());

    resources.find("test.key", None, None).unwrap();
    assert_eq!(resources.keys().unwrap(), vec!["test.key", "greeting"]);

    resources
        .find("test.key", Some(&LocaleId::GERMANY), None)
        .unwrap();
    assert_eq!(
        resources.keys().unwrap(),
        vec!["test.key", "greeting", "only.de"]
    );
}

#[test]
fn test_attach_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let base = create_property_files(&temp_dir);

    {
        let factory = PropertyResourcesFactory::with_default_locale(LocaleId::GERMANY);
        let resources = factory.get_resources("TestResources", &base).unwrap();
        let attached = resources
            .with_bundle(&LocaleId::GERMANY, |bundle| {
                bundle.attach("test.key.new", "neuer Testeintrag")
            })
            .unwrap();
        assert!(attached);
        resources.save().unwrap();
        factory.release().unwrap();
    }

    assert!(read_bundle(&base, &LocaleId::GERMANY).contains("test.key.new=neuer Testeintrag"));

    let factory = PropertyResourcesFactory::with_default_locale(LocaleId::GERMANY);
    let resources = factory.get_resources("TestResources", &base).unwrap();
    assert_eq!(
        resources.find("test.key.new", None, None).unwrap().as_deref(),
        Some("neuer Testeintrag")
    );
}

#[test]
fn test_bundle_lifecycle_misuse() {
    let temp_dir = TempDir::new().unwrap();
    let base = create_property_files(&temp_dir);

    let mut bundle = PropertyResourceBundle::new(&base, LocaleId::US);
    assert!(matches!(
        bundle.find("test.key", None),
        Err(ResourcesError::InvalidState { .. })
    ));

    bundle.initialize().unwrap();
    assert_eq!(bundle.count().unwrap(), 2);
    assert_eq!(
        bundle.find_key_by_value("Testvalue").unwrap().as_deref(),
        Some("test.key")
    );
    assert!(bundle.initialize().is_err());

    bundle.destroy().unwrap();
    assert!(bundle.keys().is_err());
    assert!(bundle.destroy().is_err());
}

// ==================== Database Backend Tests ====================

#[test]
fn test_database_resources_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_database(&temp_dir);
    let factory = DbResourcesFactory::with_default_locale(LocaleId::GERMANY);

    let resources = factory.get_resources("DBResources", &config).unwrap();
    assert_eq!(
        resources.find("test.key", None, None).unwrap().as_deref(),
        Some("Testwert")
    );
    assert_eq!(
        resources
            .find("greeting", None, Some(&[("0", "Welt")]))
            .unwrap()
            .as_deref(),
        Some("Hallo Welt")
    );
    assert_eq!(
        resources
            .find("test.key", Some(&LocaleId::US), None)
            .unwrap()
            .as_deref(),
        Some("Testvalue")
    );

    let inserted = resources
        .with_bundle(&LocaleId::US, |bundle| bundle.attach("farewell", "Goodbye"))
        .unwrap();
    assert!(inserted);
    let duplicate = resources
        .with_bundle(&LocaleId::US, |bundle| bundle.attach("farewell", "Bye"));
    assert!(duplicate.is_err());

    resources
        .with_bundle(&LocaleId::GERMANY, |bundle| {
            bundle.replace("test.key", "Neuer Testwert")
        })
        .unwrap();
    factory.release().unwrap();

    // Writes go straight to the table, so a new factory sees them.
    let factory = DbResourcesFactory::with_default_locale(LocaleId::US);
    let resources = factory.get_resources("DBResources", &config).unwrap();
    assert_eq!(
        resources.find("farewell", None, None).unwrap().as_deref(),
        Some("Goodbye")
    );
    assert_eq!(
        resources
            .find("test.key", Some(&LocaleId::GERMANY), None)
            .unwrap()
            .as_deref(),
        Some("Neuer Testwert")
    );
}

#[test]
fn test_database_missing_table_fails_on_first_use() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_database(&temp_dir);
    Connection::open(temp_dir.path().join("resources.db"))
        .unwrap()
        .execute_batch("DROP TABLE translations;")
        .unwrap();

    let factory = DbResourcesFactory::new();
    let resources = factory.get_resources("DBResources", &config).unwrap();
    let result = resources.find("test.key", Some(&LocaleId::GERMANY), None);
    assert!(matches!(result, Err(ResourcesError::Initialization(_))));
}

// ==================== Transfer Tests ====================

#[test]
fn test_csv_export_import_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let base = create_property_files(&temp_dir);
    let factory = PropertyResourcesFactory::with_default_locale(LocaleId::GERMANY);
    let resources = factory.get_resources("TestResources", &base).unwrap();
    let locales = [LocaleId::GERMANY, LocaleId::US];

    let sheet = transfer::export_to_path(&resources, &locales, temp_dir.path()).unwrap();
    let edited = fs::read_to_string(&sheet)
        .unwrap()
        .replace("Testvalue", "Edited value");
    fs::write(&sheet, edited).unwrap();

    assert_eq!(transfer::import_from_path(&resources, &sheet).unwrap(), 4);
    resources.save().unwrap();

    let content = read_bundle(&base, &LocaleId::US);
    assert!(content.contains("test.key=Edited value"));
    assert!(content.contains("greeting=Hello {0}"));
}
