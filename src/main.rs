//! Command-line access to a resources container.
//!
//! Usage:
//!   resources find <key> [locale] [name=value ...]   # Resolve one key
//!   resources keys [locale]                          # List the keys of a locale
//!   resources export <dir> [locale ...]              # Write <dir>/<name>.csv
//!   resources import <file>                          # Apply a CSV sheet and save
//!
//! The container is selected through RESOURCES_NAME, RESOURCES_BACKEND and
//! RESOURCES_CONFIG.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use resource_bundles::config::{Backend, Config};
use resource_bundles::i18n::LocaleRegistry;
use resource_bundles::{
    transfer, DbResourcesFactory, LocaleId, PropertyResourcesFactory, Resources, ResourcesFactory,
};
use tracing::{debug, info};

fn main() -> Result<ExitCode> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("resource_bundles=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(ExitCode::SUCCESS);
    }
    let command = args[1].as_str();
    match command {
        "find" | "keys" | "export" | "import" => {}
        "--help" | "-h" | "help" => {
            print_usage();
            return Ok(ExitCode::SUCCESS);
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            return Ok(ExitCode::FAILURE);
        }
    }

    let config = Config::from_env()?;
    let factory: Box<dyn ResourcesFactory> = match config.backend {
        Backend::Property => Box::new(PropertyResourcesFactory::with_default_locale(
            config.default_locale.clone(),
        )),
        Backend::Db => Box::new(DbResourcesFactory::with_default_locale(
            config.default_locale.clone(),
        )),
    };
    factory.set_return_null(config.return_null);

    info!("Opening resources {} ({:?})", config.name, config.backend);
    let resources = factory.get_resources(&config.name, &config.config_path)?;

    let result = match command {
        "find" => find_command(&resources, &args[2..]),
        "keys" => keys_command(&resources, &args[2..]),
        "export" => export_command(&resources, &args[2..]),
        "import" => import_command(&resources, &args[2..]),
        other => Err(anyhow::anyhow!("Unknown command: {}", other)),
    };

    debug!(
        "Metrics: {}",
        serde_json::to_string(&factory.metrics().report())?
    );
    factory.release()?;
    result
}

/// Exit code 2 means the key has no value.
fn find_command(resources: &Resources, args: &[String]) -> Result<ExitCode> {
    match lookup(resources, args)? {
        Some(value) => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("No value for {}", args[0]);
            Ok(ExitCode::from(2))
        }
    }
}

/// Resolve `<key> [locale] [name=value ...]`.
fn lookup(resources: &Resources, args: &[String]) -> Result<Option<String>> {
    let Some(key) = args.first() else {
        bail!("find needs a key");
    };

    // An optional locale comes first; everything with '=' is a parameter.
    let mut locale = None;
    let mut params = Vec::new();
    for arg in &args[1..] {
        match arg.split_once('=') {
            Some((name, value)) => params.push((name, value)),
            None if locale.is_none() => locale = Some(parse_locale(arg)?),
            None => bail!("Unexpected argument: {}", arg),
        }
    }

    let params = (!params.is_empty()).then_some(params.as_slice());
    Ok(resources.find(key, locale.as_ref(), params)?)
}

fn keys_command(resources: &Resources, args: &[String]) -> Result<ExitCode> {
    let locale = match args.first() {
        Some(raw) => parse_locale(raw)?,
        None => resources.default_locale()?,
    };

    let keys = resources.with_bundle(&locale, |bundle| bundle.keys())?;
    for key in &keys {
        println!("{}", key);
    }
    info!("{} keys in {}", keys.len(), locale);
    Ok(ExitCode::SUCCESS)
}

fn export_command(resources: &Resources, args: &[String]) -> Result<ExitCode> {
    let Some(dir) = args.first() else {
        bail!("export needs a target directory");
    };

    let locales = if args.len() > 1 {
        args[1..]
            .iter()
            .map(|raw| parse_locale(raw))
            .collect::<Result<Vec<_>>>()?
    } else {
        LocaleRegistry::get().enabled_locales()
    };

    let path = transfer::export_to_path(resources, &locales, Path::new(dir))?;
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn import_command(resources: &Resources, args: &[String]) -> Result<ExitCode> {
    let Some(file) = args.first() else {
        bail!("import needs a CSV file");
    };

    let written = transfer::import_from_path(resources, Path::new(file))?;
    resources.save().context("Failed to save imported values")?;
    println!("Imported {} values", written);
    Ok(ExitCode::SUCCESS)
}

fn parse_locale(raw: &str) -> Result<LocaleId> {
    raw.parse::<LocaleId>()
        .with_context(|| format!("Invalid locale: '{}'", raw))
}

fn print_usage() {
    println!("Usage: resources <command> [args]");
    println!();
    println!("Commands:");
    println!("  find <key> [locale] [name=value ...]  Resolve one key");
    println!("  keys [locale]                         List the keys of a locale");
    println!("  export <dir> [locale ...]             Write <dir>/<name>.csv");
    println!("  import <file>                         Apply a CSV sheet and save it");
    println!("  help                                  Show this message");
    println!();
    println!("Environment:");
    println!("  RESOURCES_CONFIG          Property file base or database config (required)");
    println!("  RESOURCES_NAME            Resource name (default: Resources)");
    println!("  RESOURCES_BACKEND         property | db (default: property)");
    println!("  RESOURCES_DEFAULT_LOCALE  Default locale (default: system locale)");
    println!("  RESOURCES_RETURN_NULL     Missing keys print nothing instead of failing");
    println!();
    println!("Known locales (* exported by default):");
    for config in LocaleRegistry::get().list_all() {
        let marker = if config.enabled { '*' } else { ' ' };
        println!(
            "  {} {:<6} {} / {}",
            marker,
            config.locale.to_string(),
            config.name,
            config.native_name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_bundles::bundle::bundle_path;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn open_resources(temp_dir: &TempDir) -> (PropertyResourcesFactory, std::sync::Arc<Resources>) {
        let base = temp_dir.path().join("cli");
        std::fs::write(bundle_path(&base, &LocaleId::US), "greeting=Hello {name}\n").unwrap();
        std::fs::write(bundle_path(&base, &LocaleId::GERMANY), "greeting=Hallo {name}\n").unwrap();
        let factory = PropertyResourcesFactory::with_default_locale(LocaleId::US);
        let resources = factory.get_resources("Cli", &base).unwrap();
        (factory, resources)
    }

    #[test]
    fn test_lookup_with_locale_and_params() {
        let temp_dir = TempDir::new().unwrap();
        let (_factory, resources) = open_resources(&temp_dir);

        let value = lookup(&resources, &args(&["greeting", "de_DE", "name=Welt"])).unwrap();
        assert_eq!(value.as_deref(), Some("Hallo Welt"));
    }

    #[test]
    fn test_missing_key_still_allows_release() {
        let temp_dir = TempDir::new().unwrap();
        let (factory, resources) = open_resources(&temp_dir);

        assert_eq!(lookup(&resources, &args(&["no.such.key"])).unwrap(), None);
        assert!(find_command(&resources, &args(&["no.such.key"])).is_ok());

        factory.release().expect("Should release after a miss");
        assert!(factory.is_empty());
        assert!(resources.loaded_locales().unwrap().is_empty());
    }

    #[test]
    fn test_lookup_rejects_second_locale() {
        let temp_dir = TempDir::new().unwrap();
        let (_factory, resources) = open_resources(&temp_dir);

        assert!(lookup(&resources, &args(&["greeting", "de_DE", "en_US"])).is_err());
        assert!(lookup(&resources, &args(&[])).is_err());
    }
}
