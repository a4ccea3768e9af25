// --- File: crates/bookdesk_config/src/lib.rs ---
use config::{Config, Environment, File};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub mod models;
pub use models::*;

/// Marker value in config files that is replaced by an environment variable.
pub const SECRET_MARKER: &str = "secret_from_env";

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "BOOKDESK";

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
    #[error("failed to apply secrets: {0}")]
    Secrets(#[from] serde_json::Error),
}

/// Loads `AppConfig` from `CONFIG_DIR` (default `config`), `RUN_ENV` and the
/// `BOOKDESK__*` environment, then resolves `secret_from_env` markers.
pub fn load_config() -> Result<AppConfig, ConfigLoadError> {
    ensure_dotenv_loaded();
    let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());
    load_config_from(Path::new(&config_dir), &run_env)
}

/// Same as [`load_config`] with an explicit directory and environment name.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, ConfigLoadError> {
    let default_path: PathBuf = config_dir.join("default");
    let env_path: PathBuf = config_dir.join(run_env);
    debug!(
        "Loading configuration from {} and {}",
        default_path.display(),
        env_path.display()
    );

    let raw_config: AppConfig = Config::builder()
        .add_source(File::from(default_path).required(false))
        .add_source(File::from(env_path).required(false))
        .add_source(Environment::with_prefix(DEFAULT_PREFIX).separator("__"))
        .build()?
        .try_deserialize()?;

    apply_env_overrides_from_marker(raw_config)
}

/// Recursively replaces all "secret_from_env" string values with environment
/// variable values. The variable name is the dotted path joined by `_` and
/// uppercased, e.g. `stripe.secret_key` -> `STRIPE_SECRET_KEY`. Unset
/// variables become `null`.
fn inject_env_secrets(value: &mut Value) {
    fn walk(path: &mut Vec<String>, obj: &mut Value) {
        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    path.push(k.clone());
                    walk(path, v);
                    path.pop();
                }
            }
            Value::String(s) if s == SECRET_MARKER => {
                let env_key = path.join("_").to_uppercase();
                match env::var(&env_key) {
                    Ok(env_val) if !env_val.is_empty() => *obj = Value::String(env_val),
                    _ => {
                        warn!("env var {} not set for secret_from_env", env_key);
                        *obj = Value::Null;
                    }
                }
            }
            _ => {}
        }
    }

    walk(&mut Vec::new(), value);
}

/// Applies environment overrides based on "secret_from_env" markers in serialized config.
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigLoadError> {
    let mut json = serde_json::to_value(&config)?;
    inject_env_secrets(&mut json);
    Ok(serde_json::from_value(json)?)
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads `.env` (or the file named by `DOTENV_OVERRIDE`) once per process.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}
