pub mod settings;

pub use settings::Config;

use crate::error::{ArbError, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

const DEFAULT_ENV_FILE: &str = ".env";

/// Loads `.env` (if present) and the environment into a validated, shared `Config`.
/// Settings are logged by the caller once the logger is up.
pub fn load_config() -> Result<Arc<Config>> {
    let config = EnvConfigSource::default().load()?;
    config.validate()?;

    Ok(Arc::new(config))
}

/// Where the detection loop reads its settings from at the start of every cycle.
/// Swapping the underlying values changes the next cycle, never the running one.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<Config>;
}

/// Re-reads an env file and the process environment on every call, so edits to the file
/// apply from the next cycle. Values in the file win over the process environment.
#[derive(Debug, Clone)]
pub struct EnvConfigSource {
    env_file: Option<PathBuf>,
}

impl Default for EnvConfigSource {
    fn default() -> Self {
        Self::with_file(DEFAULT_ENV_FILE)
    }
}

impl EnvConfigSource {
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            env_file: Some(path.into()),
        }
    }

    /// Process environment only.
    pub fn process_only() -> Self {
        Self { env_file: None }
    }

    pub fn env_file(&self) -> Option<&Path> {
        self.env_file.as_deref()
    }

    fn read_env_file(&self) -> Result<HashMap<String, String>> {
        let Some(path) = self.env_file.as_deref() else {
            return Ok(HashMap::new());
        };
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let entries = dotenv::from_path_iter(path).map_err(|e| {
            ArbError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        entries
            .map(|entry| {
                entry.map_err(|e| ArbError::ConfigError(format!("bad line in {}: {}", path.display(), e)))
            })
            .collect()
    }
}

impl ConfigSource for EnvConfigSource {
    fn load(&self) -> Result<Config> {
        let file_vars = self.read_env_file()?;
        Config::from_lookup(|key| file_vars.get(key).cloned().or_else(|| env::var(key).ok()))
    }
}

/// In-memory settings that other tasks may update between cycles.
#[derive(Debug, Clone)]
pub struct SharedConfigSource {
    inner: Arc<RwLock<Config>>,
}

impl SharedConfigSource {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Replaces the settings used from the next cycle on.
    pub fn replace(&self, config: Config) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| ArbError::ConfigError("config lock poisoned".to_string()))?;
        *guard = config;
        Ok(())
    }

    pub fn update<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| ArbError::ConfigError("config lock poisoned".to_string()))?;
        apply(&mut guard);
        Ok(())
    }
}

impl ConfigSource for SharedConfigSource {
    fn load(&self) -> Result<Config> {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| ArbError::ConfigError("config lock poisoned".to_string()))
    }
}
