use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub listener: ListenerConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Deferred listeners deliver after resolution (true) or just before commit (false)
    pub post_commit: bool,
    pub log_events: bool,
    pub log_payloads: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: Option<usize>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            post_commit: true,
            log_events: false,
            log_payloads: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Optional YAML file replaces the preset, env vars still win
        let base = match env::var("LISTENER_CONFIG_FILE") {
            Ok(path) => Self::from_yaml_file(&path).unwrap_or_else(|e| {
                tracing::warn!("{}, using {:?} defaults", e, environment);
                Self::preset(environment)
            }),
            Err(_) => Self::preset(environment),
        };

        base.with_env_overrides()
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    fn with_env_overrides(mut self) -> Self {
        // Listener overrides
        if let Ok(v) = env::var("LISTENER_POST_COMMIT") {
            self.listener.post_commit = v.parse().unwrap_or(self.listener.post_commit);
        }
        if let Ok(v) = env::var("LISTENER_LOG_EVENTS") {
            self.listener.log_events = v.parse().unwrap_or(self.listener.log_events);
        }
        if let Ok(v) = env::var("LISTENER_LOG_PAYLOADS") {
            self.listener.log_payloads = v.parse().unwrap_or(self.listener.log_payloads);
        }

        // Cache overrides
        if let Ok(v) = env::var("CACHE_ENABLED") {
            self.cache.enabled = v.parse().unwrap_or(self.cache.enabled);
        }
        if let Ok(v) = env::var("CACHE_MAX_ENTRIES") {
            self.cache.max_entries = v.parse().ok();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            listener: ListenerConfig {
                post_commit: true,
                log_events: true,
                log_payloads: true,
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: None,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            listener: ListenerConfig {
                post_commit: true,
                log_events: true,
                log_payloads: false,
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: Some(50_000),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            listener: ListenerConfig {
                post_commit: true,
                log_events: false,
                log_payloads: false,
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: Some(100_000),
            },
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
