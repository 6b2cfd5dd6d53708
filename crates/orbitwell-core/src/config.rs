//! Companion configuration.
//!
//! Precedence: built-in defaults < TOML file (`ORBITWELL_CONFIG`, default `config/orbitwell`)
//! < environment (`ORBITWELL__PORT=9000`, `ORBITWELL__MAX_SESSIONS=500`, ...).
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | app_name | Orbitwell | Identity used in logs. |
//! | host / port | 0.0.0.0 / 5000 | Gateway bind address. |
//! | storage_path | ./data | Directory for the journal database. |
//! | context_window | 6 | Recent turns read per request (capped at the session bound). |
//! | closing_probability | 0.7 | Chance of appending a closing phrase. |
//! | empty_message_policy | fallback | `fallback` answers blank input from the fallback pool; `reject` returns InvalidInput. |
//! | emergency_prepass | false | Test emergency triggers before every other category. |
//! | max_sessions | unset | LRU bound on live sessions. |
//! | session_idle_secs | unset | Drop sessions idle this long. |
//! | category_table_path | unset | TOML table replacing the built-in one. |

use crate::error::CompanionResult;
use crate::session::{EvictionPolicy, LruPolicy, Unbounded, MAX_TURNS};
use crate::synthesizer::DEFAULT_CLOSING_PROBABILITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What the orchestrator does with a message that is empty after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyMessagePolicy {
    /// Classify as usual; blank text falls through to the fallback category.
    #[default]
    Fallback,
    /// Fail with `CompanionError::InvalidInput` before touching the session.
    Reject,
}

fn default_app_name() -> String {
    "Orbitwell".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_storage_path() -> String {
    "./data".to_string()
}

fn default_context_window() -> usize {
    MAX_TURNS
}

fn default_closing_probability() -> f64 {
    DEFAULT_CLOSING_PROBABILITY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_closing_probability")]
    pub closing_probability: f64,
    #[serde(default)]
    pub empty_message_policy: EmptyMessagePolicy,
    /// Off keeps the table's own order, where loneliness/sadness/stress outrank emergency.
    #[serde(default)]
    pub emergency_prepass: bool,
    #[serde(default)]
    pub max_sessions: Option<usize>,
    #[serde(default)]
    pub session_idle_secs: Option<u64>,
    #[serde(default)]
    pub category_table_path: Option<String>,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            host: default_host(),
            port: default_port(),
            storage_path: default_storage_path(),
            context_window: default_context_window(),
            closing_probability: default_closing_probability(),
            empty_message_policy: EmptyMessagePolicy::default(),
            emergency_prepass: false,
            max_sessions: None,
            session_idle_secs: None,
            category_table_path: None,
        }
    }
}

impl CompanionConfig {
    /// Load from file and environment. See the module table for keys and defaults.
    pub fn load() -> CompanionResult<Self> {
        let config_path = std::env::var("ORBITWELL_CONFIG").unwrap_or_else(|_| "config/orbitwell".to_string());
        Self::load_from(&config_path)
    }

    /// Load with an explicit file stem or path (`.toml` optional). A missing file is not an error.
    pub fn load_from(config_path: &str) -> CompanionResult<Self> {
        let builder = config::Config::builder()
            .set_default("app_name", default_app_name())?
            .set_default("host", default_host())?
            .set_default("port", i64::from(default_port()))?
            .set_default("storage_path", default_storage_path())?
            .set_default("context_window", default_context_window() as i64)?
            .set_default("closing_probability", default_closing_probability())?
            .set_default("empty_message_policy", "fallback")?
            .set_default("emergency_prepass", false)?;

        let path = Path::new(config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder.add_source(config::File::with_name(config_path).required(false))
        };

        let built = builder
            .add_source(config::Environment::with_prefix("ORBITWELL").separator("__"))
            .build()?;

        let mut cfg: CompanionConfig = built.try_deserialize()?;
        cfg.normalize();
        Ok(cfg)
    }

    fn normalize(&mut self) {
        self.context_window = self.context_window.min(MAX_TURNS);
        self.closing_probability = self.closing_probability.clamp(0.0, 1.0);
        if self.max_sessions == Some(0) {
            self.max_sessions = None;
        }
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Journal database file under `storage_path`.
    pub fn journal_db_path(&self) -> PathBuf {
        Path::new(&self.storage_path).join("orbitwell.db")
    }

    pub fn session_idle_ttl(&self) -> Option<Duration> {
        self.session_idle_secs.map(Duration::from_secs)
    }

    /// Eviction policy implied by `max_sessions` / `session_idle_secs`.
    pub fn eviction_policy(&self) -> Box<dyn EvictionPolicy> {
        if self.max_sessions.is_none() && self.session_idle_secs.is_none() {
            Box::new(Unbounded)
        } else {
            Box::new(LruPolicy {
                max_sessions: self.max_sessions,
                idle_ttl: self.session_idle_ttl(),
            })
        }
    }
}
