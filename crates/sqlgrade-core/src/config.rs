use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_STATEMENT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "default_version", rename = "configVersion", alias = "version")]
    pub version: u32,
    /// Upper bound for any single statement run in the sandbox.
    #[serde(default = "default_timeout_ms")]
    pub statement_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub foreign_keys: bool,
    #[serde(default)]
    pub scratch: ScratchTarget,
}

/// Where verification calls materialize their schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScratchTarget {
    /// A private in-memory database per call.
    #[default]
    Memory,
    /// A shared database file; isolation comes from the per-call transaction.
    File { path: PathBuf },
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}

fn default_timeout_ms() -> u64 {
    DEFAULT_STATEMENT_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            statement_timeout_ms: DEFAULT_STATEMENT_TIMEOUT_MS,
            foreign_keys: true,
            scratch: ScratchTarget::Memory,
        }
    }
}

impl EngineConfig {
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    /// Overrides from `SQLGRADE_TIMEOUT_MS` and `SQLGRADE_SCRATCH`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("SQLGRADE_TIMEOUT_MS") {
            self.statement_timeout_ms = v.trim().parse().map_err(|_| {
                ConfigError(format!("SQLGRADE_TIMEOUT_MS is not a number: '{}'", v))
            })?;
        }
        if let Ok(v) = std::env::var("SQLGRADE_SCRATCH") {
            self.scratch = match v.trim() {
                "" | "memory" => ScratchTarget::Memory,
                path => ScratchTarget::File {
                    path: PathBuf::from(path),
                },
            };
        }
        self.check()
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_CONFIG_VERSION {
            return Err(ConfigError(format!(
                "unsupported config version {} (supported: {})",
                self.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        if self.statement_timeout_ms == 0 {
            return Err(ConfigError(
                "statement_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path, strict: bool) -> Result<EngineConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);

    let cfg: EngineConfig = serde_ignored::deserialize(deserializer, |p| {
        ignored_keys.insert(p.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let meaningful_unknowns: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();

    if !meaningful_unknowns.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?} (file: {})",
                meaningful_unknowns,
                path.display()
            )));
        }
        tracing::warn!(
            event = "sqlgrade.config.unknown_fields",
            fields = ?meaningful_unknowns,
            file = %path.display(),
            "ignored unknown config fields"
        );
    }

    cfg.check()?;
    Ok(cfg)
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"configVersion: 1
# Upper bound for every schema script and query run in the sandbox.
statement_timeout_ms: 5000
foreign_keys: true
# memory: a private database per verification call (default)
# file:   a shared scratch file; every call rolls back its own transaction
scratch: memory
# scratch:
#   file:
#     path: .sqlgrade/scratch.db
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
