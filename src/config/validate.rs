// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ForgeError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ForgeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.pipeline, raw.registry, raw.gate))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_pipeline(cfg)?;
    validate_registry(cfg)?;
    validate_gates(cfg)?;
    Ok(())
}

fn validate_pipeline(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.default_timeout_secs == 0 {
        return Err(ForgeError::ConfigError(
            "[pipeline].default_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.pipeline.early_exit {
        let distinct: HashSet<&str> = cfg.pipeline.core_gates.iter().map(|s| s.as_str()).collect();
        if cfg.pipeline.core_gates.len() != 3 || distinct.len() != 3 {
            return Err(ForgeError::ConfigError(format!(
                "[pipeline].core_gates must name exactly three distinct gates when early_exit is on (got {:?})",
                cfg.pipeline.core_gates
            )));
        }
        if !cfg.gate.is_empty() {
            for core in &cfg.pipeline.core_gates {
                if !cfg.gate.contains_key(core) {
                    return Err(ForgeError::ConfigError(format!(
                        "[pipeline].core_gates names unknown gate '{core}'"
                    )));
                }
            }
        }
    }

    for name in &cfg.pipeline.order {
        if !cfg.gate.contains_key(name) {
            return Err(ForgeError::ConfigError(format!(
                "[pipeline].order names unknown gate '{name}'"
            )));
        }
    }

    Ok(())
}

fn validate_registry(cfg: &RawConfigFile) -> Result<()> {
    if cfg.registry.lock_retries == 0 {
        return Err(ForgeError::ConfigError(
            "[registry].lock_retries must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_gates(cfg: &RawConfigFile) -> Result<()> {
    for (name, gate) in &cfg.gate {
        if gate.cmd.trim().is_empty() {
            return Err(ForgeError::ConfigError(format!(
                "gate '{name}' has an empty `cmd`"
            )));
        }
        if gate.timeout_secs == Some(0) {
            return Err(ForgeError::ConfigError(format!(
                "gate '{name}' has timeout_secs = 0; use >= 1"
            )));
        }
    }
    Ok(())
}
