//! The `[pipeline]` table and its environment overrides.
//!
//! Values are kept raw (signed integers, free-text policy) so that the library
//! consuming them can reject negative or unknown values with its own error type.

use serde::Deserialize;

use crate::{xdg_toml, LoadError};

/// Pipeline settings as written in `config.toml` or the environment.
///
/// ```toml
/// [pipeline]
/// num_subtasks = 3
/// max_retries = 2
/// tool_timeout_secs = 30
/// concurrency = 4
/// on_exhausted = "fail"   # or "accept"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    pub num_subtasks: Option<i64>,
    pub max_retries: Option<i64>,
    pub tool_timeout_secs: Option<i64>,
    pub concurrency: Option<i64>,
    pub on_exhausted: Option<String>,
}

impl PipelineSection {
    /// Values set in `other` replace ours.
    pub fn overlay(self, other: PipelineSection) -> PipelineSection {
        PipelineSection {
            num_subtasks: other.num_subtasks.or(self.num_subtasks),
            max_retries: other.max_retries.or(self.max_retries),
            tool_timeout_secs: other.tool_timeout_secs.or(self.tool_timeout_secs),
            concurrency: other.concurrency.or(self.concurrency),
            on_exhausted: other.on_exhausted.or(self.on_exhausted),
        }
    }

    /// Reads `<PREFIX>_NUM_SUBTASKS`, `<PREFIX>_MAX_RETRIES`,
    /// `<PREFIX>_TOOL_TIMEOUT_SECS`, `<PREFIX>_CONCURRENCY` and
    /// `<PREFIX>_ON_EXHAUSTED`. Unset or empty variables stay `None`.
    pub fn from_env(prefix: &str) -> Result<PipelineSection, LoadError> {
        let int = |name: &str| -> Result<Option<i64>, LoadError> {
            let key = format!("{}_{}", prefix, name);
            match std::env::var(&key) {
                Ok(v) if !v.trim().is_empty() => v
                    .trim()
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| LoadError::InvalidEnv { key, value: v }),
                _ => Ok(None),
            }
        };
        Ok(PipelineSection {
            num_subtasks: int("NUM_SUBTASKS")?,
            max_retries: int("MAX_RETRIES")?,
            tool_timeout_secs: int("TOOL_TIMEOUT_SECS")?,
            concurrency: int("CONCURRENCY")?,
            on_exhausted: std::env::var(format!("{}_ON_EXHAUSTED", prefix))
                .ok()
                .filter(|v| !v.trim().is_empty()),
        })
    }
}

/// Environment prefix for an app name: `"deepflow"` → `"DEEPFLOW"`.
pub fn env_prefix(app_name: &str) -> String {
    app_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// XDG `[pipeline]` table with environment overrides applied on top.
///
/// Call after [`load_and_apply`](crate::load_and_apply) so `.env` values are visible.
pub fn load_pipeline_section(app_name: &str) -> Result<PipelineSection, LoadError> {
    let file = xdg_toml::load_file(app_name)?.pipeline;
    Ok(file.overlay(PipelineSection::from_env(&env_prefix(app_name))?))
}
