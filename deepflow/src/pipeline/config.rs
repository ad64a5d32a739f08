//! Run settings for one pipeline: plan size, retry budget, tool timeout,
//! executor concurrency and the exhausted-retries policy.

use std::time::Duration;

use env_config::PipelineSection;
use serde::Serialize;

use super::error::ConfigError;
use super::feedback::ExhaustedPolicy;

/// Validated pipeline configuration.
///
/// `Default` gives 3 sub-tasks, 2 retries, a 30 s tool timeout, 4 concurrent
/// sub-tasks and `ExhaustedPolicy::Fail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    /// How many sub-tasks the planner is asked for.
    pub num_subtasks: usize,
    /// Writer revisions allowed after the first draft (0 = first rejection is terminal).
    pub max_retries: u32,
    /// Upper bound for any single tool call.
    pub tool_timeout: Duration,
    /// Sub-tasks in flight at once.
    pub concurrency_limit: usize,
    pub on_exhausted: ExhaustedPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_subtasks: 3,
            max_retries: 2,
            tool_timeout: Duration::from_secs(30),
            concurrency_limit: 4,
            on_exhausted: ExhaustedPolicy::Fail,
        }
    }
}

impl PipelineConfig {
    pub fn with_num_subtasks(mut self, n: usize) -> Self {
        self.num_subtasks = n;
        self
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_concurrency_limit(mut self, n: usize) -> Self {
        self.concurrency_limit = n;
        self
    }

    pub fn with_on_exhausted(mut self, policy: ExhaustedPolicy) -> Self {
        self.on_exhausted = policy;
        self
    }

    /// Rejects zero sub-tasks, zero concurrency and a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_subtasks == 0 {
            return Err(ConfigError::ZeroSubtasks);
        }
        if self.concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.tool_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value).map_err(|_| ConfigError::NegativeValue { field, value })
}

fn fits<T: TryFrom<u64>>(field: &'static str, value: u64) -> Result<T, ConfigError> {
    T::try_from(value).map_err(|_| ConfigError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

impl TryFrom<PipelineSection> for PipelineConfig {
    type Error = ConfigError;

    /// Starts from the defaults, applies every value present in the section and
    /// validates the result.
    fn try_from(section: PipelineSection) -> Result<Self, Self::Error> {
        let mut config = PipelineConfig::default();
        if let Some(v) = section.num_subtasks {
            config.num_subtasks = fits("num_subtasks", non_negative("num_subtasks", v)?)?;
        }
        if let Some(v) = section.max_retries {
            config.max_retries = fits("max_retries", non_negative("max_retries", v)?)?;
        }
        if let Some(v) = section.tool_timeout_secs {
            config.tool_timeout =
                Duration::from_secs(non_negative("tool_timeout_secs", v)?);
        }
        if let Some(v) = section.concurrency {
            config.concurrency_limit = fits("concurrency", non_negative("concurrency", v)?)?;
        }
        if let Some(v) = section.on_exhausted {
            config.on_exhausted = v.parse().map_err(|_| ConfigError::InvalidValue {
                field: "on_exhausted",
                value: v,
            })?;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.on_exhausted, ExhaustedPolicy::Fail);
    }

    #[test]
    fn validate_rejects_zero_values() {
        let c = PipelineConfig::default().with_num_subtasks(0);
        assert!(matches!(c.validate(), Err(ConfigError::ZeroSubtasks)));
        let c = PipelineConfig::default().with_concurrency_limit(0);
        assert!(matches!(c.validate(), Err(ConfigError::ZeroConcurrency)));
        let c = PipelineConfig::default().with_tool_timeout(Duration::ZERO);
        assert!(matches!(c.validate(), Err(ConfigError::ZeroTimeout)));
        // zero retries is a valid budget
        assert!(PipelineConfig::default().with_max_retries(0).validate().is_ok());
    }

    #[test]
    fn section_values_are_applied() {
        let config = PipelineConfig::try_from(PipelineSection {
            num_subtasks: Some(5),
            max_retries: Some(0),
            tool_timeout_secs: Some(10),
            concurrency: Some(2),
            on_exhausted: Some("accept".into()),
        })
        .unwrap();
        assert_eq!(config.num_subtasks, 5);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.tool_timeout, Duration::from_secs(10));
        assert_eq!(config.concurrency_limit, 2);
        assert_eq!(config.on_exhausted, ExhaustedPolicy::Accept);
    }

    /// **Scenario**: a negative retry budget fails fast with the field name.
    #[test]
    fn negative_retry_budget_is_rejected() {
        let err = PipelineConfig::try_from(PipelineSection {
            max_retries: Some(-1),
            ..Default::default()
        })
        .unwrap_err();
        match err {
            ConfigError::NegativeValue { field, value } => {
                assert_eq!(field, "max_retries");
                assert_eq!(value, -1);
            }
            other => panic!("expected NegativeValue, got {other:?}"),
        }
    }

    #[test]
    fn bad_policy_and_zero_timeout_are_rejected() {
        let err = PipelineConfig::try_from(PipelineSection {
            on_exhausted: Some("retry".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "on_exhausted", .. }));
        let err = PipelineConfig::try_from(PipelineSection {
            tool_timeout_secs: Some(0),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTimeout));
    }
}
