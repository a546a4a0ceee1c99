//! Error taxonomy shared by scenario loading, planning, dispatch and reporting.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by a simulation run.
///
/// `Configuration` and `InfeasibleSchedule` are the two domain failures:
/// the first aborts the whole comparison, the second only the policy run
/// that hit it. Battery clamping is never an error; see
/// [`crate::sim::dispatch::ConstraintViolation`].
#[derive(Debug, Error)]
pub enum SimError {
    /// One or more scenario parameters are malformed.
    #[error("invalid configuration: {}", join_errors(.0))]
    Configuration(Vec<ConfigError>),

    /// A task cannot be completed inside its release/deadline window.
    #[error("infeasible schedule for task `{task_id}`: {reason}")]
    InfeasibleSchedule { task_id: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("plot rendering failed: {0}")]
    Plot(String),
}

impl From<ConfigError> for SimError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(vec![err])
    }
}

impl SimError {
    /// Builds an [`SimError::InfeasibleSchedule`] for `task_id`.
    pub fn infeasible(task_id: &str, reason: impl Into<String>) -> Self {
        Self::InfeasibleSchedule {
            task_id: task_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors that only invalidate a single policy run.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::InfeasibleSchedule { .. })
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_message_lists_every_field() {
        let err = SimError::Configuration(vec![
            ConfigError::new("simulation.dt_h", "must be > 0"),
            ConfigError::new("tasks", "at least one task is required"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("simulation.dt_h"));
        assert!(msg.contains("tasks"));
    }

    #[test]
    fn infeasible_is_flagged() {
        let err = SimError::infeasible("inspect_A", "window too short");
        assert!(err.is_infeasible());
        assert!(err.to_string().contains("inspect_A"));
        assert!(!SimError::from(ConfigError::new("x", "y")).is_infeasible());
    }
}
