//! Session-limit gate: evaluated before and after every section or
//! subtask. Violations are fatal to the current execution attempt.

use bvs_core::BvsConfig;

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Copy, Default)]
pub struct UsageCounters {
    pub iteration_count: u32,
    pub subtask_cost: f64,
    pub cumulative_cost: f64,
}

/// Returns the first violated limit, if any, as a typed `SessionLimitExceeded`.
pub fn check_limits(cfg: &BvsConfig, usage: &UsageCounters) -> Result<(), OrchestratorError> {
    if usage.iteration_count > cfg.max_iterations_per_subtask {
        return Err(OrchestratorError::SessionLimitExceeded {
            limit_kind: "max_iterations_per_subtask".to_string(),
            limit: cfg.max_iterations_per_subtask as f64,
            actual: usage.iteration_count as f64,
        });
    }
    if usage.subtask_cost > cfg.max_cost_per_subtask {
        return Err(OrchestratorError::SessionLimitExceeded {
            limit_kind: "max_cost_per_subtask".to_string(),
            limit: cfg.max_cost_per_subtask,
            actual: usage.subtask_cost,
        });
    }
    if usage.cumulative_cost > cfg.max_total_cost {
        return Err(OrchestratorError::SessionLimitExceeded {
            limit_kind: "max_total_cost".to_string(),
            limit: cfg.max_total_cost,
            actual: usage.cumulative_cost,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_limits_passes() {
        let cfg = BvsConfig::default();
        let usage = UsageCounters {
            iteration_count: 1,
            subtask_cost: 0.1,
            cumulative_cost: 1.0,
        };
        assert!(check_limits(&cfg, &usage).is_ok());
    }

    #[test]
    fn exceeding_cumulative_cost_is_reported_with_limit_and_actual() {
        let cfg = BvsConfig::default();
        let usage = UsageCounters {
            iteration_count: 1,
            subtask_cost: 0.1,
            cumulative_cost: cfg.max_total_cost + 1.0,
        };
        match check_limits(&cfg, &usage) {
            Err(OrchestratorError::SessionLimitExceeded { limit_kind, limit, actual }) => {
                assert_eq!(limit_kind, "max_total_cost");
                assert_eq!(limit, cfg.max_total_cost);
                assert_eq!(actual, usage.cumulative_cost);
            }
            other => panic!("expected SessionLimitExceeded, got {other:?}"),
        }
    }

    #[test]
    fn iteration_count_checked_before_cost() {
        let cfg = BvsConfig::default();
        let usage = UsageCounters {
            iteration_count: cfg.max_iterations_per_subtask + 1,
            subtask_cost: cfg.max_cost_per_subtask + 1.0,
            cumulative_cost: 0.0,
        };
        match check_limits(&cfg, &usage) {
            Err(OrchestratorError::SessionLimitExceeded { limit_kind, .. }) => {
                assert_eq!(limit_kind, "max_iterations_per_subtask");
            }
            other => panic!("expected SessionLimitExceeded, got {other:?}"),
        }
    }
}
