//! Conformance harness: discovers every registered estimator, builds a
//! working instance of each and runs the checks its capabilities call for.

pub mod checks;
pub mod config;
pub mod construction;
pub mod registry;
pub mod report;
pub mod runner;

use thiserror::Error;

pub use checks::{checks_for, checks_for_loss, Check, CheckContext, LossCheck, Violation};
pub use config::{ConfigError, HarnessConfig};
pub use construction::{build, build_all, extra_subjects, resolve, ConstructionError, Recipe, Subject};
pub use registry::{discover, registry};
pub use report::{CheckReport, Summary, Tally};
pub use runner::{run, run_all, run_loss_checks, run_parallel, run_subject};

/// Errors that stop a run before any check executes
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

/// Runs the whole battery: every discovered type, the extra subjects and
/// the loss checks.
///
/// Violations are collected in the summary; only configuration and
/// construction defects are returned as errors.
pub fn certify(config: &HarnessConfig) -> Result<Summary, HarnessError> {
    let ctx = CheckContext::new(config.clone())?;
    let mut subjects = build_all()?;
    subjects.extend(extra_subjects()?);
    log::info!("Certifying {} subjects with {} worker(s)", subjects.len(), config.workers);

    let mut summary = if config.workers > 1 {
        run_parallel(&subjects, &ctx, config.workers)
    } else {
        run_all(&subjects, &ctx)
    };
    summary.merge(run_loss_checks(&ctx));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certify_rejects_invalid_config() {
        let config = HarnessConfig { workers: 0, ..HarnessConfig::default() };
        assert!(matches!(certify(&config), Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_certify_covers_every_subject() {
        let summary = certify(&HarnessConfig::quick()).unwrap();
        for estimator_type in registry() {
            let id = estimator_type.qualified_name();
            assert!(summary.reports.iter().any(|r| r.subject == id), "{} not certified", id);
        }
        assert!(summary.reports.iter().any(|r| r.subject == "Loss::Log"));
    }
}
