use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crossbeam::channel;
use parking_lot::Mutex;

use crate::optim::losses::Loss;
use crate::traits::estimator::Estimator;

use super::checks::{checks_for, checks_for_loss, Check, CheckContext, Violation};
use super::construction::Subject;
use super::report::{CheckReport, Summary, Tally};

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Calls a check body; a panic becomes [`Violation::Panicked`].
fn guarded(body: impl FnOnce() -> Result<(), Violation>) -> Option<Violation> {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(outcome) => outcome.err(),
        Err(payload) => Some(Violation::Panicked(panic_message(payload))),
    }
}

fn report(subject_id: &str, check: &'static str, violation: Option<Violation>) -> CheckReport {
    if let Some(violation) = &violation {
        log::warn!("{} :: {} failed: {}", subject_id, check, violation);
    } else {
        log::trace!("{} :: {} passed", subject_id, check);
    }
    CheckReport::new(subject_id, check, violation)
}

/// Runs `check` on an estimator the caller hands over; it is dropped afterwards.
fn execute(check: &Check, subject_id: &str, mut estimator: Box<dyn Estimator>, ctx: &CheckContext) -> CheckReport {
    let violation = guarded(|| (check.run)(estimator.as_mut(), ctx));
    report(subject_id, check.name, violation)
}

/// Runs one check on a deep copy of the subject, leaving the subject untouched.
pub fn run(check: &Check, subject: &Subject, ctx: &CheckContext) -> CheckReport {
    execute(check, &subject.id, subject.estimator.clone(), ctx)
}

/// Every applicable check for one subject
pub fn run_subject(subject: &Subject, ctx: &CheckContext) -> Vec<CheckReport> {
    checks_for(subject.estimator.as_ref())
        .iter()
        .map(|check| run(check, subject, ctx))
        .collect()
}

/// Runs every pair on the calling thread, in subject then check order.
pub fn run_all(subjects: &[Subject], ctx: &CheckContext) -> Summary {
    let reports: Vec<CheckReport> = subjects.iter().flat_map(|subject| run_subject(subject, ctx)).collect();
    let summary = Summary::from_reports(reports);
    log::info!("Sequential run: {} passed, {} failed", summary.passed, summary.failed);
    summary
}

/// Spreads the pairs over `workers` threads.
///
/// Each pair is deep-copied before it is queued, so workers never share
/// an estimator. Reports come back in the same order as [`run_all`].
pub fn run_parallel(subjects: &[Subject], ctx: &CheckContext, workers: usize) -> Summary {
    let workers = workers.max(1);
    let (tx, rx) = channel::unbounded::<(usize, String, Box<dyn Estimator>, Check)>();

    let mut queued = 0;
    for subject in subjects {
        for check in checks_for(subject.estimator.as_ref()) {
            // the receiver lives until the end of this function
            let _ = tx.send((queued, subject.id.clone(), subject.estimator.clone(), check));
            queued += 1;
        }
    }
    drop(tx);

    let sink: Mutex<Vec<(usize, CheckReport)>> = Mutex::new(Vec::with_capacity(queued));
    let tally = Tally::new();
    let outcome = crossbeam::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let sink = &sink;
            let tally = &tally;
            scope.spawn(move |_| {
                for (index, subject_id, estimator, check) in rx.iter() {
                    let report = execute(&check, &subject_id, estimator, ctx);
                    tally.record(&report);
                    sink.lock().push((index, report));
                }
            });
        }
    });
    // check panics are caught in `execute`; anything else is a runner bug
    if let Err(payload) = outcome {
        panic::resume_unwind(payload);
    }

    let mut reports = sink.into_inner();
    reports.sort_by_key(|(index, _)| *index);
    log::info!("Parallel run over {} workers: {}", workers, tally.format_stats());
    Summary::from_reports(reports.into_iter().map(|(_, report)| report).collect())
}

/// Certifies every loss in [`Loss::ALL`].
pub fn run_loss_checks(ctx: &CheckContext) -> Summary {
    let mut reports = Vec::new();
    for loss in Loss::ALL {
        let subject = format!("Loss::{:?}", loss);
        for check in checks_for_loss(loss) {
            let violation = guarded(|| (check.run)(loss, ctx));
            reports.push(report(&subject, check.name, violation));
        }
    }
    Summary::from_reports(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::checks::Violation;
    use crate::harness::config::HarnessConfig;
    use crate::models::linear_model::{LinearRegression, LogisticRegression};
    use crate::models::preprocessing::StandardScaler;
    use crate::traits::estimator::{expose_roles, EstimatorError, Regressor};
    use crate::traits::features::FeatureVector;

    /// Reads past the end of its input when asked for a prediction
    #[derive(Debug, Clone)]
    struct OutOfBounds;

    impl Regressor for OutOfBounds {
        fn learn_one(&mut self, _: &FeatureVector, _: f64) -> Result<(), EstimatorError> {
            Ok(())
        }

        fn predict_one(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
            Ok(x.as_array()[99])
        }
    }

    impl Estimator for OutOfBounds {
        fn name(&self) -> String {
            "OutOfBounds".to_string()
        }

        fn clone_box(&self) -> Box<dyn Estimator> {
            Box::new(self.clone())
        }

        expose_roles!(Regressor);
    }

    fn subjects() -> Vec<Subject> {
        vec![
            Subject::described(Box::new(LinearRegression::default())),
            Subject::described(Box::new(LogisticRegression::default())),
            Subject::described(Box::new(StandardScaler::new())),
        ]
    }

    fn always_broken(_: &mut dyn Estimator, _: &CheckContext) -> Result<(), Violation> {
        Err(Violation::Broken("always".to_string()))
    }

    fn learn_something(estimator: &mut dyn Estimator, _: &CheckContext) -> Result<(), Violation> {
        if let Some(regressor) = estimator.as_regressor_mut() {
            regressor.learn_one(&FeatureVector::new(vec![1.0]), 100.0).ok();
        }
        Ok(())
    }

    #[test]
    fn test_run_does_not_touch_subject() {
        let ctx = CheckContext::new(HarnessConfig::quick()).unwrap();
        let subject = Subject::new("linear", Box::new(LinearRegression::default()));
        let x = FeatureVector::new(vec![1.0]);
        let report = run(&Check::new("learn_something", learn_something), &subject, &ctx);
        assert!(report.passed());
        assert_eq!(subject.estimator.as_regressor().unwrap().predict_one(&x).unwrap(), 0.0);
    }

    #[test]
    fn test_failures_are_reported_not_raised() {
        let ctx = CheckContext::new(HarnessConfig::quick()).unwrap();
        let subject = Subject::new("linear", Box::new(LinearRegression::default()));
        let report = run(&Check::new("always_broken", always_broken), &subject, &ctx);
        assert_eq!(report.subject, "linear");
        assert_eq!(report.check, "always_broken");
        assert_eq!(report.violation, Some(Violation::Broken("always".to_string())));
    }

    #[test]
    fn test_panicking_check_is_reported_and_run_continues() {
        let ctx = CheckContext::new(HarnessConfig::quick()).unwrap();
        let subjects = vec![
            Subject::new("out_of_bounds", Box::new(OutOfBounds)),
            Subject::new("linear", Box::new(LinearRegression::default())),
        ];
        let healthy_checks = checks_for(subjects[1].estimator.as_ref()).len();

        for summary in [run_all(&subjects, &ctx), run_parallel(&subjects, &ctx, 2)] {
            let panicked: Vec<&CheckReport> = summary
                .failures()
                .filter(|r| matches!(r.violation, Some(Violation::Panicked(_))))
                .collect();
            assert!(!panicked.is_empty(), "{}", summary.format_summary());
            assert!(panicked.iter().all(|r| r.subject == "out_of_bounds"));
            assert!(summary.failures().all(|r| r.subject == "out_of_bounds"));

            let healthy = summary.reports.iter().filter(|r| r.subject == "linear").count();
            assert_eq!(healthy, healthy_checks);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let ctx = CheckContext::new(HarnessConfig::quick()).unwrap();
        let subjects = subjects();
        let sequential = run_all(&subjects, &ctx);
        let parallel = run_parallel(&subjects, &ctx, 3);
        assert!(sequential.is_success(), "{}", sequential.format_summary());
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_loss_checks_pass() {
        let summary = run_loss_checks(&CheckContext::new(HarnessConfig::quick()).unwrap());
        assert!(summary.is_success(), "{}", summary.format_summary());
        assert_eq!(summary.passed, 7);
    }
}
