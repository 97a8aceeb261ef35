use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use super::checks::Violation;

/// Outcome of one (subject, check) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    /// Identifier of the estimator or loss under test
    pub subject: String,
    pub check: String,
    /// `None` when the check passed
    #[serde(serialize_with = "serialize_violation")]
    pub violation: Option<Violation>,
}

fn serialize_violation<S>(violation: &Option<Violation>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match violation {
        Some(v) => serializer.serialize_some(&v.to_string()),
        None => serializer.serialize_none(),
    }
}

impl CheckReport {
    pub fn new(subject: impl Into<String>, check: impl Into<String>, violation: Option<Violation>) -> Self {
        Self {
            subject: subject.into(),
            check: check.into(),
            violation,
        }
    }

    pub fn passed(&self) -> bool {
        self.violation.is_none()
    }
}

/// Running pass/fail counters, safe to share between workers
#[derive(Debug, Default)]
pub struct Tally {
    /// Number of pairs that passed
    pub passed: AtomicUsize,
    /// Number of pairs that reported a violation
    pub failed: AtomicUsize,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, report: &CheckReport) {
        if report.passed() {
            self.passed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total(&self) -> usize {
        self.passed.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }

    /// Get formatted counters as a string
    pub fn format_stats(&self) -> String {
        format!(
            "Checks: {} | Passed: {} | Failed: {}",
            self.total(),
            self.passed.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

/// Every report of a run, in execution order for sequential runs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub reports: Vec<CheckReport>,
}

impl Summary {
    pub fn from_reports(reports: Vec<CheckReport>) -> Self {
        let passed = reports.iter().filter(|r| r.passed()).count();
        Self {
            passed,
            failed: reports.len() - passed,
            reports,
        }
    }

    pub fn merge(&mut self, other: Summary) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.reports.extend(other.reports);
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckReport> {
        self.reports.iter().filter(|r| !r.passed())
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// One line of counts followed by one line per failure
    pub fn format_summary(&self) -> String {
        let mut out = format!(
            "{} checks | {} passed | {} failed",
            self.passed + self.failed,
            self.passed,
            self.failed
        );
        for failure in self.failures() {
            if let Some(violation) = &failure.violation {
                out.push_str(&format!("\n  {} :: {} -> {}", failure.subject, failure.check, violation));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reports() -> Vec<CheckReport> {
        vec![
            CheckReport::new("linear_model::LinearRegression", "check_identity", None),
            CheckReport::new(
                "dummy::PriorClassifier",
                "check_proba_after_learning",
                Some(Violation::Broken("probabilities sum to 0.5".to_string())),
            ),
        ]
    }

    #[test]
    fn test_summary_counts() {
        let summary = Summary::from_reports(reports());
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
        assert_eq!(summary.failures().count(), 1);
        assert!(summary.format_summary().contains("dummy::PriorClassifier :: check_proba_after_learning"));
    }

    #[test]
    fn test_summary_json() {
        let json = Summary::from_reports(reports()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["failed"], 1);
        assert_eq!(value["reports"][0]["violation"], serde_json::Value::Null);
        assert_eq!(value["reports"][1]["violation"], "probabilities sum to 0.5");
    }

    #[test]
    fn test_tally_basics() {
        let tally = Tally::new();
        for report in reports() {
            tally.record(&report);
        }
        assert_eq!(tally.total(), 2);
        assert_eq!(tally.failed.load(Ordering::Relaxed), 1);
        assert_eq!(tally.format_stats(), "Checks: 2 | Passed: 1 | Failed: 1");
    }

    #[test]
    fn test_tally_counts_every_record_across_threads() {
        let tally = Tally::new();
        let reports = reports();
        crossbeam::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|_| {
                    for _ in 0..250 {
                        for report in &reports {
                            tally.record(report);
                        }
                    }
                });
            }
        })
        .unwrap();
        assert_eq!(tally.total(), 2000);
        assert_eq!(tally.format_stats(), "Checks: 2000 | Passed: 1000 | Failed: 1000");
    }
}
