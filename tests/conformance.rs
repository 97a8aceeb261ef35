use streamlearn::harness::{
    build_all, extra_subjects, registry, run_all, run_loss_checks, run_parallel, CheckContext,
};
use streamlearn::{certify, HarnessConfig};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn every_discovered_estimator_conforms() {
    init_logging();
    let mut subjects = build_all().expect("every registered type should build");
    assert_eq!(subjects.len(), registry().len());
    subjects.extend(extra_subjects().expect("extra subjects should build"));

    let ctx = CheckContext::new(HarnessConfig::default()).expect("valid configuration");
    let summary = run_all(&subjects, &ctx);
    assert!(summary.is_success(), "{}", summary.format_summary());
    assert!(summary.passed > subjects.len() * 2);
}

#[test]
fn parallel_run_matches_sequential_run() {
    init_logging();
    let mut subjects = build_all().expect("every registered type should build");
    subjects.extend(extra_subjects().expect("extra subjects should build"));

    let ctx = CheckContext::new(HarnessConfig::quick()).expect("valid configuration");
    let sequential = run_all(&subjects, &ctx);
    let parallel = run_parallel(&subjects, &ctx, 4);
    assert!(parallel.is_success(), "{}", parallel.format_summary());
    assert_eq!(sequential, parallel);
}

#[test]
fn losses_conform() {
    init_logging();
    let summary = run_loss_checks(&CheckContext::new(HarnessConfig::default()).expect("valid configuration"));
    assert!(summary.is_success(), "{}", summary.format_summary());
}

#[test]
fn certify_from_json_config() {
    init_logging();
    let config = HarnessConfig::from_json_str(r#"{ "seed": 7, "workers": 2, "n_samples": 25 }"#)
        .expect("valid configuration");
    let summary = certify(&config).expect("no construction defect");
    assert!(summary.is_success(), "{}", summary.format_summary());
    let json = summary.to_json().expect("summary serializes");
    assert!(json.contains("\"failed\": 0"));
}
