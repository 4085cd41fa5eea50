mod common;

use common::TestRun;
use indoc::indoc;
use pretty_assertions::assert_eq;
use riskledger::{
    analyze_run, CoverageMapper, CujConfig, EvidenceReader, Priority, RecommendationEngine,
    RiskAggregator, RiskConfig,
};
use std::fs;

const SESSION: &str = "src/auth/session.py";

#[test]
fn single_component_end_to_end() {
    let mut run = TestRun::new();
    let finding = run.finding("bandit", "high", SESSION);
    let coverage = run.coverage(SESSION, 0.3);
    let churn = run.churn(SESSION, 12);
    run.writer.write_record("quality", &finding).unwrap();
    run.writer.write_record("coverage", &coverage).unwrap();
    run.writer.write_record("churn", &churn).unwrap();

    let reader = EvidenceReader::new(&run.handle);
    let risks = RiskAggregator::default()
        .aggregate(&reader, &run.writer, &mut run.ids)
        .unwrap();

    assert_eq!(risks.len(), 1);
    let risk = &risks[0];
    assert_eq!(risk.component, SESSION);
    assert!(risk.score() > 0.0);
    assert!(["P0", "P1", "P2", "P3"].contains(&risk.band.as_str()));
    assert_eq!(risk.confidence(), 1.0);
    assert_eq!(
        risk.evidence_refs,
        vec![
            finding.evidence_id.clone(),
            coverage.coverage_id.clone(),
            churn.evidence_id.clone()
        ]
    );

    let recommendations = RecommendationEngine::default()
        .generate(&risks, &[], &run.writer, &mut run.ids)
        .unwrap();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0].component, SESSION);
    assert_eq!(recommendations[0].priority, Priority::from_score(risk.score()));

    let manifest = run.handle.read_manifest().unwrap();
    assert_eq!(manifest.count("findings"), 1);
    assert_eq!(manifest.count("coverage_components"), 1);
    assert_eq!(manifest.count("churn"), 1);
    assert_eq!(manifest.count("risks"), 1);
    assert_eq!(manifest.count("recommendations"), 1);
}

#[test]
fn high_security_outranks_low_quality() {
    let mut run = TestRun::new();
    let security = vec![
        run.finding("semgrep", "high", "src/secure.py"),
        run.finding("semgrep", "high", "src/secure.py"),
    ];
    let quality = vec![
        run.finding("pylint", "low", "src/lint.py"),
        run.finding("pylint", "low", "src/lint.py"),
    ];
    run.writer.write_records("quality", &security).unwrap();
    run.writer.write_records("quality", &quality).unwrap();

    let reader = EvidenceReader::new(&run.handle);
    let risks = RiskAggregator::default()
        .aggregate(&reader, &run.writer, &mut run.ids)
        .unwrap();
    let score = |component: &str| {
        risks
            .iter()
            .find(|r| r.component == component)
            .map(|r| r.score())
            .unwrap()
    };
    assert!(score("src/secure.py") > score("src/lint.py"));
}

#[test]
fn analyze_run_uses_config_files() {
    let mut run = TestRun::new();
    let records = vec![
        run.coverage("src/cart/add.py", 0.6),
        run.coverage("src/cart/remove.py", 0.2),
        run.coverage("src/search/query.py", 0.95),
        run.coverage("overall", 0.58),
    ];
    run.writer.write_records("coverage", &records).unwrap();

    let config_dir = run.tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let risk_path = config_dir.join("risk.toml");
    fs::write(
        &risk_path,
        indoc! {r#"
            [scoring.weights]
            coverage = 100.0

            [scoring.caps]
            max_total = 50

            [[prioritization.bands]]
            name = "urgent"
            min_score = 40

            [[prioritization.bands]]
            name = "later"
            min_score = 0
        "#},
    )
    .unwrap();
    let cuj_path = config_dir.join("cuj.yaml");
    fs::write(
        &cuj_path,
        indoc! {r#"
            product: shop
            journeys:
              - id: checkout
                name: Checkout
                components: ["src/cart/*"]
              - id: search
                components: ["src/search/*"]
            coverage_targets:
              checkout: 80
              search: 90
        "#},
    )
    .unwrap();

    let outcome = analyze_run(
        &run.manager,
        &run.handle.run_id,
        Some(&risk_path),
        Some(&cuj_path),
    )
    .unwrap();

    // Overall sentinel is not a component
    assert_eq!(outcome.risks.len(), 3);
    let remove = outcome
        .risks
        .iter()
        .find(|r| r.component == "src/cart/remove.py")
        .unwrap();
    assert_eq!(remove.score(), 50.0);
    assert_eq!(remove.band, "urgent");
    let query = outcome
        .risks
        .iter()
        .find(|r| r.component == "src/search/query.py")
        .unwrap();
    assert_eq!(query.band, "later");

    assert_eq!(outcome.journeys.len(), 2);
    assert!((outcome.journeys[0].coverage - 0.4).abs() < 1e-9);
    assert!((outcome.journeys[1].coverage - 0.95).abs() < 1e-9);

    let gaps: Vec<&str> = outcome
        .recommendations
        .iter()
        .filter(|r| r.metadata.get("kind").and_then(|k| k.as_str()) == Some("coverage_gap"))
        .map(|r| r.component.as_str())
        .collect();
    assert_eq!(gaps, vec!["checkout"]);
    assert_eq!(outcome.recommendations.len(), 4);

    let stored = EvidenceReader::new(&run.handle).read_recommendations().unwrap();
    assert_eq!(stored.len(), 4);
}

#[test]
fn broken_configs_fall_back_to_defaults() {
    let mut run = TestRun::new();
    let record = run.coverage("src/a.py", 0.5);
    run.writer.write_record("coverage", &record).unwrap();

    let risk_path = run.tmp.path().join("risk.yaml");
    fs::write(&risk_path, "scoring: [oops").unwrap();
    assert_eq!(RiskConfig::load(&risk_path), RiskConfig::default());

    let outcome = analyze_run(&run.manager, &run.handle.run_id, Some(&risk_path), None).unwrap();
    assert_eq!(outcome.risks.len(), 1);
    assert!(outcome.journeys.is_empty());
    // 1 - 0.5 coverage at the default weight of 2.0
    assert!((outcome.risks[0].score() - 1.0).abs() < 1e-9);
}

#[test]
fn unmatched_journey_reports_full_gap() {
    let config = CujConfig::parse(
        indoc! {"
            journeys:
              - id: billing
                components: ['src/billing/**']
            coverage_targets:
              billing: 75
        "},
        riskledger::config::ConfigFormat::Yaml,
    )
    .unwrap();
    let mut run = TestRun::new();
    let record = run.coverage("src/cart/add.py", 0.9);

    let mapped = CoverageMapper::new(config).map_coverage(&[record]);
    assert_eq!(mapped[0].coverage, 0.0);
    assert!((mapped[0].gap() - 0.75).abs() < 1e-9);
}
