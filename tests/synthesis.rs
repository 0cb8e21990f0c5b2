mod common;

use dossier_pdf::model::{Metric, MetricValue, RawAnalysisData};
use dossier_pdf::synth::{DEFAULT_COMPANY_NAME, INDUSTRY_PENDING, generate_report, narrative_for};
use dossier_pdf::{TemplateRegistry, synthesize};
use proptest::prelude::*;
use serde_json::json;

#[test]
fn explicit_profile_and_reported_revenue() {
    let c = common::content("acme.json");
    assert_eq!(c.profile.name, "Acme Corp");
    assert_eq!(c.profile.ticker.as_deref(), Some("ACME"));
    assert_eq!(c.profile.industry, "Manufacturing");
    assert!(!c.profile.is_private);
    assert!(c.executive_summary.contains("Acme Corp (ACME)"));
    assert!(c.executive_summary.contains("$70.2M"));
    assert!(c.executive_summary.contains("operating in Manufacturing"));
    assert!(c.opportunity_description.contains("real-time market data"));
}

#[test]
fn blank_name_falls_back_to_nested_analysis_company() {
    let c = common::content("nested_private.json");
    assert_eq!(c.profile.name, "Harbor Freight Holdings");
    assert_eq!(c.profile.industry, "Logistics");
    assert!(c.profile.is_private);
    assert!(c.opportunity_description.contains("document-based analysis"));
}

#[test]
fn empty_input_uses_placeholders() {
    let c = common::content("empty.json");
    assert_eq!(c.profile.name, DEFAULT_COMPANY_NAME);
    assert_eq!(c.profile.industry, INDUSTRY_PENDING);
    assert_eq!(c.profile.ticker, None);
    assert_eq!(c.financials.missing(), Metric::ALL.to_vec());
    assert!(c.executive_summary.contains(DEFAULT_COMPANY_NAME));
}

#[test]
fn sentinel_is_replaced_not_echoed() {
    let c = common::content("nested_private.json");
    assert_eq!(c.financials.revenue, MetricValue::Unavailable);
    assert_eq!(c.financials.gross_margin, MetricValue::Unavailable);
    assert_eq!(c.financials.total_debt.reported(), Some("$410M"));
    assert_eq!(c.financials.cash.reported(), Some("12.5"));
    assert!(!c.executive_summary.contains("N/A"));
    assert!(c.executive_summary.contains("$410M"));
    assert!(c.executive_summary.contains("12.5"));

    let rows = c.financials.rows();
    assert_eq!(rows[0], ("Revenue".to_string(), "[Revenue Data Unavailable]".to_string()));
    assert_eq!(rows[2], ("Total Debt".to_string(), "$410M".to_string()));
}

#[test]
fn incomplete_notice_lists_missing_metrics() {
    let acme = common::content("acme.json");
    let notice = acme.incomplete().expect("three metrics missing");
    assert_eq!(
        notice.missing,
        vec![Metric::GrossMargin, Metric::TotalDebt, Metric::Cash]
    );
    assert!(notice.to_string().contains("Gross Margin"));

    let full = synthesize(
        &RawAnalysisData::from_json(
            r#"{"financials":{"revenue":"$1B","grossMargin":"31%","totalDebt":"$2B","cash":"$90M"}}"#,
        )
        .unwrap(),
    );
    assert!(full.incomplete().is_none());
}

#[test]
fn synthesis_is_deterministic() {
    let data = common::load_fixture("nested_private.json");
    assert_eq!(synthesize(&data), synthesize(&data));
}

#[test]
fn every_builtin_template_has_a_narrative() {
    let registry = TemplateRegistry::builtin();
    for id in registry.ids() {
        assert!(narrative_for(id).is_some(), "no narrative for {id}");
    }
    assert!(narrative_for("lender-update").is_none());
}

#[test]
fn narratives_mention_company_and_substitute_placeholders() {
    let registry = TemplateRegistry::builtin();
    let c = common::content("acme.json");
    for t in registry.list() {
        let report = generate_report(t, &c);
        assert!(report.body_text.contains("Acme Corp"), "{} lacks company name", t.id);
        assert!(!report.body_text.contains("N/A"), "{} echoes sentinel", t.id);
    }
    let covenant = generate_report(registry.get("covenant-analysis").unwrap(), &c);
    assert!(covenant.body_text.contains("[Total Debt Data Unavailable]"));
    assert!(!covenant.with_metrics);

    let summary = generate_report(registry.get("distress-summary").unwrap(), &c);
    assert!(summary.with_metrics);
    assert_eq!(summary.title, "Distressed Credit Summary");
}

#[test]
fn unknown_template_gets_generic_narrative() {
    let registry = TemplateRegistry::from_path(&common::fixture_path("catalog.json")).unwrap();
    let c = common::content("acme.json");
    let report = generate_report(registry.get("lender-update").unwrap(), &c);
    assert!(report.body_text.starts_with("Status note circulated to the lender group."));
    assert!(report.body_text.contains("Acme Corp"));
}

fn metric_value() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        Just(json!("N/A")),
        Just(json!("n/a")),
        Just(json!("")),
        Just(json!("   ")),
    ]
}

fn real_value() -> impl Strategy<Value = String> {
    "\\$[1-9][0-9]{0,3}\\.[0-9][MB]"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// With every metric unavailable the summary states nothing numeric.
    #[test]
    fn summary_without_metrics_has_no_digits_or_sentinel(
        name in "[A-Z][a-z]{2,12}( [A-Z][a-z]{2,10})?",
        revenue in metric_value(),
        margin in metric_value(),
        debt in metric_value(),
        cash in metric_value(),
    ) {
        let data = RawAnalysisData::from_json(&json!({
            "company": { "name": name, "industry": "Energy" },
            "financials": {
                "revenue": revenue, "grossMargin": margin,
                "totalDebt": debt, "cash": cash,
            }
        }).to_string()).unwrap();
        let c = synthesize(&data);
        prop_assert!(!c.executive_summary.contains("N/A"));
        prop_assert!(!c.executive_summary.to_lowercase().contains("n/a"));
        prop_assert!(!c.executive_summary.chars().any(|ch| ch.is_ascii_digit()));
        prop_assert!(c.executive_summary.contains(&name));
    }

    /// Any reported metric appears verbatim in the summary.
    #[test]
    fn summary_includes_reported_values(
        revenue in proptest::option::of(real_value()),
        debt in proptest::option::of(real_value()),
        cash in real_value(),
    ) {
        let data = RawAnalysisData::from_json(&json!({
            "financials": { "revenue": revenue, "totalDebt": debt, "cash": cash }
        }).to_string()).unwrap();
        let c = synthesize(&data);
        for value in [revenue.as_ref(), debt.as_ref(), Some(&cash)].into_iter().flatten() {
            prop_assert!(c.executive_summary.contains(value.as_str()));
        }
    }
}
