mod common;

use dossier_pdf::package::{CONFIDENTIALITY_LEGEND, PACKAGE_TITLE, suggested_file_name};
use dossier_pdf::{
    Error, FontSet, LayoutConfig, PackageAssembler, SelectionSet, TemplateRegistry, TocNumbering,
};

#[test]
fn empty_selection_fails_fast() {
    let result = common::assemble("acme.json", &[]);
    assert!(matches!(result, Err(Error::EmptySelection)));
    let msg = Error::EmptySelection.to_string();
    assert!(msg.contains("choose at least one"));
}

#[test]
fn acme_two_report_package() {
    let package = common::assemble("acme.json", &["distress-summary", "covenant-analysis"])
        .expect("assemble");
    let doc = &package.document;
    assert!(doc.page_count() >= 3, "got {} pages", doc.page_count());

    let titles: Vec<&str> = package.toc.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, ["Distressed Credit Summary", "Covenant Tracking Report"]);
    let pages: Vec<usize> = package.toc.iter().map(|e| e.page).collect();
    assert_eq!(pages, [2, 3]);

    assert_eq!(package.reports.len(), 2);
    assert_eq!(package.reports[0].template_id, "distress-summary");
    assert!(package.reports[0].body_text.contains("Acme Corp"));
    assert!(package.skipped.is_empty());

    // Cover, then contents, then reports in selection order.
    assert!(doc.pages[0].contains_text(PACKAGE_TITLE));
    assert!(doc.pages[0].contains_text("Acme Corp"));
    assert!(doc.pages[0].contains_text("Generated on 2024-03-15"));
    assert!(doc.pages[1].contains_text("Table of Contents"));
    assert!(doc.pages[1].contains_text("Distressed Credit Summary"));
    let starts = &package.report_start_pages;
    assert_eq!(starts[0], 3);
    assert!(starts[1] > starts[0]);
    assert!(doc.pages[starts[0] - 1].contains_text("Distressed Credit Summary"));
    assert!(doc.pages[starts[1] - 1].contains_text("Covenant Tracking Report"));
    assert_eq!(package.file_name, "Acme_Corp_Credit_Package_2024-03-15.pdf");
}

#[test]
fn metrics_block_follows_templates_that_include_it() {
    let package = common::assemble("acme.json", &["distress-summary"]).unwrap();
    let text = package.document.text();
    assert!(text.contains("Key Financial Metrics"));
    assert!(text.contains("Revenue:"));
    assert!(text.contains("$70.2M"));
    assert!(text.contains("[Cash Data Unavailable]"));
    assert!(!text.contains("N/A"));

    let package = common::assemble("acme.json", &["maturity-analysis"]).unwrap();
    assert!(!package.document.text().contains("Revenue:"));
}

#[test]
fn only_unknown_ids_yield_cover_and_contents() {
    let package = common::assemble("acme.json", &["nonexistent-id"]).expect("not an error");
    assert_eq!(package.document.page_count(), 2);
    assert!(package.reports.is_empty());
    assert!(package.toc.is_empty());
    assert_eq!(package.skipped, ["nonexistent-id"]);
    assert!(package.document.pages[1].contains_text("Not included"));
    assert!(package.document.pages[1].contains_text("nonexistent-id"));
}

#[test]
fn unknown_ids_are_skipped_without_aborting() {
    let ids = [
        "distress-summary",
        "bogus-one",
        "liquidity-forecast",
        "bogus-two",
        "maturity-analysis",
    ];
    let package = common::assemble("nested_private.json", &ids).unwrap();
    assert_eq!(package.reports.len(), 3);
    assert_eq!(package.skipped, ["bogus-one", "bogus-two"]);

    // Provisional slots follow selection positions, so the gaps stay visible.
    let pages: Vec<usize> = package.toc.iter().map(|e| e.page).collect();
    assert_eq!(pages, [2, 4, 6]);

    let body_titles = ["Distressed Credit Summary", "13-Week Liquidity Forecast", "Debt Maturity Analysis"];
    for title in body_titles {
        // Contents page plus the report's own first page.
        assert_eq!(common::pages_containing(&package.document, title), 2, "{title}");
    }
}

#[test]
fn duplicate_ids_collapse_to_first_occurrence() {
    let selection = SelectionSet::new(["covenant-analysis", "distress-summary", "covenant-analysis"]);
    assert_eq!(selection.ids(), ["covenant-analysis", "distress-summary"]);
    let package = common::assemble(
        "acme.json",
        &["covenant-analysis", "distress-summary", "covenant-analysis"],
    )
    .unwrap();
    assert_eq!(package.reports.len(), 2);
}

#[test]
fn footers_are_consistent_after_finalize() {
    let registry = TemplateRegistry::builtin();
    let all: Vec<&str> = registry.ids().collect();
    let package = common::assemble("all_unavailable.json", &all).unwrap();
    let total = package.document.page_count();
    assert!(total >= 8);
    for (i, page) in package.document.pages.iter().enumerate() {
        let footer = page.footer.as_ref().expect("every page has a footer");
        assert_eq!(footer.page_label.text, format!("Page {} of {}", i + 1, total));
        assert_eq!(footer.legend.text, CONFIDENTIALITY_LEGEND);
    }
}

#[test]
fn exact_numbering_matches_real_start_pages() {
    let registry = TemplateRegistry::builtin();
    let config = LayoutConfig {
        body_size: 14.0,
        ..LayoutConfig::default()
    };
    let fonts = FontSet::helvetica();
    let content = common::content("nested_private.json");
    let selection = SelectionSet::all(&registry);

    let exact = PackageAssembler::new(&registry, &config, &fonts)
        .with_toc_numbering(TocNumbering::Exact)
        .assemble(&selection, &content, common::date())
        .unwrap();
    let pages: Vec<usize> = exact.toc.iter().map(|e| e.page).collect();
    assert_eq!(pages, exact.report_start_pages);
    for entry in &exact.toc {
        let page = &exact.document.pages[entry.page - 1];
        assert!(page.contains_text(&entry.title), "{} not on page {}", entry.title, entry.page);
    }

    let provisional = PackageAssembler::new(&registry, &config, &fonts)
        .assemble(&selection, &content, common::date())
        .unwrap();
    let slots: Vec<usize> = provisional.toc.iter().map(|e| e.page).collect();
    assert_eq!(slots, (2..8).collect::<Vec<_>>());
}

#[test]
fn invalid_layout_is_reported_before_layout_starts() {
    let registry = TemplateRegistry::builtin();
    let config = LayoutConfig {
        margin_left: 300.0,
        margin_right: 300.0,
        ..LayoutConfig::default()
    };
    let fonts = FontSet::helvetica();
    let result = PackageAssembler::new(&registry, &config, &fonts).assemble(
        &common::selection(&["distress-summary"]),
        &common::content("acme.json"),
        common::date(),
    );
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn file_name_is_sanitized() {
    let date = common::date();
    assert_eq!(
        suggested_file_name("Acme Corp", date),
        "Acme_Corp_Credit_Package_2024-03-15.pdf"
    );
    assert_eq!(
        suggested_file_name("  O'Neil & Sons / Holdings  ", date),
        "ONeil__Sons__Holdings_Credit_Package_2024-03-15.pdf"
    );
    assert_eq!(
        suggested_file_name("***", date),
        "Company_Credit_Package_2024-03-15.pdf"
    );
}

#[test]
fn cover_stays_one_page_for_very_long_names() {
    let registry = TemplateRegistry::builtin();
    let config = LayoutConfig::default();
    let fonts = FontSet::helvetica();
    let long_name = "Consolidated Amalgamated Holdings ".repeat(60);
    let unbroken = "X".repeat(400);

    for name in [long_name.trim(), unbroken.as_str()] {
        let data = dossier_pdf::RawAnalysisData::from_json(
            &serde_json::json!({
                "company": { "name": name, "ticker": "CAH", "industry": name },
                "financials": { "revenue": "$5M" }
            })
            .to_string(),
        )
        .unwrap();
        let content = dossier_pdf::synthesize(&data);
        let package = PackageAssembler::new(&registry, &config, &fonts)
            .assemble(&common::selection(&["distress-summary"]), &content, common::date())
            .unwrap();
        let pages = &package.document.pages;
        assert!(pages[0].contains_text(PACKAGE_TITLE));
        assert!(pages[0].contains_text("\u{2026}"), "long cover text is not shortened");
        assert!(pages[0].contains_text("1 report included"));
        assert!(pages[1].contains_text("Table of Contents"));
        assert_eq!(package.report_start_pages, [3]);
    }
}
