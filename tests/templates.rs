mod common;

use dossier_pdf::{Error, TemplateRegistry};

#[test]
fn builtin_catalog_has_six_templates_in_order() {
    let registry = TemplateRegistry::builtin();
    let ids: Vec<&str> = registry.ids().collect();
    assert_eq!(
        ids,
        [
            "distress-summary",
            "covenant-analysis",
            "liquidity-forecast",
            "capital-structure",
            "investment-memo",
            "maturity-analysis",
        ]
    );
    for t in registry.list() {
        assert!(!t.title.is_empty());
        assert!(!t.description.is_empty());
        assert!(!t.estimated_duration.is_empty());
        assert!(!t.included_sections.is_empty(), "{} has no sections", t.id);
    }
}

#[test]
fn lookup_by_id() {
    let registry = TemplateRegistry::default();
    let t = registry.get("covenant-analysis").unwrap();
    assert_eq!(t.title, "Covenant Tracking Report");
    assert!(registry.contains("investment-memo"));

    match registry.get("nonexistent-id") {
        Err(Error::TemplateNotFound(id)) => assert_eq!(id, "nonexistent-id"),
        other => panic!("expected TemplateNotFound, got {other:?}"),
    }
}

#[test]
fn categories_group_in_first_appearance_order() {
    let registry = TemplateRegistry::builtin();
    let groups = registry.by_category();
    let names: Vec<&str> = groups.iter().map(|(c, _)| *c).collect();
    assert_eq!(
        names,
        ["Overview", "Compliance", "Liquidity", "Structure", "Investment"]
    );
    let structure = &groups[3].1;
    assert_eq!(structure.len(), 2);
    assert_eq!(structure[1].id, "maturity-analysis");
}

#[test]
fn custom_catalog_from_json() {
    let registry = TemplateRegistry::from_path(&common::fixture_path("catalog.json")).unwrap();
    assert_eq!(registry.len(), 2);
    let update = registry.get("lender-update").unwrap();
    assert_eq!(update.category, "Communication");
    assert_eq!(update.estimated_duration, "");
    assert!(!registry.contains("covenant-analysis"));
}

#[test]
fn catalog_rejects_duplicate_and_empty_ids() {
    let dup = r#"[
        {"id": "a", "title": "A", "description": "", "category": "X"},
        {"id": "a", "title": "B", "description": "", "category": "X"}
    ]"#;
    assert!(matches!(
        TemplateRegistry::from_json(dup),
        Err(Error::InvalidCatalog(msg)) if msg.contains("duplicate")
    ));

    let empty = r#"[{"id": " ", "title": "A", "description": "", "category": "X"}]"#;
    assert!(matches!(
        TemplateRegistry::from_json(empty),
        Err(Error::InvalidCatalog(_))
    ));

    assert!(matches!(
        TemplateRegistry::from_json("{\"id\": 1}"),
        Err(Error::Json(_))
    ));
}
