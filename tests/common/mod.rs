#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use dossier_pdf::model::Document;
use dossier_pdf::package::Package;
use dossier_pdf::{
    CompanyContent, FontSet, LayoutConfig, PackageAssembler, RawAnalysisData, SelectionSet,
    TemplateRegistry, synthesize,
};

/// Route library `log` output through env_logger so `RUST_LOG` works in tests.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// A TrueType font from a common system location, if any is installed.
pub fn system_font() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
        "/Library/Fonts/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];
    CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

pub fn fixture_path(name: &str) -> PathBuf {
    init_logging();
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn load_fixture(name: &str) -> RawAnalysisData {
    RawAnalysisData::from_path(&fixture_path(name))
        .unwrap_or_else(|e| panic!("load fixture {name}: {e}"))
}

pub fn content(name: &str) -> CompanyContent {
    synthesize(&load_fixture(name))
}

/// Output directory for generated artifacts: tests/output/<case>/
pub fn output_dir(case: &str) -> PathBuf {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/output")
        .join(case);
    std::fs::create_dir_all(&dir).expect("create output dir");
    dir
}

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
}

pub fn selection(ids: &[&str]) -> SelectionSet {
    SelectionSet::new(ids.iter().copied())
}

/// Assemble with the built-in catalog, default A4 layout and Helvetica metrics.
pub fn assemble(fixture: &str, ids: &[&str]) -> dossier_pdf::Result<Package> {
    init_logging();
    let registry = TemplateRegistry::builtin();
    let config = LayoutConfig::default();
    let fonts = FontSet::helvetica();
    PackageAssembler::new(&registry, &config, &fonts).assemble(
        &selection(ids),
        &content(fixture),
        date(),
    )
}

/// Number of pages whose body holds `needle`.
pub fn pages_containing(doc: &Document, needle: &str) -> usize {
    doc.pages.iter().filter(|p| p.contains_text(needle)).count()
}
