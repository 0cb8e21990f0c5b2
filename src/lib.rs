pub mod error;
pub mod fonts;
pub mod layout;
pub mod model;
pub mod package;
mod pdf;
pub mod synth;
pub mod templates;

pub use error::{Error, Result};
pub use fonts::{FontSet, TextMeasure};
pub use layout::{LayoutConfig, LayoutEngine};
pub use model::{CompanyContent, Document, EmbeddedImage, RawAnalysisData};
pub use package::{Package, PackageAssembler, SelectionSet, TocNumbering};
pub use synth::{generate_report, synthesize};
pub use templates::{ReportTemplate, TemplateRegistry};

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;

/// Serialize a laid-out document with the given fonts.
pub fn render_pdf(doc: &Document, fonts: &FontSet) -> Result<Vec<u8>> {
    pdf::render(doc, fonts)
}

/// Everything besides the analysis data and the selection that shapes a
/// package export.
#[derive(Debug)]
pub struct ExportOptions {
    pub registry: TemplateRegistry,
    pub layout: LayoutConfig,
    pub fonts: FontSet,
    pub toc_numbering: TocNumbering,
    pub logo: Option<EmbeddedImage>,
    pub generated_on: NaiveDate,
}

impl ExportOptions {
    pub fn new(generated_on: NaiveDate) -> Self {
        Self {
            registry: TemplateRegistry::builtin(),
            layout: LayoutConfig::default(),
            fonts: FontSet::helvetica(),
            toc_numbering: TocNumbering::default(),
            logo: None,
            generated_on,
        }
    }
}

/// Synthesize, assemble and render in memory.
pub fn build_package(
    data: &RawAnalysisData,
    selection: &SelectionSet,
    options: &ExportOptions,
) -> Result<(Package, Vec<u8>)> {
    let content = synthesize(data);
    let mut assembler = PackageAssembler::new(&options.registry, &options.layout, &options.fonts)
        .with_toc_numbering(options.toc_numbering);
    if let Some(logo) = &options.logo {
        assembler = assembler.with_logo(logo.clone());
    }
    let package = assembler.assemble(selection, &content, options.generated_on)?;
    let bytes = render_pdf(&package.document, &options.fonts)?;
    Ok((package, bytes))
}

/// Read analysis JSON from `input` and write the package PDF. When `output`
/// is an existing directory the suggested file name is used inside it.
/// Returns the package and the path written.
pub fn export_package(
    input: &Path,
    selection: &SelectionSet,
    options: &ExportOptions,
    output: &Path,
) -> Result<(Package, PathBuf)> {
    let t0 = Instant::now();

    let data = RawAnalysisData::from_path(input)?;
    let t_parse = t0.elapsed();

    let (package, bytes) = build_package(&data, selection, options)?;
    let t_render = t0.elapsed();

    let target = if output.is_dir() {
        output.join(&package.file_name)
    } else {
        output.to_path_buf()
    };
    std::fs::write(&target, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, build={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_render - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok((package, target))
}
