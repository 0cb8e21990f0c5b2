//! Assembly of several reports into one paginated package.

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::fonts::TextMeasure;
use crate::layout::{LayoutConfig, LayoutEngine, PageCursor, TextStyle};
use crate::model::{Alignment, CompanyContent, Document, EmbeddedImage, GeneratedReport};
use crate::synth::generate_report;
use crate::templates::{ReportTemplate, TemplateRegistry};

pub const PACKAGE_TITLE: &str = "Distressed Credit Analysis Package";
pub const CONFIDENTIALITY_LEGEND: &str = "Confidential - For Internal Use Only";

/// Provisional TOC number of the first selected template. Each template is
/// assumed to start on its own page right after the contents page.
const FIRST_REPORT_SLOT: usize = 2;

const LOGO_MAX_WIDTH: f32 = 160.0;
const LOGO_MAX_HEIGHT: f32 = 80.0;

/// Wrapped-line caps for the variable cover texts.
const COVER_TITLE_LINES: usize = 2;
const COVER_NAME_LINES: usize = 2;
const COVER_SUBTITLE_LINES: usize = 2;

/// Ordered set of template ids. Duplicates collapse onto the first occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: Vec<String>,
}

impl SelectionSet {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for id in ids {
            let id = id.into();
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Self { ids: out }
    }

    /// Every template in the catalog, in catalog order.
    pub fn all(registry: &TemplateRegistry) -> Self {
        Self::new(registry.ids())
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// How TOC page numbers are computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TocNumbering {
    /// `2 + selection index`: indicative slot numbers that ignore report
    /// length.
    #[default]
    Provisional,
    /// Real start pages, learned from a dry layout pass.
    Exact,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TocEntry {
    pub template_id: String,
    pub title: String,
    pub page: usize,
}

/// A finished, footer-stamped document and what went into it.
#[derive(Clone, Debug)]
pub struct Package {
    pub document: Document,
    pub file_name: String,
    pub toc: Vec<TocEntry>,
    pub reports: Vec<GeneratedReport>,
    /// 1-based page on which each report actually starts.
    pub report_start_pages: Vec<usize>,
    /// Selected ids with no catalog entry.
    pub skipped: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    ValidateSelection,
    CoverPage,
    BuildToc,
    EmitReports,
    Finalize,
}

struct ResolvedReport<'t> {
    index: usize,
    template: &'t ReportTemplate,
    report: GeneratedReport,
}

pub struct PackageAssembler<'a> {
    registry: &'a TemplateRegistry,
    config: &'a LayoutConfig,
    measure: &'a dyn TextMeasure,
    numbering: TocNumbering,
    logo: Option<EmbeddedImage>,
}

impl<'a> PackageAssembler<'a> {
    pub fn new(
        registry: &'a TemplateRegistry,
        config: &'a LayoutConfig,
        measure: &'a dyn TextMeasure,
    ) -> Self {
        Self {
            registry,
            config,
            measure,
            numbering: TocNumbering::default(),
            logo: None,
        }
    }

    pub fn with_toc_numbering(mut self, numbering: TocNumbering) -> Self {
        self.numbering = numbering;
        self
    }

    pub fn with_logo(mut self, logo: EmbeddedImage) -> Self {
        self.logo = Some(logo);
        self
    }

    /// Build the whole package in memory. Nothing is returned unless every
    /// stage succeeds.
    pub fn assemble(
        &self,
        selection: &SelectionSet,
        content: &CompanyContent,
        generated_on: NaiveDate,
    ) -> Result<Package> {
        let t0 = std::time::Instant::now();

        log::debug!("{:?}", Stage::ValidateSelection);
        if selection.is_empty() {
            return Err(Error::EmptySelection);
        }
        self.config.validate()?;

        let mut skipped = Vec::new();
        let mut resolved: Vec<(usize, &ReportTemplate)> = Vec::new();
        for (index, id) in selection.ids().iter().enumerate() {
            match self.registry.get(id) {
                Ok(template) => resolved.push((index, template)),
                Err(e) => {
                    log::warn!("Skipping report: {e}");
                    skipped.push(id.clone());
                }
            }
        }
        if let Some(notice) = content.incomplete() {
            log::info!("{}: {notice}", content.profile.name);
        }

        // Synthesis is pure per template; placement below stays in selection order.
        let reports: Vec<ResolvedReport> = resolved
            .par_iter()
            .map(|&(index, template)| ResolvedReport {
                index,
                template,
                report: generate_report(template, content),
            })
            .collect();
        let t_synth = t0.elapsed();

        let mut toc: Vec<TocEntry> = reports
            .iter()
            .map(|r| TocEntry {
                template_id: r.template.id.clone(),
                title: r.template.title.clone(),
                page: FIRST_REPORT_SLOT + r.index,
            })
            .collect();

        let engine = LayoutEngine::new(self.config, self.measure);
        let (mut document, mut starts) =
            self.lay_out(&engine, content, &reports, &toc, &skipped, generated_on);

        if self.numbering == TocNumbering::Exact {
            // Numbers only change TOC text, so a second settle pass suffices
            // unless the contents page itself grows.
            for _ in 0..2 {
                if toc.iter().map(|e| e.page).eq(starts.iter().copied()) {
                    break;
                }
                for (entry, &page) in toc.iter_mut().zip(&starts) {
                    entry.page = page;
                }
                (document, starts) =
                    self.lay_out(&engine, content, &reports, &toc, &skipped, generated_on);
            }
            if !toc.iter().map(|e| e.page).eq(starts.iter().copied()) {
                log::warn!("Table of contents page numbers did not settle");
            }
        }

        log::debug!("{:?}", Stage::Finalize);
        engine.write_footers(&mut document, CONFIDENTIALITY_LEGEND);
        let t_layout = t0.elapsed();

        log::info!(
            "Assembly: {} reports, {} skipped, {} pages; synth={:.1}ms, layout={:.1}ms",
            reports.len(),
            skipped.len(),
            document.page_count(),
            t_synth.as_secs_f64() * 1000.0,
            (t_layout - t_synth).as_secs_f64() * 1000.0,
        );

        Ok(Package {
            file_name: suggested_file_name(&content.profile.name, generated_on),
            document,
            toc,
            reports: reports.into_iter().map(|r| r.report).collect(),
            report_start_pages: starts,
            skipped,
        })
    }

    /// Cover, contents and report pages. Returns the document and the 1-based
    /// start page of each report.
    fn lay_out(
        &self,
        engine: &LayoutEngine,
        content: &CompanyContent,
        reports: &[ResolvedReport],
        toc: &[TocEntry],
        skipped: &[String],
        generated_on: NaiveDate,
    ) -> (Document, Vec<usize>) {
        let (mut doc, cursor) = engine.start_document();
        if let Some(logo) = &self.logo {
            doc.images.push(logo.clone());
        }

        log::debug!("{:?}", Stage::CoverPage);
        self.cover_page(engine, &mut doc, cursor, content, reports.len(), generated_on);
        if doc.pages.len() > 1 {
            log::warn!(
                "Cover overflowed onto {} pages; keeping the first",
                doc.pages.len()
            );
            doc.pages.truncate(1);
        }

        log::debug!("{:?}", Stage::BuildToc);
        let cursor = engine.new_page(&mut doc);
        let mut cursor = self.contents_page(engine, &mut doc, cursor, toc, skipped);

        log::debug!("{:?}", Stage::EmitReports);
        let mut starts = Vec::with_capacity(reports.len());
        for r in reports {
            cursor = engine.page_break(&mut doc, cursor);
            starts.push(cursor.page + 1);
            cursor = self.report_pages(engine, &mut doc, cursor, r, content);
        }
        (doc, starts)
    }

    fn cover_page(
        &self,
        engine: &LayoutEngine,
        doc: &mut Document,
        cursor: PageCursor,
        content: &CompanyContent,
        report_count: usize,
        generated_on: NaiveDate,
    ) {
        let cfg = self.config;
        let centered = TextStyle::body(cfg).aligned(Alignment::Center);
        let muted = centered.colored(cfg.muted_color);

        let mut cursor = engine.skip(cursor, (cfg.bottom_limit() - cfg.margin_top) * 0.2);
        if !doc.images.is_empty() {
            cursor = engine.image(doc, cursor, 0, LOGO_MAX_WIDTH, LOGO_MAX_HEIGHT);
            cursor = engine.skip(cursor, 18.0);
        }
        cursor = engine.clamped_paragraph(
            doc,
            cursor,
            PACKAGE_TITLE,
            &TextStyle::title(cfg),
            COVER_TITLE_LINES,
        );
        cursor = engine.skip(cursor, 12.0);

        let company_style = TextStyle::heading(cfg)
            .aligned(Alignment::Center)
            .colored([0x11, 0x18, 0x27]);
        cursor = engine.clamped_paragraph(
            doc,
            cursor,
            &content.profile.name,
            &company_style,
            COVER_NAME_LINES,
        );

        let profile = &content.profile;
        let subtitle = match &profile.ticker {
            Some(t) => format!("{} \u{00B7} {}", t, profile.industry),
            None => profile.industry.clone(),
        };
        cursor = engine.clamped_paragraph(doc, cursor, &subtitle, &muted, COVER_SUBTITLE_LINES);
        cursor = engine.skip(cursor, 24.0);
        cursor = engine.rule(doc, cursor, 0.75, Some(cfg.accent_color));
        cursor = engine.skip(cursor, 12.0);

        let generated = format!("Generated on {}", generated_on.format("%Y-%m-%d"));
        cursor = engine.clamped_paragraph(doc, cursor, &generated, &centered, 1);
        let count = match report_count {
            1 => "1 report included".to_string(),
            n => format!("{n} reports included"),
        };
        engine.clamped_paragraph(doc, cursor, &count, &centered, 1);
    }

    fn contents_page(
        &self,
        engine: &LayoutEngine,
        doc: &mut Document,
        cursor: PageCursor,
        toc: &[TocEntry],
        skipped: &[String],
    ) -> PageCursor {
        let cfg = self.config;
        let body = TextStyle::body(cfg);
        let mut cursor = engine.heading(doc, cursor, "Table of Contents", &TextStyle::heading(cfg));
        cursor = engine.skip(cursor, cfg.paragraph_spacing);
        for entry in toc {
            cursor = engine.leader_line(doc, cursor, &entry.title, &entry.page.to_string(), &body);
        }
        if !skipped.is_empty() {
            cursor = engine.skip(cursor, cfg.paragraph_spacing * 2.0);
            let note = format!(
                "Not included (no matching report template): {}",
                skipped.join(", ")
            );
            cursor = engine.paragraph(doc, cursor, &note, &body.colored(cfg.muted_color));
        }
        cursor
    }

    fn report_pages(
        &self,
        engine: &LayoutEngine,
        doc: &mut Document,
        cursor: PageCursor,
        r: &ResolvedReport,
        content: &CompanyContent,
    ) -> PageCursor {
        let cfg = self.config;
        let body = TextStyle::body(cfg);
        let muted = body.colored(cfg.muted_color);
        let heading = TextStyle::heading(cfg);
        let report = &r.report;

        let title_style = TextStyle::title(cfg).aligned(Alignment::Left);
        let mut cursor = engine.heading(doc, cursor, &report.title, &title_style);
        cursor = engine.paragraph(doc, cursor, &report.description, &muted);

        let mut meta = format!("Category: {}", r.template.category);
        if !r.template.estimated_duration.is_empty() {
            meta.push_str(&format!(
                " \u{00B7} Estimated generation time: {}",
                r.template.estimated_duration
            ));
        }
        let small = TextStyle {
            font_size: cfg.footer_size + 1.0,
            ..muted
        };
        cursor = engine.paragraph(doc, cursor, &meta, &small);
        cursor = engine.rule(doc, cursor, 0.5, Some(cfg.muted_color));

        cursor = engine.paragraph(doc, cursor, &report.body_text, &body);

        if report.with_metrics {
            cursor = engine.heading(doc, cursor, "Key Financial Metrics", &heading);
            cursor = engine.metric_rows(doc, cursor, &content.financials.rows(), &body);
        }

        if !report.included_sections.is_empty() {
            cursor = engine.heading(doc, cursor, "This report includes:", &heading);
            cursor = engine.bullets(doc, cursor, &report.included_sections, &body);
        }
        cursor
    }
}

/// `{Company}_Credit_Package_{YYYY-MM-DD}.pdf` with whitespace turned into
/// underscores and anything outside `[A-Za-z0-9._-]` removed.
pub fn suggested_file_name(company_name: &str, generated_on: NaiveDate) -> String {
    let joined = company_name.split_whitespace().collect::<Vec<_>>().join("_");
    let safe: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    let safe = safe.trim_matches(|c| c == '.' || c == '_');
    let stem = if safe.is_empty() { "Company" } else { safe };
    format!(
        "{}_Credit_Package_{}.pdf",
        stem,
        generated_on.format("%Y-%m-%d")
    )
}
