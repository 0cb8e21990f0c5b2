use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Marker the upstream analysis service uses for "metric not yet available".
pub const SENTINEL: &str = "N/A";

// ---------------------------------------------------------------------------
// Analysis input
// ---------------------------------------------------------------------------

/// Company analysis object as delivered by the analysis service. Only the
/// fields listed here are read; everything else in the JSON is ignored.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysisData {
    #[serde(default)]
    pub company: Option<RawCompany>,
    #[serde(default)]
    pub analysis_result: Option<RawAnalysisResult>,
    #[serde(default)]
    pub financials: Option<RawFinancials>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompany {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAnalysisResult {
    #[serde(default)]
    pub company: Option<RawCompany>,
}

/// Metric values arrive pre-formatted ("$70.2M"), as bare numbers, as the
/// sentinel, or not at all.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFinancials {
    #[serde(default)]
    pub revenue: Option<Value>,
    #[serde(default)]
    pub gross_margin: Option<Value>,
    #[serde(default)]
    pub total_debt: Option<Value>,
    #[serde(default)]
    pub cash: Option<Value>,
}

impl RawAnalysisData {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display()))
        })?;
        Self::from_json(&text)
    }
}

// ---------------------------------------------------------------------------
// Synthesized content
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct CompanyProfile {
    pub name: String,
    pub ticker: Option<String>,
    pub industry: String,
    pub is_private: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    Revenue,
    GrossMargin,
    TotalDebt,
    Cash,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Revenue,
        Metric::GrossMargin,
        Metric::TotalDebt,
        Metric::Cash,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue",
            Metric::GrossMargin => "Gross Margin",
            Metric::TotalDebt => "Total Debt",
            Metric::Cash => "Cash",
        }
    }

    /// Lowercase form used inside running prose.
    pub fn phrase(self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::GrossMargin => "gross margin",
            Metric::TotalDebt => "total debt",
            Metric::Cash => "cash",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    Reported(String),
    Unavailable,
}

impl MetricValue {
    /// Sentinel substitution: missing, blank and `"N/A"` all become
    /// `Unavailable`. Numbers keep their JSON text.
    pub fn from_raw(raw: Option<&Value>) -> Self {
        let text = match raw {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return MetricValue::Unavailable,
        };
        if text.is_empty() || text.eq_ignore_ascii_case(SENTINEL) {
            MetricValue::Unavailable
        } else {
            MetricValue::Reported(text)
        }
    }

    pub fn reported(&self) -> Option<&str> {
        match self {
            MetricValue::Reported(v) => Some(v),
            MetricValue::Unavailable => None,
        }
    }

    /// Text safe for display: the reported value, or a bracketed placeholder.
    pub fn display(&self, metric: Metric) -> String {
        match self {
            MetricValue::Reported(v) => v.clone(),
            MetricValue::Unavailable => format!("[{} Data Unavailable]", metric.label()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FinancialSnapshot {
    pub revenue: MetricValue,
    pub gross_margin: MetricValue,
    pub total_debt: MetricValue,
    pub cash: MetricValue,
}

impl FinancialSnapshot {
    pub fn get(&self, metric: Metric) -> &MetricValue {
        match metric {
            Metric::Revenue => &self.revenue,
            Metric::GrossMargin => &self.gross_margin,
            Metric::TotalDebt => &self.total_debt,
            Metric::Cash => &self.cash,
        }
    }

    /// Reported metrics in canonical order.
    pub fn present(&self) -> Vec<(Metric, &str)> {
        Metric::ALL
            .iter()
            .filter_map(|&m| self.get(m).reported().map(|v| (m, v)))
            .collect()
    }

    pub fn missing(&self) -> Vec<Metric> {
        Metric::ALL
            .iter()
            .copied()
            .filter(|&m| self.get(m).reported().is_none())
            .collect()
    }

    /// Label/value rows for a metrics block, placeholders included.
    pub fn rows(&self) -> Vec<(String, String)> {
        Metric::ALL
            .iter()
            .map(|&m| (m.label().to_string(), self.get(m).display(m)))
            .collect()
    }
}

/// Informational notice: synthesis succeeded but some metrics were missing.
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisIncomplete {
    pub missing: Vec<Metric>,
}

impl fmt::Display for SynthesisIncomplete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.missing.iter().map(|m| m.label()).collect();
        write!(f, "analysis data incomplete; unavailable: {}", names.join(", "))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompanyContent {
    pub profile: CompanyProfile,
    pub financials: FinancialSnapshot,
    pub executive_summary: String,
    pub opportunity_description: String,
}

impl CompanyContent {
    pub fn incomplete(&self) -> Option<SynthesisIncomplete> {
        let missing = self.financials.missing();
        if missing.is_empty() {
            None
        } else {
            Some(SynthesisIncomplete { missing })
        }
    }
}

/// A report body produced for one template. Lives only for one export.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedReport {
    pub template_id: String,
    pub title: String,
    pub description: String,
    pub body_text: String,
    pub included_sections: Vec<String>,
    /// Whether the "Key Financial Metrics" block accompanies the body.
    pub with_metrics: bool,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// One placed line of text. `x` is the resolved left edge, `y` the top edge
/// measured down from the top of the page, both in points.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub bold: bool,
    pub color: Option<[u8; 3]>,
}

impl TextBlock {
    pub fn bottom(&self) -> f32 {
        self.y + self.line_height
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub thickness: f32,
    pub color: Option<[u8; 3]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Index into `Document::images`.
    pub image: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Text(TextBlock),
    Rule(Rule),
    Image(ImageBlock),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Footer {
    pub page_label: TextBlock,
    pub legend: TextBlock,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub blocks: Vec<Block>,
    pub footer: Option<Footer>,
}

impl Page {
    pub fn text_blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Text(t) => Some(t),
            _ => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.text_blocks().any(|t| t.text.contains(needle))
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl EmbeddedImage {
    /// Sniff the format and pixel size of PNG or JPEG bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let format = match image::guess_format(&data).map_err(|e| Error::Image(e.to_string()))? {
            image::ImageFormat::Png => ImageFormat::Png,
            image::ImageFormat::Jpeg => ImageFormat::Jpeg,
            other => {
                return Err(Error::Image(format!(
                    "unsupported image format {other:?} (expected PNG or JPEG)"
                )));
            }
        };
        let (pixel_width, pixel_height) = image::ImageReader::new(std::io::Cursor::new(&data))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| Error::Image(e.to_string()))?;
        Ok(Self {
            data,
            format,
            pixel_width,
            pixel_height,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display()))
        })?;
        Self::from_bytes(data)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub page_width: f32,
    pub page_height: f32,
    pub pages: Vec<Page>,
    pub images: Vec<EmbeddedImage>,
}

impl Document {
    pub fn new(page_width: f32, page_height: f32) -> Self {
        Self {
            page_width,
            page_height,
            pages: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All text on the page range, in placement order. Footers excluded.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .flat_map(|p| p.text_blocks())
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
