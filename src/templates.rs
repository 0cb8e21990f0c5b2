//! Catalog of report kinds.
//!
//! The registry is an immutable value: build it once (built-in or from a JSON
//! catalog) and hand a reference to whatever assembles packages.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Display grouping only.
    pub category: String,
    #[serde(default)]
    pub color_tag: String,
    #[serde(default)]
    pub estimated_duration: String,
    #[serde(default)]
    pub included_sections: Vec<String>,
}

fn template(
    id: &str,
    title: &str,
    description: &str,
    category: &str,
    color_tag: &str,
    estimated_duration: &str,
    sections: &[&str],
) -> ReportTemplate {
    ReportTemplate {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        color_tag: color_tag.to_string(),
        estimated_duration: estimated_duration.to_string(),
        included_sections: sections.iter().map(|s| s.to_string()).collect(),
    }
}

fn builtin_templates() -> Vec<ReportTemplate> {
    vec![
        template(
            "distress-summary",
            "Distressed Credit Summary",
            "Executive overview of credit distress indicators, liquidity position and recovery outlook.",
            "Overview",
            "red",
            "2-3 minutes",
            &[
                "Executive Summary",
                "Key Financial Metrics",
                "Distress Indicators",
                "Recovery Outlook",
            ],
        ),
        template(
            "covenant-analysis",
            "Covenant Tracking Report",
            "Compliance status against financial maintenance covenants with headroom analysis.",
            "Compliance",
            "amber",
            "3-4 minutes",
            &[
                "Covenant Compliance Matrix",
                "Headroom Analysis",
                "Breach Risk Assessment",
                "Cure Options",
            ],
        ),
        template(
            "liquidity-forecast",
            "13-Week Liquidity Forecast",
            "Short-term cash flow projection with runway and funding-gap analysis.",
            "Liquidity",
            "blue",
            "4-5 minutes",
            &[
                "Weekly Cash Flow Projection",
                "Runway Analysis",
                "Working Capital Drivers",
                "Liquidity Sources",
            ],
        ),
        template(
            "capital-structure",
            "Capital Structure Analysis",
            "Debt stack, priority of claims and recovery waterfall across the capital structure.",
            "Structure",
            "purple",
            "3-4 minutes",
            &[
                "Debt Capitalization Table",
                "Priority of Claims",
                "Recovery Waterfall",
                "Leverage Metrics",
            ],
        ),
        template(
            "investment-memo",
            "Investment Committee Memo",
            "Investment thesis, risk factors and recommendation prepared for committee review.",
            "Investment",
            "green",
            "5-7 minutes",
            &[
                "Investment Thesis",
                "Key Financial Metrics",
                "Risk Factors",
                "Recommendation",
            ],
        ),
        template(
            "maturity-analysis",
            "Debt Maturity Analysis",
            "Maturity wall, refinancing risk and extension scenarios for outstanding debt.",
            "Structure",
            "indigo",
            "2-3 minutes",
            &[
                "Maturity Schedule",
                "Refinancing Risk",
                "Extension Scenarios",
            ],
        ),
    ]
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateRegistry {
    templates: Vec<ReportTemplate>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateRegistry {
    /// The six built-in report kinds, in display order.
    pub fn builtin() -> Self {
        Self {
            templates: builtin_templates(),
        }
    }

    /// Build a catalog from explicit templates. Ids must be non-empty and unique.
    pub fn from_templates(templates: Vec<ReportTemplate>) -> Result<Self> {
        let mut seen = HashSet::new();
        for t in &templates {
            if t.id.trim().is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "template \"{}\" has an empty id",
                    t.title
                )));
            }
            if !seen.insert(t.id.as_str()) {
                return Err(Error::InvalidCatalog(format!("duplicate template id: {}", t.id)));
            }
        }
        Ok(Self { templates })
    }

    /// Parse a catalog from a JSON array of templates.
    pub fn from_json(json: &str) -> Result<Self> {
        let templates: Vec<ReportTemplate> = serde_json::from_str(json)?;
        Self::from_templates(templates)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn list(&self) -> &[ReportTemplate] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Result<&ReportTemplate> {
        self.templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::TemplateNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.iter().any(|t| t.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.id.as_str())
    }

    /// Templates grouped by category, groups in order of first appearance.
    pub fn by_category(&self) -> Vec<(&str, Vec<&ReportTemplate>)> {
        let mut groups: Vec<(&str, Vec<&ReportTemplate>)> = Vec::new();
        for t in &self.templates {
            match groups.iter_mut().find(|(c, _)| *c == t.category) {
                Some((_, members)) => members.push(t),
                None => groups.push((t.category.as_str(), vec![t])),
            }
        }
        groups
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
