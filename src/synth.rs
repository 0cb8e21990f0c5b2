//! Narrative synthesis from raw analysis data.
//!
//! Everything here is a pure function of its input: no clock, no randomness,
//! no shared state. Missing data degrades to placeholders, never to errors.

use crate::model::{
    CompanyContent, CompanyProfile, FinancialSnapshot, GeneratedReport, Metric, MetricValue,
    RawAnalysisData, RawCompany,
};
use crate::templates::ReportTemplate;

pub const DEFAULT_COMPANY_NAME: &str = "Target Company";
pub const INDUSTRY_PENDING: &str = "Industry Classification Pending";

const ANALYSIS_FOCUS: &str = "The analysis focuses on covenant compliance, liquidity runway and \
recovery prospects across the capital structure.";

const ANALYTICAL_INTENT: &str = "The objective is to identify mispriced credit risk, quantify \
downside protection and surface recovery value ahead of any restructuring.";

/// Section title that makes a report carry the metrics block.
pub const METRICS_SECTION: &str = "Key Financial Metrics";

fn non_blank(s: Option<&String>) -> Option<&str> {
    s.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn resolve<'a>(
    data: &'a RawAnalysisData,
    field: impl Fn(&'a RawCompany) -> Option<&'a String>,
) -> Option<&'a str> {
    let explicit = data.company.as_ref().and_then(|c| non_blank(field(c)));
    explicit.or_else(|| {
        data.analysis_result
            .as_ref()
            .and_then(|r| r.company.as_ref())
            .and_then(|c| non_blank(field(c)))
    })
}

fn resolve_profile(data: &RawAnalysisData) -> CompanyProfile {
    CompanyProfile {
        name: resolve(data, |c| c.name.as_ref())
            .unwrap_or(DEFAULT_COMPANY_NAME)
            .to_string(),
        ticker: resolve(data, |c| c.ticker.as_ref()).map(str::to_string),
        industry: resolve(data, |c| c.industry.as_ref())
            .unwrap_or(INDUSTRY_PENDING)
            .to_string(),
        is_private: data
            .company
            .as_ref()
            .and_then(|c| c.is_private)
            .unwrap_or(false),
    }
}

fn resolve_financials(data: &RawAnalysisData) -> FinancialSnapshot {
    let f = data.financials.as_ref();
    FinancialSnapshot {
        revenue: MetricValue::from_raw(f.and_then(|f| f.revenue.as_ref())),
        gross_margin: MetricValue::from_raw(f.and_then(|f| f.gross_margin.as_ref())),
        total_debt: MetricValue::from_raw(f.and_then(|f| f.total_debt.as_ref())),
        cash: MetricValue::from_raw(f.and_then(|f| f.cash.as_ref())),
    }
}

/// "a", "a and b", "a, b and c"
fn join_natural(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn display_name(profile: &CompanyProfile) -> String {
    match &profile.ticker {
        Some(t) => format!("{} ({})", profile.name, t),
        None => profile.name.clone(),
    }
}

fn industry_clause(profile: &CompanyProfile) -> String {
    if profile.industry == INDUSTRY_PENDING {
        "whose industry classification is still pending".to_string()
    } else {
        format!("operating in {}", profile.industry)
    }
}

fn executive_summary(profile: &CompanyProfile, financials: &FinancialSnapshot) -> String {
    let present = financials.present();
    if present.is_empty() {
        return format!(
            "The credit analysis of {} is in progress. Financial metrics will be drawn from \
             uploaded documents, SEC filings and market data as they are processed, after which \
             this summary will cover covenant compliance, liquidity and recovery prospects.",
            profile.name
        );
    }

    let known: Vec<String> = present.iter().map(|(m, _)| m.phrase().to_string()).collect();
    let woven: Vec<String> = present
        .iter()
        .enumerate()
        .map(|(i, (m, v))| {
            if i == 0 {
                format!("{} stands at {}", m.phrase(), v)
            } else {
                format!("{} at {}", m.phrase(), v)
            }
        })
        .collect();

    format!(
        "{}, {}, has been analyzed as a distressed credit opportunity using the financial data \
         currently available ({}). Reported {}. {}",
        display_name(profile),
        industry_clause(profile),
        join_natural(&known),
        join_natural(&woven),
        ANALYSIS_FOCUS
    )
}

fn opportunity_description(profile: &CompanyProfile) -> String {
    let mode = if profile.is_private {
        "document-based analysis"
    } else {
        "real-time market data and document analysis"
    };
    format!(
        "Opportunity assessment for {} is based on {}. {}",
        profile.name, mode, ANALYTICAL_INTENT
    )
}

/// Derive display-ready content from the raw analysis object.
pub fn synthesize(data: &RawAnalysisData) -> CompanyContent {
    let profile = resolve_profile(data);
    let financials = resolve_financials(data);
    let executive_summary = executive_summary(&profile, &financials);
    let opportunity_description = opportunity_description(&profile);
    CompanyContent {
        profile,
        financials,
        executive_summary,
        opportunity_description,
    }
}

// ---------------------------------------------------------------------------
// Per-template narratives
// ---------------------------------------------------------------------------

pub type NarrativeFn = fn(&CompanyContent) -> String;

fn metric(c: &CompanyContent, m: Metric) -> String {
    c.financials.get(m).display(m)
}

fn distress_summary(c: &CompanyContent) -> String {
    format!("{}\n\n{}", c.executive_summary, c.opportunity_description)
}

fn covenant_analysis(c: &CompanyContent) -> String {
    format!(
        "Covenant tracking for {} measures compliance against financial maintenance covenants \
         and the headroom remaining before a breach. Leverage tests are assessed against total \
         debt of {}, while minimum liquidity tests are assessed against cash of {}.\n\n\
         Breach risk is evaluated alongside available cure mechanisms, including equity cures, \
         amendment fees and waiver negotiations with the lender group.",
        c.profile.name,
        metric(c, Metric::TotalDebt),
        metric(c, Metric::Cash)
    )
}

fn liquidity_forecast(c: &CompanyContent) -> String {
    format!(
        "The liquidity forecast for {} projects weekly receipts and disbursements over a \
         thirteen-week horizon. The projection starts from cash of {} and is calibrated to \
         revenue of {}.\n\n\
         Runway is measured against committed and available facilities, and working capital \
         drivers are flagged where timing differences could create a funding gap.",
        c.profile.name,
        metric(c, Metric::Cash),
        metric(c, Metric::Revenue)
    )
}

fn capital_structure(c: &CompanyContent) -> String {
    format!(
        "The capital structure of {} is mapped by priority of claims, from secured facilities \
         through unsecured notes to equity. Total debt of {} is set against cash of {} to \
         derive net leverage.\n\n\
         A recovery waterfall allocates enterprise value across each class to identify the \
         fulcrum security.",
        c.profile.name,
        metric(c, Metric::TotalDebt),
        metric(c, Metric::Cash)
    )
}

fn investment_memo(c: &CompanyContent) -> String {
    format!(
        "{}\n\n{}\n\n\
         The committee is asked to weigh these findings against the risk factors below before \
         any position is taken in the credit of {}.",
        c.executive_summary, c.opportunity_description, c.profile.name
    )
}

fn maturity_analysis(c: &CompanyContent) -> String {
    format!(
        "The maturity analysis for {} lays out the schedule of debt coming due and the \
         refinancing risk each tranche carries. Total debt of {} is weighed against cash of {} \
         to size the near-term maturity wall.\n\n\
         Extension scenarios consider amend-and-extend transactions, exchange offers and \
         refinancing under current market conditions.",
        c.profile.name,
        metric(c, Metric::TotalDebt),
        metric(c, Metric::Cash)
    )
}

const NARRATIVES: &[(&str, NarrativeFn)] = &[
    ("distress-summary", distress_summary),
    ("covenant-analysis", covenant_analysis),
    ("liquidity-forecast", liquidity_forecast),
    ("capital-structure", capital_structure),
    ("investment-memo", investment_memo),
    ("maturity-analysis", maturity_analysis),
];

/// Narrative generator registered for a template id.
pub fn narrative_for(template_id: &str) -> Option<NarrativeFn> {
    NARRATIVES
        .iter()
        .find(|(id, _)| *id == template_id)
        .map(|(_, f)| *f)
}

fn generic_narrative(template: &ReportTemplate, c: &CompanyContent) -> String {
    format!(
        "{} This report was prepared for {}, {}.\n\n{}",
        template.description,
        c.profile.name,
        industry_clause(&c.profile),
        c.opportunity_description
    )
}

/// Build the report body for one template.
pub fn generate_report(template: &ReportTemplate, content: &CompanyContent) -> GeneratedReport {
    let body_text = match narrative_for(&template.id) {
        Some(narrative) => narrative(content),
        None => generic_narrative(template, content),
    };
    GeneratedReport {
        template_id: template.id.clone(),
        title: template.title.clone(),
        description: template.description.clone(),
        body_text,
        included_sections: template.included_sections.clone(),
        with_metrics: template.included_sections.iter().any(|s| s == METRICS_SECTION),
    }
}
