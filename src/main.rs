use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;

use dossier_pdf::{
    EmbeddedImage, ExportOptions, FontSet, SelectionSet, TemplateRegistry, TocNumbering,
    export_package,
};

#[derive(Parser, Debug)]
#[command(
    name = "dossier-pdf",
    version,
    about = "Assemble credit analysis reports into one paginated PDF package"
)]
struct Cli {
    /// Company analysis JSON
    #[arg(required_unless_present = "list")]
    input: Option<PathBuf>,

    /// Output file, or a directory to receive the suggested file name
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Template id to include; repeat to select several, in order
    #[arg(short, long = "report", value_name = "ID")]
    reports: Vec<String>,

    /// Include every template in the catalog
    #[arg(long, conflicts_with = "reports")]
    all: bool,

    /// Print the template catalog grouped by category and exit
    #[arg(long)]
    list: bool,

    /// Generation date printed on the cover and in the file name (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// TrueType font for body text
    #[arg(long, env = "DOSSIER_FONT")]
    font: Option<PathBuf>,

    /// TrueType font for headings and labels
    #[arg(long, env = "DOSSIER_BOLD_FONT")]
    bold_font: Option<PathBuf>,

    /// PNG or JPEG logo for the cover page
    #[arg(long)]
    logo: Option<PathBuf>,

    /// JSON template catalog replacing the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Number the table of contents with real start pages
    #[arg(long)]
    exact_toc: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn print_catalog(registry: &TemplateRegistry) {
    for (category, templates) in registry.by_category() {
        println!("{category}");
        for t in templates {
            println!("  {:<20} {}", t.id, t.title);
        }
    }
}

fn run(cli: Cli) -> dossier_pdf::Result<()> {
    let registry = match &cli.catalog {
        Some(path) => TemplateRegistry::from_path(path)?,
        None => TemplateRegistry::builtin(),
    };
    if cli.list {
        print_catalog(&registry);
        return Ok(());
    }
    let Some(input) = cli.input.as_deref() else {
        return Ok(());
    };

    let selection = if cli.all {
        SelectionSet::all(&registry)
    } else {
        SelectionSet::new(cli.reports)
    };

    let mut options = ExportOptions::new(
        cli.date
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
    );
    options.registry = registry;
    options.fonts = FontSet::load(cli.font.as_ref(), cli.bold_font.as_ref())?;
    options.logo = cli.logo.as_deref().map(EmbeddedImage::from_path).transpose()?;
    if cli.exact_toc {
        options.toc_numbering = TocNumbering::Exact;
    }

    let (package, path) = export_package(input, &selection, &options, &cli.output)?;
    for id in &package.skipped {
        eprintln!("Warning: skipped unknown report template '{id}'");
    }
    println!(
        "Wrote {} ({} reports, {} pages)",
        path.display(),
        package.reports.len(),
        package.document.page_count()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
