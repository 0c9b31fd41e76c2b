use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use covid_tenders::app::reconcile_use_case::{ReconcileUseCase, RunRequest};
use covid_tenders::config::Config;
use covid_tenders::constants;
use covid_tenders::infra::csv_table;
use covid_tenders::infra::CsvOutputAdapter;
use covid_tenders::logging;
use covid_tenders::observability;
use covid_tenders::pipeline::processing::awards::AwardSummary;
use covid_tenders::pipeline::processing::cleaner::CleaningSummary;
use covid_tenders::pipeline::processing::conflation::DedupSummary;
use covid_tenders::pipeline::processing::unit_prices::UnitPriceSummary;

#[derive(Parser)]
#[command(name = "covid_tenders")]
#[command(about = "Clean, deduplicate and reconcile public-procurement tender records")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write a Prometheus text snapshot of the batch metrics to this file
    #[arg(long, global = true)]
    metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce the deduplicated tender table
    Tenders {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Produce the winning-bid table joined against the curated supplier names
    Companies {
        #[arg(long)]
        input: PathBuf,
        /// CSV with `supplier` and `supplier_clean` columns
        #[arg(long)]
        suppliers: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Records the award cascade could not resolve
        #[arg(long)]
        missing_out: Option<PathBuf>,
        /// Resolved awards whose supplier has no curated name
        #[arg(long)]
        unmatched_out: Option<PathBuf>,
    },
    /// Clean a unit-price table and derive EUR unit prices and spend
    UnitPrices {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Clean once and write every table plus the batch report
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        suppliers: PathBuf,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _log_guard = logging::init_logging(Path::new(&config.logging.dir));

    let metrics_handle = match &cli.metrics_out {
        Some(_) => Some(observability::init().context("Failed to initialize metrics")?),
        None => None,
    };

    let output_dir = PathBuf::from(&config.output.dir);

    match cli.command {
        Commands::Tenders { input, output } => {
            println!("🔄 Building tender table...");
            let raw = csv_table::read_tender_records_from_path(&input)
                .with_context(|| format!("Failed to read tenders from {}", input.display()))?;

            let adapter = CsvOutputAdapter {
                tenders: Some(output.unwrap_or_else(|| output_dir.join(constants::TENDERS_FILE))),
                ..Default::default()
            };
            let use_case = ReconcileUseCase::new(config, Box::new(adapter));

            let batch = use_case.clean(raw);
            print_cleaning(&batch.summary);
            let summary = use_case.tenders(&batch)?;
            print_dedup(&summary);
        }
        Commands::Companies {
            input,
            suppliers,
            output,
            missing_out,
            unmatched_out,
        } => {
            println!("🔄 Reconciling winning bids...");
            let raw = csv_table::read_tender_records_from_path(&input)
                .with_context(|| format!("Failed to read tenders from {}", input.display()))?;
            let aliases = csv_table::read_supplier_aliases_from_path(&suppliers)
                .with_context(|| format!("Failed to read suppliers from {}", suppliers.display()))?;

            let adapter = CsvOutputAdapter {
                winning_bids: Some(output.unwrap_or_else(|| output_dir.join(constants::COMPANIES_FILE))),
                missing_awards: missing_out,
                unmatched_suppliers: unmatched_out,
                ..Default::default()
            };
            let use_case = ReconcileUseCase::new(config, Box::new(adapter));

            let batch = use_case.clean(raw);
            print_cleaning(&batch.summary);
            let summary = use_case.companies(&batch, aliases)?;
            print_awards(&summary);
        }
        Commands::UnitPrices { input, output } => {
            println!("🔄 Cleaning unit prices...");
            let table = csv_table::read_table_from_path(&input)
                .with_context(|| format!("Failed to read unit prices from {}", input.display()))?;

            let adapter = CsvOutputAdapter {
                unit_prices: Some(output.unwrap_or_else(|| output_dir.join(constants::UNIT_PRICES_FILE))),
                ..Default::default()
            };
            let use_case = ReconcileUseCase::new(config, Box::new(adapter));

            let summary = use_case.unit_prices(table)?;
            print_unit_prices(&summary);
        }
        Commands::Run {
            input,
            suppliers,
            output_dir: dir,
        } => {
            println!("🚀 Running full reconciliation batch...");
            let raw = csv_table::read_tender_records_from_path(&input)
                .with_context(|| format!("Failed to read tenders from {}", input.display()))?;
            let aliases = csv_table::read_supplier_aliases_from_path(&suppliers)
                .with_context(|| format!("Failed to read suppliers from {}", suppliers.display()))?;

            let dir = dir.unwrap_or(output_dir);
            let adapter = CsvOutputAdapter {
                unit_prices: None,
                ..CsvOutputAdapter::in_dir(&dir)
            };
            let use_case = ReconcileUseCase::new(config, Box::new(adapter));

            let report = use_case.run(
                raw,
                RunRequest {
                    tenders: true,
                    suppliers: Some(aliases),
                },
            )?;

            print_cleaning(&report.cleaning);
            if let Some(tenders) = &report.tenders {
                print_dedup(tenders);
            }
            if let Some(awards) = &report.awards {
                print_awards(awards);
            }
            println!("\n✅ Batch {} written to {}", report.run_id, dir.display());
        }
    }

    if let (Some(path), Some(handle)) = (&cli.metrics_out, &metrics_handle) {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, handle.render())
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        info!(path = %path.display(), "Wrote metrics snapshot");
    }

    Ok(())
}

fn print_cleaning(summary: &CleaningSummary) {
    println!("\n🧹 Cleaning:");
    println!("   Original size: {}", summary.records_in);
    println!("   Excluded: {}", summary.excluded_total());
    for (reason, count) in &summary.excluded {
        println!("     - {}: {}", reason.as_str(), count);
    }
    println!("   Exact duplicates dropped: {}", summary.exact_duplicates);
    println!("   Missing price_EUR: {}", summary.missing_price_eur);
    println!("   Missing price_lot_EUR: {}", summary.missing_price_lot_eur);
    println!("   After cleaning: {}", summary.records_out);
}

fn print_dedup(summary: &DedupSummary) {
    println!("\n📊 Tenders:");
    for (class, size) in &summary.class_sizes {
        let kept = summary.class_survivors.get(class).copied().unwrap_or(0);
        println!("   {}: {} -> {}", class.as_str(), size, kept);
    }
    println!("   Cross-class duplicates: {}", summary.cross_class_duplicates);
    println!("   Returned rows: {}", summary.tenders_out);
}

fn print_awards(summary: &AwardSummary) {
    println!("\n📊 Winning bids:");
    for (stage, count) in &summary.resolved_by_stage {
        println!("   {}: {}", stage, count);
    }
    println!("   Unpriced contracts: {}", summary.unpriced_contracts);
    println!("   Returned rows: {}", summary.winning_bids_out);
    println!("   Total awarded: {:.2} EUR", summary.total_awarded_eur);

    if summary.missing > 0 {
        println!("\n⚠️  {} records still missing an awarded amount", summary.missing);
    }
    if summary.suppliers_unmatched > 0 {
        warn!(count = summary.suppliers_unmatched, "Resolved awards dropped at the supplier join");
        println!("⚠️  {} resolved awards have no curated supplier name", summary.suppliers_unmatched);
    }
    if summary.alias_conflicts > 0 {
        println!("⚠️  {} conflicting supplier alias rows ignored", summary.alias_conflicts);
    }
}

fn print_unit_prices(summary: &UnitPriceSummary) {
    println!("\n📊 Unit prices:");
    println!("   Rows: {}", summary.rows);
    println!("   Unparseable amounts: {}", summary.unparseable_amounts);
    println!("   Unparseable dates: {}", summary.unparseable_dates);
    if summary.overlong_rows > 0 {
        println!("   ⚠️  Rows with extra fields truncated: {}", summary.overlong_rows);
    }
    println!("   Missing unit_price_eur: {}", summary.missing_unit_price_eur);
    println!("   Total spent: {:.2} EUR", summary.total_spent_eur);
}
