//! Command-line access to the registration data: prints dashboard views as
//! JSON or exports the filtered rows.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use polars::prelude::*;
use serde::Serialize;

use vehicle_registrations::config::FilterDefaults;
use vehicle_registrations::filter::categories_from_labels;
use vehicle_registrations::{dashboard_view, filtered_table, kpis, DashboardConfig};

#[derive(Parser)]
#[command(
    name = "vehicle-registrations",
    about = "Synthetic vehicle registration data and dashboard views"
)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Last day of the generated window (default: today)
    #[arg(long, global = true)]
    anchor: Option<NaiveDate>,

    /// Length of the generated window in months
    #[arg(long, global = true)]
    history_months: Option<u32>,

    #[command(flatten)]
    filter: FilterArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// First day to include
    #[arg(long = "from", global = true)]
    date_from: Option<NaiveDate>,

    /// Last day to include
    #[arg(long = "to", global = true)]
    date_to: Option<NaiveDate>,

    /// Category to include (repeatable): 2W, 3W or 4W
    #[arg(long = "category", global = true)]
    categories: Vec<String>,

    /// Manufacturer to include (repeatable)
    #[arg(long = "manufacturer", global = true)]
    manufacturers: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// KPIs plus trend, distribution and yearly series
    View,
    /// Total, YoY and QoQ growth
    Kpis,
    /// Date bounds, categories and manufacturers available for filtering
    Options,
    /// Filtered rows, newest first
    Records,
    /// Write filtered rows, newest first, to a file
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Parquet,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    let config = file.merge(&flag_overrides(&cli));

    let table = config.load_table()?;
    let spec = config.filter.resolve(&table.filter_options()?);

    match cli.command {
        Commands::View => print_json(&dashboard_view(&table, &spec)?)?,
        Commands::Kpis => print_json(&kpis(&filtered_table(&table, &spec)?)?)?,
        Commands::Options => print_json(&table.filter_options()?)?,
        Commands::Records => {
            let rows = filtered_table(&table, &spec)?.newest_first()?;
            print_json(&rows.records()?)?;
        }
        Commands::Export { format, output } => {
            let mut frame = filtered_table(&table, &spec)?
                .newest_first()?
                .into_frame();
            let file = std::fs::File::create(&output)?;
            match format {
                ExportFormat::Csv => CsvWriter::new(file)
                    .include_header(true)
                    .finish(&mut frame)?,
                ExportFormat::Parquet => {
                    ParquetWriter::new(file).finish(&mut frame)?;
                }
            }
            log::info!("Exported {} rows to {}", frame.height(), output.display());
        }
    }

    Ok(())
}

/// Command-line flags as a config layer over the file.
fn flag_overrides(cli: &Cli) -> DashboardConfig {
    let args = &cli.filter;
    DashboardConfig {
        history_months: cli.history_months,
        anchor: cli.anchor,
        filter: FilterDefaults {
            date_from: args.date_from,
            date_to: args.date_to,
            categories: (!args.categories.is_empty())
                .then(|| categories_from_labels(args.categories.as_slice())),
            manufacturers: (!args.manufacturers.is_empty())
                .then(|| args.manufacturers.iter().cloned().collect()),
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
