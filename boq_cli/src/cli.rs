//! Argument definitions (clap derive).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "boq",
    version = env!("CARGO_PKG_VERSION"),
    about = "Quantity takeoff and Bill of Quantities for construction quotes",
    after_help = "EXAMPLES:\n\
        \x20 boq new house.boq --title \"3BR Bungalow\" --client \"J. Client\" --region Nairobi\n\
        \x20 boq add house.boq rows.json\n\
        \x20 boq recompute house.boq --prices prices.json\n\
        \x20 boq bill house.boq --consolidated",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags available on every subcommand.
#[derive(Debug, Args, Clone)]
pub struct GlobalArgs {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// User id for file locks and price overrides (defaults to $USER)
    #[arg(long, global = true, value_name = "USER")]
    pub user: Option<String>,
}

impl GlobalArgs {
    pub fn user_id(&self) -> String {
        self.user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create an empty quote file
    New(NewArgs),

    /// Add rows from a JSON file (one row or an array)
    Add(AddArgs),

    /// Replace the quote's settings from a JSON file (nested or legacy keys)
    Settings(SettingsArgs),

    /// Recalculate quantities, prices and the bill
    #[command(visible_alias = "calc")]
    Recompute(RecomputeArgs),

    /// Print the Bill of Quantities from the last recompute
    Bill(BillArgs),

    /// Print the financial summary from the last recompute
    Summary(SummaryArgs),
}

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Quote file to create
    #[arg(value_name = "QUOTE")]
    pub path: PathBuf,

    #[arg(long, default_value = "Untitled quote")]
    pub title: String,

    #[arg(long, default_value = "")]
    pub client: String,

    /// Pricing region
    #[arg(long, default_value = "Nairobi")]
    pub region: String,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(value_name = "QUOTE")]
    pub path: PathBuf,

    /// JSON file holding a row object or an array of rows
    #[arg(value_name = "ROWS")]
    pub rows: PathBuf,
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[arg(value_name = "QUOTE")]
    pub path: PathBuf,

    /// JSON settings document
    #[arg(value_name = "SETTINGS")]
    pub settings: PathBuf,
}

#[derive(Debug, Args)]
pub struct RecomputeArgs {
    #[arg(value_name = "QUOTE")]
    pub path: PathBuf,

    /// JSON file with base_prices, overrides and multipliers
    #[arg(long, value_name = "PRICES")]
    pub prices: Option<PathBuf>,

    /// Print the computed outputs as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct BillArgs {
    #[arg(value_name = "QUOTE")]
    pub path: PathBuf,

    /// Merge identical items across bills
    #[arg(long)]
    pub consolidated: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[arg(value_name = "QUOTE")]
    pub path: PathBuf,

    #[arg(long)]
    pub json: bool,
}
