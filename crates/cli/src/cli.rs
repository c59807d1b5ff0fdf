use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use assetbook_core::{BranchId, Money, TenantId, UserId};
use assetbook_depreciation::{AssetId, LedgerEntryId, MethodKind};
use assetbook_observability::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "assetbook", version, about = "Fixed-asset depreciation engine")]
pub struct Cli {
    /// State file holding assets, ledgers and journals.
    #[arg(long, global = true, default_value = "assetbook.json")]
    pub workspace: PathBuf,

    /// Engine configuration (TOML). Falls back to ASSETBOOK_CONFIG.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Tenant the command acts on.
    #[arg(long, global = true)]
    pub company: Option<TenantId>,

    /// Acting user. Without it the command runs as the scheduled system.
    #[arg(long, global = true)]
    pub user: Option<UserId>,

    #[arg(long, global = true, default_value = "json")]
    pub log_format: LogFormat,

    /// Business date override (defaults to the local date).
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register and inspect assets.
    #[command(subcommand)]
    Asset(AssetCommand),
    /// Compute and record one period of depreciation.
    Run(RunArgs),
    /// Post a period's recorded but unposted charges.
    PostUnposted(PostUnpostedArgs),
    /// Reverse a single ledger entry.
    Reverse(ReverseArgs),
    /// Reverse every active entry of a period.
    ReversePeriod(ReversePeriodArgs),
    /// Show an asset's depreciation schedule.
    History(HistoryArgs),
}

#[derive(Debug, Subcommand)]
pub enum AssetCommand {
    Add(AddAssetArgs),
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    StraightLine,
    DecliningBalance,
    UnitsOfProduction,
}

impl From<MethodArg> for MethodKind {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::StraightLine => MethodKind::StraightLine,
            MethodArg::DecliningBalance => MethodKind::DecliningBalance,
            MethodArg::UnitsOfProduction => MethodKind::UnitsOfProduction,
        }
    }
}

#[derive(Debug, Args)]
pub struct AddAssetArgs {
    #[arg(long)]
    pub number: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub cost: Money,
    #[arg(long, default_value = "0")]
    pub salvage: Money,
    /// Useful life in months.
    #[arg(long)]
    pub life: u32,
    /// Omit to register the asset without a method.
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,
    /// Method code recorded on the asset (defaults to the method name).
    #[arg(long)]
    pub method_code: Option<String>,
    /// Declining-balance rate in percent per period.
    #[arg(long)]
    pub rate: Option<Decimal>,
    /// Total lifetime units (units of production).
    #[arg(long)]
    pub capacity: Option<u64>,
    /// First day of depreciation.
    #[arg(long)]
    pub start: NaiveDate,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub cost_center: Option<String>,
    #[arg(long)]
    pub branch: Option<BranchId>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Period date; defaults to the last day of the previous month.
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Explicit assets. Overrides the filters.
    #[arg(long = "asset")]
    pub assets: Vec<AssetId>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,
    /// Only assets of this branch; also the posting branch.
    #[arg(long)]
    pub branch: Option<BranchId>,
    /// Replace existing entries for the period.
    #[arg(long)]
    pub force: bool,
    /// Post recorded charges as one journal entry.
    #[arg(long)]
    pub post: bool,
    #[arg(long)]
    pub dry_run: bool,
    /// Units consumed, as ASSET_ID=UNITS. Repeatable.
    #[arg(long = "units", value_parser = parse_units)]
    pub units: Vec<(AssetId, i64)>,
}

#[derive(Debug, Args)]
pub struct PostUnpostedArgs {
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long)]
    pub branch: Option<BranchId>,
}

#[derive(Debug, Args)]
pub struct ReverseArgs {
    #[arg(long)]
    pub asset: AssetId,
    #[arg(long)]
    pub entry: LedgerEntryId,
    /// Reversal date; defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub reason: String,
}

#[derive(Debug, Args)]
pub struct ReversePeriodArgs {
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long)]
    pub reason: String,
    /// Required: this reverses every asset's entry for the period.
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[arg(long)]
    pub asset: AssetId,
}

fn parse_units(raw: &str) -> Result<(AssetId, i64), String> {
    let (id, units) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ASSET_ID=UNITS, got '{raw}'"))?;
    let id = id.trim().parse::<AssetId>().map_err(|e| e.to_string())?;
    let units = units
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid units '{units}': {e}"))?;
    Ok((id, units))
}
