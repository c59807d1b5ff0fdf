use std::collections::BTreeMap;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{error, info};

use assetbook_core::{Actor, AggregateId, TenantId};
use assetbook_depreciation::{
    Asset, AssetId, DepreciationError, DepreciationMethod, ErrorCode, MethodKind, NewAsset,
    last_day_of_previous_month,
};
use assetbook_infra::{
    AssetFilter, AssetSelection, BatchOptions, BatchRequest, BatchRunner, DepreciationStore,
    EngineConfig, InMemoryAccountingGateway, InMemoryDepreciationStore, ReversalRequest,
};

use crate::cli::{
    AddAssetArgs, AssetCommand, Cli, Command, HistoryArgs, PostUnpostedArgs, ReverseArgs,
    ReversePeriodArgs, RunArgs,
};
use crate::workspace::Workspace;

type Store = std::sync::Arc<InMemoryDepreciationStore>;
type Gateway = std::sync::Arc<InMemoryAccountingGateway>;
type Runner = BatchRunner<Store, Gateway>;

struct Session {
    tenant_id: TenantId,
    actor: Actor,
    today: NaiveDate,
    store: Store,
    runner: Runner,
}

/// What a command reports and whether it changed state.
struct Outcome {
    report: serde_json::Value,
    exit_code: i32,
    persist: bool,
}

impl Outcome {
    fn read(report: impl Serialize) -> Result<Self> {
        Ok(Self {
            report: serde_json::to_value(report)?,
            exit_code: 0,
            persist: false,
        })
    }

    fn write(report: impl Serialize, exit_code: i32) -> Result<Self> {
        Ok(Self {
            report: serde_json::to_value(report)?,
            exit_code,
            persist: true,
        })
    }
}

#[derive(Serialize)]
struct ErrorReport {
    code: ErrorCode,
    message: String,
}

pub fn dispatch(cli: Cli) -> Result<ExitCode> {
    let config = EngineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let tenant_id = cli.company.ok_or_else(|| anyhow!("--company is required"))?;
    let actor = cli.user.map_or(Actor::ScheduledSystem, Actor::Human);
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());

    let (store, gateway) = Workspace::load(&cli.workspace)?.open();
    let ctx = Session {
        tenant_id,
        actor,
        today,
        store: store.clone(),
        runner: BatchRunner::new(store.clone(), gateway.clone(), &config),
    };

    let outcome = match cli.command {
        Command::Asset(AssetCommand::Add(args)) => add_asset(&ctx, args),
        Command::Asset(AssetCommand::List) => list_assets(&ctx),
        Command::Run(args) => run(&ctx, args),
        Command::PostUnposted(args) => post_unposted(&ctx, args),
        Command::Reverse(args) => reverse(&ctx, args),
        Command::ReversePeriod(args) => reverse_period(&ctx, args),
        Command::History(args) => history(&ctx, args),
    };

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => match err.downcast::<DepreciationError>() {
            Ok(failure) => {
                error!(tenant = %tenant_id, code = ?failure.code(), error = %failure, "command failed");
                print_json(&ErrorReport {
                    code: failure.code(),
                    message: failure.to_string(),
                })?;
                return Ok(ExitCode::FAILURE);
            }
            Err(other) => return Err(other),
        },
    };

    if outcome.persist {
        Workspace::capture(&store, &gateway)?.save(&cli.workspace)?;
    }
    print_json(&outcome.report)?;
    Ok(ExitCode::from(u8::try_from(outcome.exit_code).unwrap_or(1)))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn add_asset(ctx: &Session, args: AddAssetArgs) -> Result<Outcome> {
    if ctx
        .store
        .list_assets(ctx.tenant_id)?
        .iter()
        .any(|a| a.asset_number == args.number)
    {
        bail!("asset number {} already exists", args.number);
    }

    let method = match args.method {
        None => None,
        Some(kind) => {
            let kind = MethodKind::from(kind);
            let code = args.method_code.clone().unwrap_or_else(|| kind.to_string());
            Some(match kind {
                MethodKind::StraightLine => DepreciationMethod::straight_line(code),
                MethodKind::DecliningBalance => {
                    let rate = args.rate.context("--rate is required for declining_balance")?;
                    DepreciationMethod::declining_balance(code, rate)
                }
                MethodKind::UnitsOfProduction => DepreciationMethod::units_of_production(code),
            })
        }
    };

    let asset = Asset::register(NewAsset {
        tenant_id: ctx.tenant_id,
        asset_id: AssetId::new(AggregateId::new()),
        asset_number: args.number,
        name: args.name,
        category: args.category,
        location: args.location,
        branch_id: args.branch,
        cost_center: args.cost_center,
        original_cost: args.cost,
        salvage_value: args.salvage,
        useful_life_periods: args.life,
        method,
        total_capacity_units: args.capacity,
        depreciation_start: args.start,
    })
    .map_err(DepreciationError::from)?;

    ctx.store.upsert_asset(asset.clone())?;
    info!(tenant = %ctx.tenant_id, asset = %asset.id, number = %asset.asset_number, "asset registered");
    Outcome::write(asset, 0)
}

fn list_assets(ctx: &Session) -> Result<Outcome> {
    Outcome::read(ctx.store.list_assets(ctx.tenant_id)?)
}

fn run(ctx: &Session, args: RunArgs) -> Result<Outcome> {
    let period_date = match args.date {
        Some(date) => date,
        None => last_day_of_previous_month(ctx.today)
            .ok_or_else(|| anyhow!("no previous month before {}", ctx.today))?,
    };

    let selection = if args.assets.is_empty() {
        AssetSelection::Filter(AssetFilter {
            category: args.category,
            location: args.location,
            method: args.method.map(MethodKind::from),
            branch_id: args.branch,
        })
    } else {
        AssetSelection::Explicit(args.assets)
    };

    let request = BatchRequest {
        tenant_id: ctx.tenant_id,
        selection,
        period_date,
        today: ctx.today,
        options: BatchOptions {
            force_recalculate: args.force,
            auto_post: args.post,
            dry_run: args.dry_run,
        },
        actor: ctx.actor,
        branch_id: args.branch,
        units: args.units.into_iter().collect::<BTreeMap<_, _>>(),
    };

    let result = ctx.runner.run(&request)?;
    let exit_code = result.exit_code();
    if request.options.dry_run {
        Ok(Outcome {
            exit_code,
            ..Outcome::read(result)?
        })
    } else {
        Outcome::write(result, exit_code)
    }
}

fn post_unposted(ctx: &Session, args: PostUnpostedArgs) -> Result<Outcome> {
    let outcome = ctx
        .runner
        .posting()
        .post_unposted(ctx.tenant_id, args.branch, args.date)?;
    Outcome::write(outcome, 0)
}

fn reverse(ctx: &Session, args: ReverseArgs) -> Result<Outcome> {
    let entry = ctx.runner.reversal().reverse(&ReversalRequest {
        tenant_id: ctx.tenant_id,
        asset_id: args.asset,
        entry_id: args.entry,
        reversal_date: args.date.unwrap_or(ctx.today),
        today: ctx.today,
        reason: args.reason,
        actor: ctx.actor,
    })?;
    Outcome::write(entry, 0)
}

fn reverse_period(ctx: &Session, args: ReversePeriodArgs) -> Result<Outcome> {
    if !args.confirm {
        bail!("reverse-period reverses every asset's entry for the period; pass --confirm to proceed");
    }
    let result = ctx.runner.reversal().reverse_period(
        ctx.tenant_id,
        args.date,
        ctx.today,
        &args.reason,
        ctx.actor,
    )?;
    let exit_code = result.exit_code();
    Outcome::write(result, exit_code)
}

fn history(ctx: &Session, args: HistoryArgs) -> Result<Outcome> {
    Outcome::read(ctx.store.history(ctx.tenant_id, args.asset)?)
}
