use crate::{
    commands::{Commands, EnvArgs, WatermarkCommand},
    error::CliError,
    seed::SeedData,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use chrono::Utc;
use clap::Parser;
use engine_config::{
    flags::{Feature, FeatureFlags},
    rollout::{decide, derive_execution_id, time_bucket},
    settings::EngineSettings,
};
use engine_core::{
    context::env::EnvContext,
    state::WatermarkStore,
    warehouse::memory::MemoryWarehouse,
};
use engine_runtime::execution::factory::{RuntimeParts, create_runner, open_watermarks};
use model::{
    execution::{
        plan::{ExecutionPlan, Variables},
        result::ExecutionStatus,
    },
    state::watermark::WatermarkKey,
};
use planner::graph::DependencyResolver;
use std::{path::Path, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod env;
mod error;
mod seed;
mod shutdown;

#[derive(Parser)]
#[command(name = "sluice", version = "0.1.0", about = "Pipeline execution orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let code = match dispatch(cli.command).await {
        Ok(code) => code,
        Err(CliError::ShutdownRequested) => ExitCode::ShutdownRequested,
        Err(e) => {
            error!("{e}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn dispatch(command: Commands) -> Result<ExitCode, CliError> {
    match command {
        Commands::Flags { env, json } => {
            let flags = FeatureFlags::from_env(&load_env(&env)?)?;
            if json {
                println!("{}", to_json(&flags)?);
            } else {
                print_flags(&flags);
            }
        }
        Commands::Route { steps, env } => {
            let flags = FeatureFlags::from_env(&load_env(&env)?)?;
            let execution_id = derive_execution_id(&steps, time_bucket(Utc::now()));
            let decision = decide(&execution_id, &flags);
            println!("{:<14} {}", "Execution id", execution_id);
            println!("{:<14} {}", "Engine", decision.engine);
            println!("{:<14} {:?}", "Reason", decision.reason);
            if let Some(bucket) = decision.bucket {
                println!("{:<14} {} (rollout {}%)", "Bucket", bucket, flags.rollout_percentage());
            }
        }
        Commands::Order { plan, step } => {
            let plan = read_plan(&plan)?;
            let resolver = DependencyResolver::from_steps(&plan.steps);
            let order = match step {
                Some(id) => resolver.resolve_dependencies(&id)?,
                None => resolver.execution_order(&plan.step_ids())?,
            };
            for (idx, id) in order.iter().enumerate() {
                println!("{:>3}. {id}", idx + 1);
            }
        }
        Commands::Run {
            plan,
            data,
            vars,
            env,
        } => return run(&plan, data.as_deref(), vars.as_deref(), &env).await,
        Commands::Watermark { command, state_dir } => {
            let mut settings = EngineSettings::from_env(&EnvContext::new())?;
            if let Some(dir) = state_dir {
                settings.state_dir = dir;
            }
            let store = open_watermarks(&settings)?;
            watermark(store.as_ref(), command).await?;
        }
    }

    Ok(ExitCode::Success)
}

async fn run(
    plan_path: &Path,
    data: Option<&Path>,
    vars: Option<&Path>,
    env: &EnvArgs,
) -> Result<ExitCode, CliError> {
    let env = load_env(env)?;
    let flags = FeatureFlags::from_env(&env)?;
    let settings = EngineSettings::from_env(&env)?;
    let plan = read_plan(plan_path)?;
    let variables = match vars {
        Some(path) => seed::read_variables(path)?,
        None => Variables::new(),
    };
    let connectors = match data {
        Some(path) => SeedData::read(path)?.into_connectors().await,
        None => SeedData::default().into_connectors().await,
    };

    let parts = RuntimeParts::new(
        Arc::new(MemoryWarehouse::new()),
        Arc::new(connectors),
        open_watermarks(&settings)?,
    )
    .allow_undeclared_sources(flags.is_enabled(Feature::UndeclaredSourceCompat));
    let runner = create_runner(&settings, flags, &parts)?;

    let shutdown = ShutdownCoordinator::new();
    shutdown.register_handlers();

    let output = runner
        .run(&plan, &variables, shutdown.cancel_token())
        .await?;
    println!("{}", to_json(&output.report)?);

    if shutdown.is_shutdown_requested() {
        info!("Run stopped by shutdown request");
        return Err(CliError::ShutdownRequested);
    }
    Ok(match output.report.status() {
        ExecutionStatus::Success => ExitCode::Success,
        _ => ExitCode::RunFailed,
    })
}

async fn watermark(store: &dyn WatermarkStore, command: WatermarkCommand) -> Result<(), CliError> {
    match command {
        WatermarkCommand::List { pipeline, json } => {
            let records = store.list_watermarks(&pipeline).await?;
            if json {
                println!("{}", to_json(&records)?);
            } else if records.is_empty() {
                println!("No watermarks for pipeline '{pipeline}'");
            } else {
                println!("{:<20} {:<16} {:<24} {}", "Source", "Field", "Value", "Updated");
                for r in records {
                    println!(
                        "{:<20} {:<16} {:<24} {}",
                        r.key.source,
                        r.key.cursor_field,
                        r.value.to_string(),
                        r.updated_at.to_rfc3339()
                    );
                }
            }
        }
        WatermarkCommand::Get {
            pipeline,
            source,
            field,
        } => {
            let key = WatermarkKey::new(pipeline, source, field);
            match store.get_watermark(&key).await? {
                Some(value) => println!("{value}"),
                None => println!("No watermark stored for {key}"),
            }
        }
        WatermarkCommand::Clear {
            pipeline,
            source,
            field,
        } => {
            let key = WatermarkKey::new(pipeline, source, field);
            if store.clear_watermark(&key).await? {
                info!(key = %key, "Watermark cleared");
            } else {
                println!("No watermark stored for {key}");
            }
        }
    }
    Ok(())
}

fn load_env(args: &EnvArgs) -> Result<EnvContext, CliError> {
    let mut env = EnvContext::new();
    if let Some(path) = &args.env_file {
        env.merge(env::load_env_file(path)?);
    }
    Ok(env)
}

fn read_plan(path: &Path) -> Result<ExecutionPlan, CliError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(CliError::JsonSerialize)
}

fn print_flags(flags: &FeatureFlags) {
    println!("{:<26} {}", "Environment", flags.environment());
    println!("{:<26} {}%", "Rollout percentage", flags.rollout_percentage());
    for feature in Feature::ALL {
        let state = if flags.is_enabled(feature) { "on" } else { "off" };
        println!("{:<26} {state}", feature.as_str());
    }
}
