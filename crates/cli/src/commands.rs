use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Clone, Default)]
pub struct EnvArgs {
    #[arg(long, help = "Dotenv file whose SLUICE_* values override the process environment")]
    pub env_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the resolved feature flags
    Flags {
        #[command(flatten)]
        env: EnvArgs,

        #[arg(long, help = "Print as JSON instead of a table")]
        json: bool,
    },
    /// Show which engine a set of step ids would be routed to right now
    Route {
        #[arg(long, value_delimiter = ',', required = true, help = "Comma-separated step ids")]
        steps: Vec<String>,

        #[command(flatten)]
        env: EnvArgs,
    },
    /// Print the dependency order of a plan, or the closure of one step
    Order {
        #[arg(long, help = "Execution plan JSON file")]
        plan: PathBuf,

        #[arg(long, help = "Only resolve the dependencies of this step")]
        step: Option<String>,
    },
    /// Execute a plan against in-memory collaborators seeded from a JSON file
    Run {
        #[arg(long, help = "Execution plan JSON file")]
        plan: PathBuf,

        #[arg(long, help = "Seed data JSON file: {\"<connector>\": {\"<object>\": [rows]}}")]
        data: Option<PathBuf>,

        #[arg(long, help = "Run variables JSON object")]
        vars: Option<PathBuf>,

        #[command(flatten)]
        env: EnvArgs,
    },
    Watermark {
        #[command(subcommand)]
        command: WatermarkCommand,

        #[arg(long, global = true, help = "State directory (defaults to SLUICE_STATE_DIR or ~/.sluice/state)")]
        state_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum WatermarkCommand {
    List {
        #[arg(long)]
        pipeline: String,

        #[arg(long, help = "Print as JSON instead of a table")]
        json: bool,
    },
    Get {
        #[arg(long)]
        pipeline: String,

        #[arg(long)]
        source: String,

        #[arg(long, help = "Cursor field")]
        field: String,
    },
    Clear {
        #[arg(long)]
        pipeline: String,

        #[arg(long)]
        source: String,

        #[arg(long, help = "Cursor field")]
        field: String,
    },
}
