use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sqlgrade",
    version,
    about = "Run and grade SQL practice queries in a throwaway sandbox"
)]
pub struct Cli {
    /// Log filter (tracing EnvFilter syntax), e.g. `info` or `sqlgrade_core=debug`
    #[arg(long, global = true, env = "SQLGRADE_LOG", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample engine config
    Init(InitArgs),
    /// Load problem directories into the problem store
    Seed(SeedArgs),
    /// List stored problems
    List(ListArgs),
    /// Execute a query against a problem's dataset and show the rows
    Run(VerifyArgs),
    /// Execute a query and judge it against the problem's solution
    Submit(VerifyArgs),
    /// Submit every problem's own solution and report broken problems
    Check(CheckArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "sqlgrade.yaml")]
    pub config: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SeedArgs {
    /// Directory holding one sub-directory per problem
    #[arg(long, default_value = "problems")]
    pub problems: PathBuf,

    #[arg(long, default_value = ".sqlgrade/problems.db")]
    pub db: PathBuf,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json
}

#[derive(clap::Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, default_value = ".sqlgrade/problems.db")]
    pub db: PathBuf,

    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Problem id or title
    #[arg(long)]
    pub problem: String,

    #[arg(long, conflicts_with = "query_file", required_unless_present = "query_file")]
    pub query: Option<String>,

    /// Read the query from a file (`-` for stdin)
    #[arg(long)]
    pub query_file: Option<PathBuf>,

    #[arg(long, default_value = ".sqlgrade/problems.db")]
    pub db: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(long, default_value = ".sqlgrade/problems.db")]
    pub db: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Number of problems verified at once
    #[arg(long, default_value_t = sqlgrade_core::engine::batch::DEFAULT_PARALLEL)]
    pub parallel: usize,

    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct EngineArgs {
    #[arg(long, default_value = "sqlgrade.yaml")]
    pub config: PathBuf,

    /// Fail on unknown config keys instead of warning
    #[arg(long)]
    pub strict_config: bool,

    /// Override statement_timeout_ms from the config file
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}
