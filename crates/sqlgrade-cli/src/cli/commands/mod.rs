use crate::cli::args::{Cli, Command, EngineArgs};
use sqlgrade_core::config::{load_config, EngineConfig};
use sqlgrade_core::storage::Store;
use std::path::Path;

pub mod check;
pub mod init;
pub mod seed;
pub mod verify;

pub mod exit_codes {
    pub const OK: i32 = 0;
    /// Wrong answer, or the candidate query itself failed.
    pub const INCORRECT: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Init(args) => init::run(args),
        Command::Seed(args) => seed::run(args),
        Command::List(args) => seed::list(args),
        Command::Run(args) => verify::run(args, sqlgrade_core::Mode::Run).await,
        Command::Submit(args) => verify::run(args, sqlgrade_core::Mode::Submit).await,
        Command::Check(args) => check::run(args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

/// Loads the engine config: file if present, defaults otherwise, then
/// environment and flag overrides.
pub(crate) fn engine_config(args: &EngineArgs) -> anyhow::Result<EngineConfig> {
    let mut cfg = if args.config.exists() {
        load_config(&args.config, args.strict_config)?
    } else {
        tracing::debug!(
            event = "sqlgrade.cli.config_defaults",
            path = %args.config.display(),
            "config file not found, using defaults"
        );
        EngineConfig::default()
    };
    cfg.apply_env()?;
    if let Some(ms) = args.timeout_ms {
        anyhow::ensure!(ms > 0, "config error: --timeout-ms must be greater than zero");
        cfg.statement_timeout_ms = ms;
    }
    Ok(cfg)
}

/// Opens an existing problem store. Commands that read never create one.
pub(crate) fn open_store(db: &Path) -> anyhow::Result<Store> {
    if !db.exists() {
        anyhow::bail!(
            "problem store not found: {} (run `sqlgrade seed` first)",
            db.display()
        );
    }
    let store = Store::open(db)?;
    store.init_schema()?;
    Ok(store)
}

pub(crate) fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
