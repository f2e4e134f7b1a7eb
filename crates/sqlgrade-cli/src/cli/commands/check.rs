use super::{engine_config, exit_codes, open_store};
use crate::cli::args::CheckArgs;
use sqlgrade_core::engine::batch::{check_problems, CheckStatus};
use sqlgrade_core::report::console;
use sqlgrade_core::Verifier;
use std::sync::Arc;

pub async fn run(args: CheckArgs) -> anyhow::Result<i32> {
    let cfg = engine_config(&args.engine)?;
    let store = open_store(&args.db)?;
    let problems = store.all_problems()?;

    let checks = check_problems(Arc::new(Verifier::new(cfg)), problems, args.parallel).await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&checks)?);
    } else {
        console::print_checks(&checks);
    }

    if checks.iter().any(|c| c.status == CheckStatus::Broken) {
        Ok(exit_codes::CONFIG_ERROR)
    } else {
        Ok(exit_codes::OK)
    }
}
