use super::{ensure_parent_dir, exit_codes, open_store};
use crate::cli::args::{ListArgs, SeedArgs};
use sqlgrade_core::catalog;
use sqlgrade_core::report::console;
use sqlgrade_core::storage::Store;

pub fn run(args: SeedArgs) -> anyhow::Result<i32> {
    ensure_parent_dir(&args.db)?;
    let store = Store::open(&args.db)?;
    store.init_schema()?;

    let report = catalog::seed(&store, &args.problems)?;
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        console::print_seed_report(&report);
    }
    Ok(exit_codes::OK)
}

pub fn list(args: ListArgs) -> anyhow::Result<i32> {
    let store = open_store(&args.db)?;
    let problems = store.list_problems()?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&problems)?);
    } else if problems.is_empty() {
        eprintln!("No problems stored in {}", args.db.display());
    } else {
        console::print_problem_list(&problems);
        let stats = store.stats()?;
        eprintln!(
            "{} problem(s), {} schema script(s), last updated {}",
            stats.problems,
            stats.schemas,
            stats.last_updated_at.as_deref().unwrap_or("never")
        );
    }
    Ok(exit_codes::OK)
}
