use super::{engine_config, exit_codes, open_store};
use crate::cli::args::VerifyArgs;
use anyhow::Context;
use sqlgrade_core::report::console;
use sqlgrade_core::{Mode, Outcome, Verifier, VerifyError};
use std::io::Read;

pub async fn run(args: VerifyArgs, mode: Mode) -> anyhow::Result<i32> {
    let cfg = engine_config(&args.engine)?;
    let store = open_store(&args.db)?;
    let problem = store
        .resolve(&args.problem)?
        .with_context(|| format!("problem not found: {}", args.problem))?;
    let query = read_query(&args)?;

    tracing::info!(
        event = "sqlgrade.cli.verify",
        problem_id = problem.id,
        mode = mode.as_str(),
        query_bytes = query.len(),
    );

    let verifier = Verifier::new(cfg);
    let res =
        tokio::task::spawn_blocking(move || verifier.try_verify(&problem, &query, mode)).await?;

    let code = exit_code(&res);
    let outcome = res.unwrap_or_else(Outcome::from);

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        console::print_outcome(&outcome);
    }
    Ok(code)
}

fn exit_code(res: &Result<Outcome, VerifyError>) -> i32 {
    match res {
        Ok(Outcome::Verdict { correct: false, .. }) => exit_codes::INCORRECT,
        Ok(_) => exit_codes::OK,
        Err(e) if e.is_system_fault() => exit_codes::CONFIG_ERROR,
        Err(VerifyError::SolutionMissing { .. }) => exit_codes::CONFIG_ERROR,
        Err(_) => exit_codes::INCORRECT,
    }
}

fn read_query(args: &VerifyArgs) -> anyhow::Result<String> {
    if let Some(q) = &args.query {
        return Ok(q.clone());
    }
    match args.query_file.as_deref() {
        Some(p) if p.as_os_str() == "-" => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read query from stdin")?;
            Ok(buf)
        }
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("failed to read query file {}", p.display())),
        None => anyhow::bail!("either --query or --query-file is required"),
    }
}
