use crate::catalog::SeedReport;
use crate::engine::batch::{CheckStatus, ProblemCheck};
use crate::model::{ExecutionResult, Outcome};
use crate::storage::ProblemSummary;

/// Longest cell rendered before truncation.
const MAX_CELL: usize = 40;

pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Results { result } => {
            print_table(result);
        }
        Outcome::Verdict { correct, result } => {
            if *correct {
                eprintln!("✅ Correct! Your solution is accurate.");
            } else {
                eprintln!("❌ Incorrect. The results did not match the expected solution.");
            }
            print_table(result);
        }
        Outcome::Error {
            subtype,
            message,
            result,
        } => {
            let label = match subtype {
                crate::errors::ErrorKind::Validation => "Invalid query",
                crate::errors::ErrorKind::Schema => "Problem setup error",
                crate::errors::ErrorKind::Query => "Database error",
                crate::errors::ErrorKind::SolutionMissing => "No solution",
                crate::errors::ErrorKind::Sandbox => "Sandbox error",
            };
            eprintln!("✖ {}: {}", label, message);
            if let Some(r) = result {
                print_table(r);
            }
        }
    }
}

/// Renders a result set as a plain text table on stdout.
pub fn print_table(result: &ExecutionResult) {
    print!("{}", render_table(result));
}

pub fn render_table(result: &ExecutionResult) -> String {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| truncate(&v.to_string())).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let line = |cols: &[String]| -> String {
        cols.iter()
            .enumerate()
            .map(|(i, c)| format!("{:<width$}", c, width = widths.get(i).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    out.push_str(line(&result.columns).trim_end());
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &cells {
        out.push_str(line(row).trim_end());
        out.push('\n');
    }
    out.push_str(&format!(
        "({} row{})\n",
        result.rows.len(),
        if result.rows.len() == 1 { "" } else { "s" }
    ));
    out
}

fn truncate(s: &str) -> String {
    if s.chars().count() > MAX_CELL {
        let head: String = s.chars().take(MAX_CELL - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

pub fn print_checks(checks: &[ProblemCheck]) {
    let mut ok = 0;
    let mut warn = 0;
    let mut broken = 0;

    eprintln!("\nChecking {} problems...", checks.len());
    for c in checks {
        let duration = format!("({:.1}s)", c.duration_ms as f64 / 1000.0);
        let label = format!("#{} {}", c.problem_id, c.title);
        match c.status {
            CheckStatus::Ok => {
                ok += 1;
                eprintln!("✅ {:<40} {}", label, duration);
            }
            CheckStatus::Warn => {
                warn += 1;
                eprintln!("⚠️  {:<40} {}", label, duration);
                eprintln!("    {}", c.message);
            }
            CheckStatus::Broken => {
                broken += 1;
                eprintln!("❌ {:<40} {}", label, duration);
                eprintln!("    {}", c.message);
            }
        }
    }

    eprintln!(
        "\nSummary: {} ok, {} warnings, {} broken",
        ok, warn, broken
    );
}

pub fn print_seed_report(report: &SeedReport) {
    for t in &report.created {
        eprintln!("  created   {}", t);
    }
    for t in &report.updated {
        eprintln!("  updated   {}", t);
    }
    for t in &report.unchanged {
        eprintln!("  unchanged {}", t);
    }
    for s in &report.skipped {
        eprintln!("  skipped   {} ({})", s.title, s.reason);
    }
    eprintln!(
        "Seeded {} problem(s): {} created, {} updated, {} unchanged, {} skipped",
        report.created.len() + report.updated.len() + report.unchanged.len(),
        report.created.len(),
        report.updated.len(),
        report.unchanged.len(),
        report.skipped.len()
    );
}

pub fn print_problem_list(problems: &[ProblemSummary]) {
    for p in problems {
        println!(
            "{:>4}  {:<40} {} schema script{}{}",
            p.id,
            p.title,
            p.schema_count,
            if p.schema_count == 1 { "" } else { "s" },
            if p.has_solution { "" } else { "  (no solution)" }
        );
    }
}
