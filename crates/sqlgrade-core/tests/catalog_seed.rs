use sqlgrade_core::catalog;
use sqlgrade_core::storage::Store;
use sqlgrade_core::{Mode, Outcome, Verifier};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_problem(root: &Path, dir: &str, files: &[(&str, &str)]) -> anyhow::Result<()> {
    let p = root.join(dir);
    fs::create_dir_all(&p)?;
    for (name, body) in files {
        fs::write(p.join(name), body)?;
    }
    Ok(())
}

fn sample_tree(root: &Path) -> anyhow::Result<()> {
    write_problem(
        root,
        "second_highest_salary",
        &[
            ("description.md", "Find the second highest salary."),
            ("solution_explanation.md", "Use a subquery."),
            (
                "solution.sql",
                "SELECT max(salary) FROM employee WHERE salary < (SELECT max(salary) FROM employee)",
            ),
            ("schema_01_table.sql", "CREATE TABLE employee (id INTEGER, salary INTEGER);"),
            ("schema_02_rows.sql", "INSERT INTO employee VALUES (1, 100), (2, 200), (3, 300);"),
        ],
    )?;
    write_problem(
        root,
        "constant_answer",
        &[
            ("description.md", "Return the number one."),
            ("solution.sql", "SELECT 1"),
        ],
    )?;
    write_problem(
        root,
        "unfinished",
        &[("description.md", "Work in progress.")],
    )?;
    Ok(())
}

#[test]
fn test_seed_report_and_reseed() -> anyhow::Result<()> {
    let content = tempdir()?;
    sample_tree(content.path())?;

    let store = Store::memory()?;
    store.init_schema()?;

    let report = catalog::seed(&store, content.path())?;
    assert_eq!(report.created, vec!["Constant Answer", "Second Highest Salary"]);
    assert!(report.updated.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].title, "Unfinished");
    assert!(report.skipped[0].reason.contains("solution.sql"));

    let again = catalog::seed(&store, content.path())?;
    assert!(again.created.is_empty());
    assert_eq!(again.unchanged.len(), 2);

    fs::write(
        content.path().join("constant_answer/solution.sql"),
        "SELECT 1 AS one",
    )?;
    let third = catalog::seed(&store, content.path())?;
    assert_eq!(third.updated, vec!["Constant Answer"]);
    assert_eq!(third.unchanged, vec!["Second Highest Salary"]);
    Ok(())
}

#[test]
fn test_seeded_problem_verifies() -> anyhow::Result<()> {
    let content = tempdir()?;
    sample_tree(content.path())?;
    let store = Store::memory()?;
    store.init_schema()?;
    catalog::seed(&store, content.path())?;

    let problem = store
        .resolve("second highest salary")?
        .expect("seeded problem");
    assert_eq!(problem.schemas.len(), 2);
    assert_eq!(problem.solution_explanation, "Use a subquery.");

    let outcome = Verifier::default().verify(
        &problem,
        "SELECT salary FROM employee ORDER BY salary DESC LIMIT 1 OFFSET 1",
        Mode::Submit,
    );
    assert!(matches!(outcome, Outcome::Verdict { correct: true, .. }));

    let constant = store.resolve("Constant Answer")?.expect("seeded problem");
    assert!(constant.schemas.is_empty());
    assert_eq!(constant.solution_explanation, "");
    Ok(())
}

#[test]
fn test_missing_root_is_an_error() {
    let store = Store::memory().unwrap();
    store.init_schema().unwrap();
    let err = catalog::seed(&store, Path::new("/definitely/not/here")).unwrap_err();
    assert!(err.to_string().contains("problem directory not found"));
}
