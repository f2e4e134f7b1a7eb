use sqlgrade_core::engine::batch::{check_problems, CheckStatus};
use sqlgrade_core::model::{Problem, SchemaScript, Solution};
use sqlgrade_core::Verifier;
use std::sync::Arc;

fn problem(id: i64, schemas: Vec<SchemaScript>, solution: Option<&str>) -> Problem {
    Problem {
        id,
        title: format!("Problem {id}"),
        description: String::new(),
        solution_explanation: String::new(),
        schemas,
        solution: solution.map(|q| Solution { query: q.into() }),
    }
}

#[tokio::test]
async fn test_check_problems_classifies_each_problem() -> anyhow::Result<()> {
    let table = || vec![SchemaScript::new(0, "CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1), (2);")];
    let problems = vec![
        problem(1, table(), Some("SELECT x FROM t")),
        problem(2, table(), None),
        problem(3, vec![SchemaScript::new(0, "CREATE TABLE")], Some("SELECT 1")),
        problem(4, table(), Some("SELECT y FROM t")),
        problem(5, table(), Some("DELETE FROM t")),
        problem(6, table(), Some("SELECT random()")),
    ];

    let checks = check_problems(Arc::new(Verifier::default()), problems, 2).await?;
    let statuses: Vec<_> = checks.iter().map(|c| (c.problem_id, c.status)).collect();
    assert_eq!(
        statuses,
        vec![
            (1, CheckStatus::Ok),
            (2, CheckStatus::Warn),
            (3, CheckStatus::Broken),
            (4, CheckStatus::Broken),
            (5, CheckStatus::Broken),
            (6, CheckStatus::Broken),
        ]
    );

    assert_eq!(checks[0].message, "reference returns 2 row(s)");
    assert!(checks[2].message.contains("order 0"));
    assert!(checks[3].message.contains("no such column: y"));
    assert!(checks[4].message.starts_with("reference is not a read-only query"));
    assert!(checks[5].message.contains("not stable"));
    Ok(())
}

#[tokio::test]
async fn test_check_problems_empty() -> anyhow::Result<()> {
    let checks = check_problems(Arc::new(Verifier::default()), vec![], 0).await?;
    assert!(checks.is_empty());
    Ok(())
}
