use rusqlite::Connection;
use sqlgrade_core::config::{EngineConfig, ScratchTarget};
use sqlgrade_core::model::{ProblemDraft, SchemaScript, Solution};
use sqlgrade_core::storage::Store;
use sqlgrade_core::{Mode, Outcome, Verifier};
use std::sync::Arc;
use tempfile::tempdir;

fn orders_draft() -> ProblemDraft {
    ProblemDraft {
        title: "Big Orders".into(),
        description: "Orders over 100.".into(),
        solution_explanation: String::new(),
        schemas: vec![
            SchemaScript::new(0, "CREATE TABLE orders (id INTEGER PRIMARY KEY, total REAL);"),
            SchemaScript::new(1, "INSERT INTO orders VALUES (1, 50.0), (2, 150.0), (3, 250.5);"),
        ],
        solution: Some(Solution {
            query: "SELECT id FROM orders WHERE total > 100".into(),
        }),
    }
}

#[test]
fn test_store_file_untouched_by_verification() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("problems.db");

    let store = Store::open(&db_path)?;
    store.init_schema()?;
    let (id, _) = store.upsert_problem(&orders_draft())?;
    let problem = store.get_problem(id)?.expect("problem stored");
    drop(store);

    let before = std::fs::read(&db_path)?;

    let verifier = Verifier::default();
    for q in [
        "SELECT id FROM orders WHERE total > 100",
        "SELECT * FROM orders",
        "SELECT nope FROM orders",
        "UPDATE orders SET total = 0",
    ] {
        let _ = verifier.verify(&problem, q, Mode::Run);
        let _ = verifier.verify(&problem, q, Mode::Submit);
    }

    let after = std::fs::read(&db_path)?;
    assert_eq!(before, after, "problem store changed during verification");
    Ok(())
}

#[test]
fn test_file_scratch_is_rolled_back() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let scratch = dir.path().join("scratch.db");
    let verifier = Verifier::new(EngineConfig {
        scratch: ScratchTarget::File {
            path: scratch.clone(),
        },
        ..EngineConfig::default()
    });
    let problem = orders_draft().into_problem(1);

    let outcome = verifier.verify(&problem, "SELECT id FROM orders WHERE total > 99", Mode::Submit);
    assert!(matches!(outcome, Outcome::Verdict { correct: true, .. }));

    // a failing schema leaves nothing behind either
    let mut broken = orders_draft().into_problem(2);
    broken.schemas.push(SchemaScript::new(2, "INSERT INTO missing VALUES (1);"));
    assert!(verifier.verify(&broken, "SELECT 1", Mode::Run).is_error());

    let conn = Connection::open(&scratch)?;
    assert!(sqlgrade_core::sandbox::user_tables(&conn)?.is_empty());
    Ok(())
}

#[test]
fn test_calls_do_not_see_each_other() -> anyhow::Result<()> {
    let verifier = Verifier::default();
    let problem = orders_draft().into_problem(1);

    // A leaked table from an earlier call would make the second CREATE fail.
    for _ in 0..3 {
        let res = verifier.run(&problem, "SELECT count(*) FROM orders")?;
        assert_eq!(res.rows[0][0], sqlgrade_core::model::Value::Integer(3));
    }
    Ok(())
}

#[test]
fn test_concurrent_verifications_are_independent() {
    let dir = tempdir().unwrap();
    for scratch in [
        ScratchTarget::Memory,
        ScratchTarget::File {
            path: dir.path().join("shared.db"),
        },
    ] {
        let verifier = Arc::new(Verifier::new(EngineConfig {
            scratch,
            ..EngineConfig::default()
        }));
        let problem = Arc::new(orders_draft().into_problem(1));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let verifier = verifier.clone();
                let problem = problem.clone();
                std::thread::spawn(move || {
                    let q = if i % 2 == 0 {
                        "SELECT id FROM orders WHERE total >= 150"
                    } else {
                        "SELECT id FROM orders"
                    };
                    (i, verifier.verify(&problem, q, Mode::Submit))
                })
            })
            .collect();

        for h in handles {
            let (i, outcome) = h.join().unwrap();
            match outcome {
                Outcome::Verdict { correct, .. } => assert_eq!(correct, i % 2 == 0),
                other => panic!("call {i} failed: {other:?}"),
            }
        }
    }
}

#[test]
fn test_commit_in_schema_script_leaves_file_scratch_clean() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let scratch = dir.path().join("scratch.db");
    let verifier = Verifier::new(EngineConfig {
        scratch: ScratchTarget::File {
            path: scratch.clone(),
        },
        ..EngineConfig::default()
    });

    let mut leaky = orders_draft().into_problem(1);
    leaky.schemas = vec![SchemaScript::new(0, "CREATE TABLE leak (x); COMMIT;")];
    match verifier.verify(&leaky, "SELECT 1", Mode::Run) {
        Outcome::Error { subtype, .. } => {
            assert_eq!(subtype, sqlgrade_core::errors::ErrorKind::Schema)
        }
        other => panic!("expected schema error, got {other:?}"),
    }

    {
        let conn = Connection::open(&scratch)?;
        assert!(sqlgrade_core::sandbox::user_tables(&conn)?.is_empty());
    }

    // a later problem creating the same table is unaffected
    let mut clean = orders_draft().into_problem(2);
    clean.schemas = vec![SchemaScript::new(0, "CREATE TABLE leak (x); INSERT INTO leak VALUES (7);")];
    let res = verifier.run(&clean, "SELECT x FROM leak")?;
    assert_eq!(res.rows, vec![vec![sqlgrade_core::model::Value::Integer(7)]]);
    Ok(())
}
