use super::{Deadline, TransactionFence};
use crate::errors::QueryFailure;
use crate::model::{ExecutionResult, Value};
use rusqlite::Connection;
use std::time::Duration;

/// The only capability untrusted query text is given: run one statement and
/// hand back what it produced.
pub trait QueryExecutor {
    fn execute(&self, query: &str) -> Result<ExecutionResult, QueryFailure>;
}

/// Leading keywords accepted as read-only statement forms.
const READ_ONLY_KEYWORDS: &[&str] = &["select", "with"];

/// Checks that `query` is non-empty and starts with `SELECT` or `WITH`.
/// Returns the trimmed text to execute.
pub fn validate_read_only(query: &str) -> Result<&str, String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err("query is empty".into());
    }

    let keyword: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if !READ_ONLY_KEYWORDS
        .iter()
        .any(|k| keyword.eq_ignore_ascii_case(k))
    {
        return Err("only SELECT or WITH queries are allowed".into());
    }
    Ok(trimmed)
}

/// Executes queries on a connection whose transaction the caller owns.
pub struct SqliteExecutor<'c> {
    conn: &'c Connection,
    timeout: Duration,
}

impl<'c> SqliteExecutor<'c> {
    pub fn new(conn: &'c Connection, timeout: Duration) -> Self {
        Self { conn, timeout }
    }
}

impl QueryExecutor for SqliteExecutor<'_> {
    fn execute(&self, query: &str) -> Result<ExecutionResult, QueryFailure> {
        let sql = validate_read_only(query).map_err(QueryFailure::NotReadOnly)?;

        let _fence = TransactionFence::arm(self.conn);
        let deadline = Deadline::arm(self.conn, self.timeout);
        let failure = |e: rusqlite::Error| {
            if deadline.expired(&e) {
                QueryFailure::Timeout(deadline.limit())
            } else {
                QueryFailure::Database(e.to_string())
            }
        };

        let mut stmt = self.conn.prepare(sql).map_err(failure)?;
        if !stmt.readonly() {
            return Err(QueryFailure::NotReadOnly(
                "query would modify the database".into(),
            ));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let arity = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([]).map_err(failure)?;
        while let Some(row) = cursor.next().map_err(failure)? {
            let mut values = Vec::with_capacity(arity);
            for i in 0..arity {
                let v: rusqlite::types::Value = row.get(i).map_err(failure)?;
                values.push(Value::from(v));
            }
            rows.push(values);
        }

        Ok(ExecutionResult { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER, name TEXT);
             INSERT INTO users VALUES (2, 'b'), (1, 'a');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_validate_accepts_select_and_with_any_case() {
        assert_eq!(validate_read_only("  select 1 \n").unwrap(), "select 1");
        assert!(validate_read_only("WITH x AS (SELECT 1) SELECT * FROM x").is_ok());
        assert!(validate_read_only("SeLeCt*from t").is_ok());
    }

    #[test]
    fn test_validate_rejects_writes_and_empty() {
        assert_eq!(validate_read_only("   ").unwrap_err(), "query is empty");
        assert!(validate_read_only("DELETE FROM users").is_err());
        assert!(validate_read_only("selection FROM t").is_err());
        assert!(validate_read_only("(SELECT 1)").is_err());
    }

    #[test]
    fn test_captures_columns_and_native_row_order() {
        let conn = seeded();
        let exec = SqliteExecutor::new(&conn, Duration::from_secs(5));
        let res = exec.execute("SELECT name AS n, id FROM users").unwrap();
        assert_eq!(res.columns, vec!["n", "id"]);
        assert_eq!(
            res.rows,
            vec![
                vec![Value::Text("b".into()), Value::Integer(2)],
                vec![Value::Text("a".into()), Value::Integer(1)],
            ]
        );
    }

    #[test]
    fn test_database_error_is_verbatim() {
        let conn = seeded();
        let exec = SqliteExecutor::new(&conn, Duration::from_secs(5));
        let err = exec.execute("SELECT * FROM orders").unwrap_err();
        assert_eq!(err, QueryFailure::Database("no such table: orders".into()));
    }

    #[test]
    fn test_cte_wrapped_delete_is_not_read_only() {
        let conn = seeded();
        let exec = SqliteExecutor::new(&conn, Duration::from_secs(5));
        let err = exec
            .execute("WITH doomed AS (SELECT 1) DELETE FROM users")
            .unwrap_err();
        assert!(matches!(err, QueryFailure::NotReadOnly(_)));
        let n: i64 = conn
            .query_row("SELECT count(*) FROM users", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_runaway_query_times_out() {
        let conn = seeded();
        let exec = SqliteExecutor::new(&conn, Duration::from_millis(50));
        let err = exec
            .execute(
                "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n) \
                 SELECT count(*) FROM n",
            )
            .unwrap_err();
        assert_eq!(err, QueryFailure::Timeout(Duration::from_millis(50)));
    }

    #[test]
    fn test_handler_removed_after_execution() {
        let conn = seeded();
        {
            let exec = SqliteExecutor::new(&conn, Duration::from_millis(1));
            let _ = exec.execute("SELECT 1");
        }
        std::thread::sleep(Duration::from_millis(5));
        // Without the guard's cleanup this would be interrupted.
        let n: i64 = conn
            .query_row(
                "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 50000) \
                 SELECT count(*) FROM n",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(n, 50000);
    }
}
