use crate::model::{Problem, ProblemDraft, SchemaScript, Solution};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Persistent problem definitions. The verification engine never writes
/// here; callers load a [`Problem`] and hand it to the verifier.
#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedAction {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProblemSummary {
    pub id: i64,
    pub title: String,
    pub schema_count: u32,
    pub has_solution: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub problems: u64,
    pub schemas: u64,
    pub solutions: u64,
    pub last_updated_at: Option<String>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("problem store lock poisoned"))
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    /// Creates or updates the problem with the draft's title, replacing its
    /// schema scripts and solution. Content identical to what is stored is
    /// left untouched.
    pub fn upsert_problem(&self, draft: &ProblemDraft) -> anyhow::Result<(i64, SeedAction)> {
        let fp = crate::fingerprint::compute(draft);
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, content_sha256 FROM problems WHERE title = ?1",
                params![draft.title],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

        let updated_at = chrono::Utc::now().to_rfc3339();
        let (id, action) = match existing {
            Some((id, sha)) if sha == fp.hex => return Ok((id, SeedAction::Unchanged)),
            Some((id, _)) => {
                tx.execute(
                    "UPDATE problems
                     SET description = ?1, solution_explanation = ?2, content_sha256 = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![
                        draft.description,
                        draft.solution_explanation,
                        fp.hex,
                        updated_at,
                        id
                    ],
                )?;
                tx.execute("DELETE FROM schemas WHERE problem_id = ?1", params![id])?;
                tx.execute("DELETE FROM solutions WHERE problem_id = ?1", params![id])?;
                (id, SeedAction::Updated)
            }
            None => {
                tx.execute(
                    "INSERT INTO problems(title, description, solution_explanation, content_sha256, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        draft.title,
                        draft.description,
                        draft.solution_explanation,
                        fp.hex,
                        updated_at
                    ],
                )?;
                (tx.last_insert_rowid(), SeedAction::Created)
            }
        };

        {
            let mut stmt =
                tx.prepare("INSERT INTO schemas(problem_id, script, ord) VALUES (?1, ?2, ?3)")?;
            for s in &draft.schemas {
                stmt.execute(params![id, s.script, s.order])
                    .with_context(|| format!("failed to store schema script {}", s.order))?;
            }
        }

        if let Some(sol) = &draft.solution {
            tx.execute(
                "INSERT INTO solutions(problem_id, query) VALUES (?1, ?2)",
                params![id, sol.query],
            )?;
        }

        tx.commit()?;
        Ok((id, action))
    }

    pub fn get_problem(&self, id: i64) -> anyhow::Result<Option<Problem>> {
        let conn = self.conn()?;
        load_problem(&conn, "id = ?1", params![id])
    }

    /// Looks a problem up by title, ignoring case.
    pub fn find_problem(&self, title: &str) -> anyhow::Result<Option<Problem>> {
        let conn = self.conn()?;
        load_problem(&conn, "title = ?1 COLLATE NOCASE", params![title.trim()])
    }

    /// Resolves a numeric id or, failing that, a title.
    pub fn resolve(&self, id_or_title: &str) -> anyhow::Result<Option<Problem>> {
        match id_or_title.trim().parse::<i64>() {
            Ok(id) => self.get_problem(id),
            Err(_) => self.find_problem(id_or_title),
        }
    }

    pub fn list_problems(&self) -> anyhow::Result<Vec<ProblemSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.title,
                    (SELECT count(*) FROM schemas s WHERE s.problem_id = p.id),
                    EXISTS (SELECT 1 FROM solutions x WHERE x.problem_id = p.id AND trim(x.query) <> '')
             FROM problems p
             ORDER BY p.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProblemSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                schema_count: row.get(2)?,
                has_solution: row.get(3)?,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn all_problems(&self) -> anyhow::Result<Vec<Problem>> {
        let ids: Vec<i64> = self.list_problems()?.into_iter().map(|p| p.id).collect();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.get_problem(id)? {
                out.push(p);
            }
        }
        Ok(out)
    }

    pub fn stats(&self) -> anyhow::Result<StoreStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> anyhow::Result<u64> {
            let n: i64 =
                conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?;
            Ok(n as u64)
        };
        Ok(StoreStats {
            problems: count("problems")?,
            schemas: count("schemas")?,
            solutions: count("solutions")?,
            last_updated_at: conn.query_row("SELECT max(updated_at) FROM problems", [], |r| {
                r.get(0)
            })?,
        })
    }
}

fn load_problem(
    conn: &Connection,
    filter: &str,
    args: impl rusqlite::Params,
) -> anyhow::Result<Option<Problem>> {
    let head = conn
        .query_row(
            &format!(
                "SELECT id, title, description, solution_explanation FROM problems WHERE {filter}"
            ),
            args,
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((id, title, description, solution_explanation)) = head else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT ord, script FROM schemas WHERE problem_id = ?1 ORDER BY ord")?;
    let schemas = stmt
        .query_map(params![id], |r| Ok(SchemaScript::new(r.get(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let solution = conn
        .query_row(
            "SELECT query FROM solutions WHERE problem_id = ?1",
            params![id],
            |r| r.get::<_, String>(0),
        )
        .optional()?
        .map(|query| Solution { query });

    Ok(Some(Problem {
        id,
        title,
        description,
        solution_explanation,
        schemas,
        solution,
    }))
}
