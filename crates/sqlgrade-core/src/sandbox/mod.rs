//! Scratch namespace plumbing shared by the schema materializer and the
//! query executor.
//!
//! A verification call owns one [`Scratch`] connection for its whole
//! lifetime. Everything it does happens inside a single transaction on that
//! connection, which the orchestrator always rolls back.

use crate::config::{EngineConfig, ScratchTarget};
use crate::errors::VerifyError;
use rusqlite::hooks::{AuthAction, AuthContext, Authorization};
use rusqlite::Connection;
use std::time::{Duration, Instant};

pub mod executor;
pub mod schema;

/// Number of SQLite VM instructions between deadline checks.
const PROGRESS_OPS: i32 = 1_000;

/// An exclusively owned connection to the scratch database.
pub struct Scratch {
    conn: Connection,
}

impl Scratch {
    pub fn open(cfg: &EngineConfig) -> Result<Self, VerifyError> {
        let conn = match &cfg.scratch {
            ScratchTarget::Memory => Connection::open_in_memory(),
            ScratchTarget::File { path } => Connection::open(path),
        }
        .map_err(|e| VerifyError::Sandbox(format!("failed to open scratch database: {e}")))?;

        // Writers on a shared scratch file queue up instead of failing fast.
        conn.busy_timeout(cfg.statement_timeout())?;
        if cfg.foreign_keys {
            conn.execute("PRAGMA foreign_keys = ON", [])?;
        }
        Ok(Self { conn })
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

/// Interrupts statements on `conn` once `limit` has elapsed. The handler is
/// removed when the guard drops.
pub(crate) struct Deadline<'c> {
    conn: &'c Connection,
    limit: Duration,
    started: Instant,
}

impl<'c> Deadline<'c> {
    pub(crate) fn arm(conn: &'c Connection, limit: Duration) -> Self {
        let started = Instant::now();
        let deadline = started + limit;
        conn.progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));
        Self {
            conn,
            limit,
            started,
        }
    }

    /// True when an interrupted statement was stopped by this deadline.
    pub(crate) fn expired(&self, err: &rusqlite::Error) -> bool {
        is_interrupt(err) && self.started.elapsed() >= self.limit
    }

    pub(crate) fn limit(&self) -> Duration {
        self.limit
    }
}

impl Drop for Deadline<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

/// Denies statements that would escape the call's transaction (`BEGIN`,
/// `COMMIT`, `ROLLBACK`, `END`) or reach another database file (`ATTACH`,
/// `DETACH`) while it is alive. Denied statements fail to prepare, so
/// nothing they would have done takes effect.
pub(crate) struct TransactionFence<'c> {
    conn: &'c Connection,
}

impl<'c> TransactionFence<'c> {
    pub(crate) fn arm(conn: &'c Connection) -> Self {
        conn.authorizer(Some(|ctx: AuthContext<'_>| match ctx.action {
            AuthAction::Transaction { .. } | AuthAction::Attach { .. } | AuthAction::Detach { .. } => {
                Authorization::Deny
            }
            _ => Authorization::Allow,
        }));
        Self { conn }
    }

    /// True when `err` came from a statement this fence denied.
    pub(crate) fn denied(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::AuthorizationForStatementDenied
        )
    }
}

impl Drop for TransactionFence<'_> {
    fn drop(&mut self) {
        self.conn
            .authorizer(None::<fn(AuthContext<'_>) -> Authorization>);
    }
}

fn is_interrupt(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::OperationInterrupted
    )
}

/// Lists user tables in the connection's main schema.
pub fn user_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
    rows.collect()
}
