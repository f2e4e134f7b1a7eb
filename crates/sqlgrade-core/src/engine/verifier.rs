use crate::compare::{self, RowDiff};
use crate::config::EngineConfig;
use crate::errors::{QueryFailure, VerifyError};
use crate::model::{ExecutionResult, Mode, Outcome, Problem, Verdict};
use crate::sandbox::executor::{validate_read_only, QueryExecutor, SqliteExecutor};
use crate::sandbox::{schema, Scratch};
use rusqlite::{Connection, DropBehavior, TransactionBehavior};
use std::time::Instant;

/// Result of a submit-mode verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub verdict: Verdict,
    /// What the candidate query produced, for display regardless of verdict.
    pub candidate: ExecutionResult,
    pub diff: RowDiff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    SchemaLoaded,
    CandidateExecuted,
    ReferenceExecuted,
    Compared,
}

impl Stage {
    fn advance(&mut self, next: Stage) {
        tracing::debug!(event = "sqlgrade.verify.stage", from = ?*self, to = ?next);
        *self = next;
    }
}

/// Runs candidate queries against a problem's dataset in a throwaway
/// transaction and judges them against the problem's reference query.
///
/// Every call gets its own scratch connection and rolls back everything it
/// did before returning, so from the caller's side a verification is a pure
/// function of the schema scripts, the candidate and the reference.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    cfg: EngineConfig,
}

impl Verifier {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn verify(&self, problem: &Problem, candidate: &str, mode: Mode) -> Outcome {
        self.try_verify(problem, candidate, mode)
            .unwrap_or_else(Outcome::from)
    }

    /// Like [`verify`](Self::verify) but keeps the typed error, for callers
    /// that need to know who is to blame for a failure.
    pub fn try_verify(
        &self,
        problem: &Problem,
        candidate: &str,
        mode: Mode,
    ) -> Result<Outcome, VerifyError> {
        match mode {
            Mode::Run => self
                .run(problem, candidate)
                .map(|result| Outcome::Results { result }),
            Mode::Submit => self.submit(problem, candidate).map(|s| Outcome::Verdict {
                correct: s.verdict.is_correct(),
                result: s.candidate,
            }),
        }
    }

    /// Materializes the schema and executes the candidate. No comparison.
    pub fn run(&self, problem: &Problem, candidate: &str) -> Result<ExecutionResult, VerifyError> {
        let started = Instant::now();
        let res = validate_candidate(candidate).and_then(|sql| {
            self.in_sandbox(problem, Mode::Run, |conn, stage| {
                self.load_and_execute(conn, problem, sql, stage)
            })
        });

        match &res {
            Ok(r) => tracing::info!(
                event = "sqlgrade.verify.finished",
                problem_id = problem.id,
                mode = "run",
                outcome = "results",
                rows = r.rows.len(),
                duration_ms = started.elapsed().as_millis() as u64,
            ),
            Err(e) => log_error(problem, Mode::Run, e, started),
        }
        res
    }

    /// Executes the candidate, then the reference query on the same dataset,
    /// and compares the two as multisets of rows.
    pub fn submit(&self, problem: &Problem, candidate: &str) -> Result<Submission, VerifyError> {
        let started = Instant::now();
        let res = validate_candidate(candidate).and_then(|sql| {
            self.in_sandbox(problem, Mode::Submit, |conn, stage| {
                let candidate = self.load_and_execute(conn, problem, sql, stage)?;

                let Some(reference_sql) = problem.reference_query() else {
                    return Err(VerifyError::SolutionMissing { candidate });
                };
                let reference = SqliteExecutor::new(conn, self.cfg.statement_timeout())
                    .execute(reference_sql)
                    .map_err(VerifyError::reference)?;
                stage.advance(Stage::ReferenceExecuted);

                let verdict = compare::compare(&candidate, &reference);
                let diff = compare::diff(&candidate, &reference);
                stage.advance(Stage::Compared);

                Ok(Submission {
                    verdict,
                    candidate,
                    diff,
                })
            })
        });

        match &res {
            Ok(s) => tracing::info!(
                event = "sqlgrade.verify.finished",
                problem_id = problem.id,
                mode = "submit",
                outcome = if s.verdict.is_correct() { "correct" } else { "incorrect" },
                missing = s.diff.missing,
                unexpected = s.diff.unexpected,
                duration_ms = started.elapsed().as_millis() as u64,
            ),
            Err(e) => log_error(problem, Mode::Submit, e, started),
        }
        res
    }

    fn load_and_execute(
        &self,
        conn: &Connection,
        problem: &Problem,
        sql: &str,
        stage: &mut Stage,
    ) -> Result<ExecutionResult, VerifyError> {
        let timeout = self.cfg.statement_timeout();

        schema::materialize(conn, &problem.schemas, timeout)?;
        stage.advance(Stage::SchemaLoaded);

        let result = SqliteExecutor::new(conn, timeout)
            .execute(sql)
            .map_err(|f| match f {
                QueryFailure::NotReadOnly(msg) => VerifyError::Validation(msg),
                other => VerifyError::candidate(other),
            })?;
        stage.advance(Stage::CandidateExecuted);
        Ok(result)
    }

    /// Opens a scratch connection, begins a transaction, runs `f` inside it
    /// and rolls the transaction back whatever `f` returned. A panic in `f`
    /// rolls back through the transaction's drop behavior.
    fn in_sandbox<T>(
        &self,
        problem: &Problem,
        mode: Mode,
        f: impl FnOnce(&Connection, &mut Stage) -> Result<T, VerifyError>,
    ) -> Result<T, VerifyError> {
        tracing::debug!(
            event = "sqlgrade.verify.start",
            problem_id = problem.id,
            mode = mode.as_str(),
            schemas = problem.schemas.len(),
        );
        let mut stage = Stage::Start;
        let mut scratch = Scratch::open(&self.cfg)?;
        let mut tx = scratch
            .connection_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.set_drop_behavior(DropBehavior::Rollback);

        let out = f(&*tx, &mut stage);

        let out = match tx.rollback() {
            Ok(()) => out,
            Err(e) => {
                tracing::error!(
                    event = "sqlgrade.verify.rollback_failed",
                    problem_id = problem.id,
                    mode = mode.as_str(),
                    error = %e,
                );
                // The original failure explains more than the rollback error.
                out.and_then(|_| Err(VerifyError::Sandbox(format!("rollback failed: {e}"))))
            }
        };

        if out.is_err() {
            tracing::debug!(
                event = "sqlgrade.verify.failed",
                problem_id = problem.id,
                mode = mode.as_str(),
                stage = ?stage,
            );
        }
        out
    }
}

fn validate_candidate(candidate: &str) -> Result<&str, VerifyError> {
    validate_read_only(candidate).map_err(VerifyError::Validation)
}

fn log_error(problem: &Problem, mode: Mode, err: &VerifyError, started: Instant) {
    let duration_ms = started.elapsed().as_millis() as u64;
    if err.is_system_fault() {
        tracing::error!(
            event = "sqlgrade.verify.system_fault",
            problem_id = problem.id,
            mode = mode.as_str(),
            kind = ?err.kind(),
            duration_ms,
            error = %err,
        );
    } else {
        tracing::debug!(
            event = "sqlgrade.verify.finished",
            problem_id = problem.id,
            mode = mode.as_str(),
            outcome = "error",
            kind = ?err.kind(),
            duration_ms,
        );
    }
}

impl From<VerifyError> for Outcome {
    fn from(e: VerifyError) -> Self {
        let subtype = e.kind();
        let message = e.to_string();
        let result = match e {
            VerifyError::SolutionMissing { candidate } => Some(candidate),
            _ => None,
        };
        Outcome::Error {
            subtype,
            message,
            result,
        }
    }
}
