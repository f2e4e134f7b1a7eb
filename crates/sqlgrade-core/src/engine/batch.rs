use super::verifier::Verifier;
use crate::errors::VerifyError;
use crate::model::Problem;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub const DEFAULT_PARALLEL: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Warn,
    Broken,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProblemCheck {
    pub problem_id: i64,
    pub title: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration_ms: u64,
}

/// Submits every problem's own reference query as the candidate and reports
/// problems whose content cannot be verified against (broken schema, failing
/// or missing reference).
pub async fn check_problems(
    verifier: Arc<Verifier>,
    problems: Vec<Problem>,
    parallel: usize,
) -> anyhow::Result<Vec<ProblemCheck>> {
    let sem = Arc::new(Semaphore::new(parallel.max(1)));
    let mut handles = Vec::new();

    for problem in problems {
        let permit = sem.clone().acquire_owned().await?;
        let verifier = verifier.clone();
        let h = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            check_one(&verifier, &problem)
        });
        handles.push(h);
    }

    let mut checks = Vec::with_capacity(handles.len());
    for h in handles {
        checks.push(h.await?);
    }
    Ok(checks)
}

fn check_one(verifier: &Verifier, problem: &Problem) -> ProblemCheck {
    let start = std::time::Instant::now();

    let (status, message) = match problem.reference_query() {
        None => (CheckStatus::Warn, "no solution configured".to_string()),
        Some(reference) => match verifier.submit(problem, reference) {
            Ok(s) if s.verdict.is_correct() => (
                CheckStatus::Ok,
                format!("reference returns {} row(s)", s.candidate.rows.len()),
            ),
            Ok(s) => (
                CheckStatus::Broken,
                format!(
                    "reference is not stable across runs ({} missing, {} unexpected)",
                    s.diff.missing, s.diff.unexpected
                ),
            ),
            Err(VerifyError::Validation(msg)) => (
                CheckStatus::Broken,
                format!("reference is not a read-only query: {msg}"),
            ),
            Err(e) => (CheckStatus::Broken, e.to_string()),
        },
    };

    ProblemCheck {
        problem_id: problem.id,
        title: problem.title.clone(),
        status,
        message,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}
