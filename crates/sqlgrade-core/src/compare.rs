//! Order-insensitive, duplicate-sensitive comparison of captured result sets.
//!
//! SQL leaves row order unspecified without an `ORDER BY`, so two result sets
//! are equivalent when they hold the same rows with the same multiplicities.
//! Column names are ignored; arity only matters through row equality.

use crate::model::{ExecutionResult, Row, Verdict};
use serde::Serialize;
use std::cmp::Ordering;

/// Multiset difference between a candidate and a reference result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowDiff {
    /// Reference rows the candidate did not produce.
    pub missing: usize,
    /// Candidate rows the reference does not contain.
    pub unexpected: usize,
}

impl RowDiff {
    pub fn is_empty(&self) -> bool {
        self.missing == 0 && self.unexpected == 0
    }
}

pub fn compare(candidate: &ExecutionResult, reference: &ExecutionResult) -> Verdict {
    if candidate.rows.len() != reference.rows.len() {
        return Verdict::Incorrect;
    }
    if canonical(&candidate.rows) == canonical(&reference.rows) {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    }
}

pub fn diff(candidate: &ExecutionResult, reference: &ExecutionResult) -> RowDiff {
    let cand = canonical(&candidate.rows);
    let refs = canonical(&reference.rows);

    let mut out = RowDiff::default();
    let (mut i, mut j) = (0, 0);
    while i < cand.len() && j < refs.len() {
        match cand[i].cmp(refs[j]) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                out.unexpected += 1;
                i += 1;
            }
            Ordering::Greater => {
                out.missing += 1;
                j += 1;
            }
        }
    }
    out.unexpected += cand.len() - i;
    out.missing += refs.len() - j;
    out
}

/// Rows sorted by the total order on values, lexicographically per row.
fn canonical(rows: &[Row]) -> Vec<&Row> {
    let mut sorted: Vec<&Row> = rows.iter().collect();
    sorted.sort();
    sorted
}
