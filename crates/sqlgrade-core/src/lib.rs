//! Verification engine for SQL practice problems.
//!
//! A [`Verifier`](engine::Verifier) materializes a problem's schema in a
//! throwaway transaction, runs an untrusted read-only query against it and,
//! in submit mode, compares the rows with the problem's reference query as a
//! multiset. Nothing a verification does survives the call.

pub mod catalog;
pub mod compare;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fingerprint;
pub mod model;
pub mod report;
pub mod sandbox;
pub mod storage;

pub use engine::{Submission, Verifier};
pub use errors::VerifyError;
pub use model::{ExecutionResult, Mode, Outcome, Problem, Verdict};
