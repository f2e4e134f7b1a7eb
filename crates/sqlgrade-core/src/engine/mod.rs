pub mod batch;
pub mod verifier;

pub use verifier::{Stage, Submission, Verifier};
