use crate::model::ProblemDraft;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub hex: String,
    pub components: Vec<String>,
}

pub fn sha256_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    hex::encode(h.finalize())
}

/// Computes a deterministic fingerprint of a problem's content.
///
/// Schema scripts contribute in execution order, so reordering them changes
/// the fingerprint even when the texts are the same.
pub fn compute(draft: &ProblemDraft) -> Fingerprint {
    let mut parts = Vec::new();

    parts.push(format!("title={}", draft.title));
    parts.push(format!("description={}", sha256_hex(&draft.description)));
    parts.push(format!(
        "explanation={}",
        sha256_hex(&draft.solution_explanation)
    ));

    let mut scripts: Vec<_> = draft.schemas.iter().collect();
    scripts.sort_by_key(|s| s.order);
    for s in scripts {
        parts.push(format!("schema[{}]={}", s.order, sha256_hex(&s.script)));
    }

    match &draft.solution {
        Some(sol) => parts.push(format!("solution={}", sha256_hex(&sol.query))),
        None => parts.push("solution=".to_string()),
    }

    let raw = parts.join("\n");
    let hex = sha256_hex(&raw);

    Fingerprint {
        hex,
        components: parts,
    }
}
