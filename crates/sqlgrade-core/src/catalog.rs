//! Loading problem content from a directory tree.
//!
//! ```text
//! problems/
//!   second_highest_salary/
//!     description.md
//!     solution_explanation.md   (optional)
//!     solution.sql
//!     schema_01_employees.sql   (zero or more, run in file-name order)
//! ```

use crate::model::{ProblemDraft, SchemaScript, Solution};
use crate::storage::{SeedAction, Store};
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DESCRIPTION_FILE: &str = "description.md";
pub const EXPLANATION_FILE: &str = "solution_explanation.md";
pub const SOLUTION_FILE: &str = "solution.sql";

#[derive(Debug, Clone)]
pub enum LoadedProblem {
    Ready(ProblemDraft),
    Skipped { title: String, reason: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    pub skipped: Vec<SkippedProblem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedProblem {
    pub title: String,
    pub reason: String,
}

/// `second_highest_salary` -> `Second Highest Salary`
///
/// Follows title-casing rules where any letter not preceded by another letter
/// starts a word, so `2nd_place` becomes `2Nd Place` and `o'neil` becomes
/// `O'Neil`. Titles are the store's identity, so this must not drift.
pub fn title_from_dir_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_letter = false;
    for c in name.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    out
}

pub fn load_problem_dir(dir: &Path) -> anyhow::Result<LoadedProblem> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = title_from_dir_name(&name);

    let Some(description) = read_optional(&dir.join(DESCRIPTION_FILE))? else {
        return Ok(LoadedProblem::Skipped {
            title,
            reason: format!("{DESCRIPTION_FILE} not found"),
        });
    };

    let solution_explanation = match read_optional(&dir.join(EXPLANATION_FILE))? {
        Some(text) => text,
        None => {
            tracing::warn!(
                event = "sqlgrade.catalog.no_explanation",
                problem = %title,
                "solution explanation missing, using empty text"
            );
            String::new()
        }
    };

    let Some(solution) = read_optional(&dir.join(SOLUTION_FILE))? else {
        return Ok(LoadedProblem::Skipped {
            title,
            reason: format!("{SOLUTION_FILE} not found"),
        });
    };

    let mut schemas = Vec::new();
    for (idx, path) in schema_files(dir)?.into_iter().enumerate() {
        let script = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if script.trim().is_empty() {
            tracing::warn!(
                event = "sqlgrade.catalog.empty_schema",
                problem = %title,
                file = %path.display(),
                "schema file is empty, skipping it"
            );
            continue;
        }
        schemas.push(SchemaScript::new(idx as u32, script));
    }

    if schemas.is_empty() {
        tracing::warn!(
            event = "sqlgrade.catalog.no_schema",
            problem = %title,
            "no schema*.sql files, problem runs against an empty database"
        );
    }

    Ok(LoadedProblem::Ready(ProblemDraft {
        title,
        description,
        solution_explanation,
        schemas,
        solution: Some(Solution { query: solution }),
    }))
}

/// Seeds every problem directory under `root` into `store`, in name order.
pub fn seed(store: &Store, root: &Path) -> anyhow::Result<SeedReport> {
    if !root.is_dir() {
        anyhow::bail!("problem directory not found: {}", root.display());
    }

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .with_context(|| format!("failed to list {}", root.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    let mut report = SeedReport::default();
    for dir in dirs {
        match load_problem_dir(&dir)? {
            LoadedProblem::Skipped { title, reason } => {
                tracing::warn!(event = "sqlgrade.catalog.skipped", problem = %title, reason = %reason);
                report.skipped.push(SkippedProblem { title, reason });
            }
            LoadedProblem::Ready(draft) => {
                let (id, action) = store
                    .upsert_problem(&draft)
                    .with_context(|| format!("failed to store problem '{}'", draft.title))?;
                tracing::info!(
                    event = "sqlgrade.catalog.seeded",
                    problem = %draft.title,
                    problem_id = id,
                    action = ?action,
                    schemas = draft.schemas.len(),
                );
                match action {
                    SeedAction::Created => report.created.push(draft.title),
                    SeedAction::Updated => report.updated.push(draft.title),
                    SeedAction::Unchanged => report.unchanged.push(draft.title),
                }
            }
        }
    }
    Ok(report)
}

fn read_optional(path: &Path) -> anyhow::Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let text =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Some(text))
}

fn schema_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("schema") && n.ends_with(".sql"))
        })
        .collect();
    files.sort();
    Ok(files)
}
