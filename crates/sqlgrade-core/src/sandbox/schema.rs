use super::{Deadline, TransactionFence};
use crate::errors::VerifyError;
use crate::model::SchemaScript;
use rusqlite::Connection;
use std::collections::HashSet;
use std::time::Duration;

/// Runs a problem's schema scripts, in ascending `order`, against the open
/// transaction on `conn`. Stops at the first failing script.
///
/// The whole set is checked (blank scripts, duplicate orders) before any of it
/// executes. Zero scripts is a valid, empty dataset.
pub fn materialize(
    conn: &Connection,
    scripts: &[SchemaScript],
    timeout: Duration,
) -> Result<(), VerifyError> {
    let ordered = ordered_scripts(scripts)?;
    let _fence = TransactionFence::arm(conn);

    for s in ordered {
        let deadline = Deadline::arm(conn, timeout);
        if let Err(e) = conn.execute_batch(&s.script) {
            let message = if deadline.expired(&e) {
                format!(
                    "script exceeded the time limit of {} ms",
                    deadline.limit().as_millis()
                )
            } else if TransactionFence::denied(&e) {
                "transaction control and ATTACH/DETACH are not allowed in schema scripts".into()
            } else {
                e.to_string()
            };
            return Err(VerifyError::Schema {
                order: s.order,
                message,
            });
        }
        drop(deadline);

        tracing::trace!(event = "sqlgrade.schema.applied", order = s.order);
    }
    Ok(())
}

fn ordered_scripts(scripts: &[SchemaScript]) -> Result<Vec<&SchemaScript>, VerifyError> {
    let mut seen = HashSet::new();
    for s in scripts {
        if s.script.trim().is_empty() {
            return Err(VerifyError::Schema {
                order: s.order,
                message: "schema script is empty".into(),
            });
        }
        if !seen.insert(s.order) {
            return Err(VerifyError::Schema {
                order: s.order,
                message: "duplicate schema order".into(),
            });
        }
    }

    let mut ordered: Vec<&SchemaScript> = scripts.iter().collect();
    ordered.sort_by_key(|s| s.order);
    Ok(ordered)
}
