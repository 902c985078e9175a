// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable poll scheduling for task-based providers.
//!
//! Claiming is atomic: a transaction selects due entries and locks them with
//! a `locked_until` horizon, so multiple workers never poll the same task at
//! the same time. Entries claimed by a worker that died become due again once
//! their lock expires; downstream finalization is idempotent, which makes the
//! resulting at-least-once delivery safe.

use std::time::Duration;

use omnigen_core::{OmnigenError, PollTicket};
use rusqlite::params;

use crate::database::Database;

/// Enqueue a poll for `task_id` due after `due_in`.
///
/// `attempt` is the 1-based poll attempt the entry represents and
/// `transport_errors` the consecutive probe failures carried into it.
pub async fn schedule_poll(
    db: &Database,
    task_id: &str,
    due_in: Duration,
    attempt: u32,
    transport_errors: u32,
) -> Result<i64, OmnigenError> {
    let task_id = task_id.to_string();
    let due_secs = due_in.as_secs() as i64;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO poll_queue (task_id, attempt, transport_errors, due_at)
                 VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+' || ?4 || ' seconds'))",
                params![task_id, attempt, transport_errors, due_secs],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim up to `limit` due entries, locking each for `lock_timeout`.
///
/// Due means: pending with `due_at` in the past, or claimed with an expired
/// lock (abandoned by a dead worker).
pub async fn claim_due(
    db: &Database,
    limit: u32,
    lock_timeout: Duration,
) -> Result<Vec<PollTicket>, OmnigenError> {
    let limit = i64::from(limit);
    let lock_secs = lock_timeout.as_secs() as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<PollTicket>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let tickets = {
                let mut stmt = tx.prepare(
                    "SELECT id, task_id, attempt, transport_errors FROM poll_queue
                     WHERE (status = 'pending'
                            AND due_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                        OR (status = 'claimed'
                            AND locked_until <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ORDER BY due_at ASC
                     LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], |row| {
                    Ok(PollTicket {
                        id: row.get(0)?,
                        task_id: row.get(1)?,
                        attempt: row.get(2)?,
                        transport_errors: row.get(3)?,
                    })
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                out
            };

            for ticket in &tickets {
                tx.execute(
                    "UPDATE poll_queue SET status = 'claimed',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+' || ?1 || ' seconds'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![lock_secs, ticket.id],
                )?;
            }
            tx.commit()?;
            Ok(tickets)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a claimed entry done. Idempotent.
pub async fn complete(db: &Database, ticket_id: i64) -> Result<(), OmnigenError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE poll_queue SET status = 'done', locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![ticket_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Return a claimed entry to the pool immediately, clearing its lock.
///
/// For a worker that caught an error mid-step: the entry keeps its due
/// time, attempt, and transport counter, and becomes claimable on the next
/// sweep instead of after the lock window. Done entries are untouched.
pub async fn release(db: &Database, ticket_id: i64) -> Result<(), OmnigenError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE poll_queue SET status = 'pending', locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'claimed'",
                params![ticket_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Drop every outstanding entry for a task. Returns the number removed.
pub async fn cancel_for_task(db: &Database, task_id: &str) -> Result<u64, OmnigenError> {
    let task_id = task_id.to_string();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM poll_queue
                 WHERE task_id = ?1 AND status IN ('pending', 'claimed')",
                params![task_id],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Entries not yet done.
pub async fn pending_count(db: &Database) -> Result<u64, OmnigenError> {
    db.connection()
        .call(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM poll_queue WHERE status IN ('pending', 'claimed')",
                [],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
