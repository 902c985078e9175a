// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit trail operations.
//!
//! Events are never updated or deleted. `seq` comes from AUTOINCREMENT, so
//! insertion order is the read order.

use std::str::FromStr;

use omnigen_core::{EventKind, NewTaskEvent, OmnigenError, TaskEvent};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::Database;

/// Insert one event on an existing connection. Used directly inside the
/// task-state transactions so the event commits or rolls back with the
/// record update.
pub(crate) fn insert_event_tx(
    conn: &rusqlite::Connection,
    event: &NewTaskEvent,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO task_events (task_id, event_type, external_status, response_data, error_message)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.task_id,
            event.event_type.to_string(),
            event.external_status,
            event.response_data,
            event.error_message,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Append one audit event. Returns its sequence number.
pub async fn append_event(db: &Database, event: &NewTaskEvent) -> Result<i64, OmnigenError> {
    let event = event.clone();
    db.connection()
        .call(move |conn| insert_event_tx(conn, &event))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Full audit trail for one task, in insertion order.
pub async fn events_for_task(db: &Database, task_id: &str) -> Result<Vec<TaskEvent>, OmnigenError> {
    let task_id = task_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, task_id, event_type, external_status, response_data,
                        error_message, created_at
                 FROM task_events WHERE task_id = ?1 ORDER BY seq ASC",
            )?;
            let rows = stmt.query_map(params![task_id], |row| {
                let kind_raw: String = row.get(2)?;
                let event_type = EventKind::from_str(&kind_raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
                })?;
                Ok(TaskEvent {
                    seq: row.get(0)?,
                    task_id: row.get(1)?,
                    event_type,
                    external_status: row.get(3)?,
                    response_data: row.get(4)?,
                    error_message: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnigen_core::{ExternalTaskState, GenerationRequest, TaskRecord, TaskStatusProbe};

    use crate::queries::tasks::insert_task;

    async fn setup_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    // The events table has a foreign key on tasks, so every trail needs a
    // parent row.
    async fn seed_task(db: &Database, id: &str) {
        let request = GenerationRequest::new("kling-2.6/text-to-video", "a prompt");
        let mut record = TaskRecord::new("kling", &request);
        record.id = id.to_string();
        insert_task(db, &record).await.unwrap();
    }

    #[tokio::test]
    async fn append_returns_increasing_seq() {
        let db = setup_db().await;
        seed_task(&db, "t-1").await;

        let first = append_event(&db, &NewTaskEvent::created("t-1")).await.unwrap();
        let second = append_event(
            &db,
            &NewTaskEvent::sent_to_provider("t-1", Some(&serde_json::json!({"id": "ext"}))),
        )
        .await
        .unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn trail_reads_back_in_insertion_order() {
        let db = setup_db().await;
        seed_task(&db, "t-1").await;
        seed_task(&db, "t-2").await;

        append_event(&db, &NewTaskEvent::created("t-1")).await.unwrap();
        let probe = TaskStatusProbe::in_progress(
            ExternalTaskState::Processing,
            "processing",
            serde_json::json!({"status": "processing"}),
        );
        append_event(&db, &NewTaskEvent::poll("t-1", &probe)).await.unwrap();
        append_event(&db, &NewTaskEvent::timeout("t-1", "poll budget exhausted"))
            .await
            .unwrap();

        // A second task's events must not leak into the trail.
        append_event(&db, &NewTaskEvent::created("t-2")).await.unwrap();

        let trail = events_for_task(&db, "t-1").await.unwrap();
        assert_eq!(trail.len(), 3);
        assert_eq!(trail[0].event_type, EventKind::Created);
        assert_eq!(trail[1].event_type, EventKind::Poll);
        assert_eq!(trail[1].external_status.as_deref(), Some("processing"));
        assert!(trail[1].response_data.is_some());
        assert_eq!(trail[2].event_type, EventKind::Timeout);
        assert_eq!(
            trail[2].error_message.as_deref(),
            Some("poll budget exhausted")
        );
        assert!(trail.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[tokio::test]
    async fn empty_trail_for_unknown_task() {
        let db = setup_db().await;
        let trail = events_for_task(&db, "ghost").await.unwrap();
        assert!(trail.is_empty());
    }
}
