// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task record operations.
//!
//! The two state-changing writes (`mark_processing`, `finalize_task`) are
//! conditional UPDATEs paired with their audit event in one transaction, so
//! the lifecycle invariants hold under concurrent callers: a task leaves
//! `pending` once, reaches a terminal state once, and gets exactly one
//! terminal event.

use std::str::FromStr;

use omnigen_core::{
    NewTaskEvent, OmnigenError, Page, TaskFilter, TaskFinalization, TaskRecord, TaskState,
};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::Database;
use crate::queries::events::insert_event_tx;

const TASK_COLUMNS: &str = "id, provider, model, external_task_id, status, result_url, \
     result_urls, error_code, error_message, credits_spent, provider_cost, request_params, \
     created_at, completed_at";

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<TaskRecord, rusqlite::Error> {
    let status_raw: String = row.get(4)?;
    let status = TaskState::from_str(&status_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let result_urls_raw: Option<String> = row.get(6)?;
    let result_urls = match result_urls_raw {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
        None => Vec::new(),
    };

    Ok(TaskRecord {
        id: row.get(0)?,
        provider: row.get(1)?,
        model: row.get(2)?,
        external_task_id: row.get(3)?,
        status,
        result_url: row.get(5)?,
        result_urls,
        error_code: row.get(7)?,
        error_message: row.get(8)?,
        credits_spent: row.get(9)?,
        provider_cost: row.get(10)?,
        request_params: row.get(11)?,
        created_at: row.get(12)?,
        completed_at: row.get(13)?,
    })
}

fn urls_to_json(urls: &[String]) -> Option<String> {
    if urls.is_empty() {
        None
    } else {
        serde_json::to_string(urls).ok()
    }
}

/// Insert a freshly created task record.
pub async fn insert_task(db: &Database, record: &TaskRecord) -> Result<(), OmnigenError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, provider, model, external_task_id, status, result_url,
                     result_urls, error_code, error_message, credits_spent, provider_cost,
                     request_params, created_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    record.id,
                    record.provider,
                    record.model,
                    record.external_task_id,
                    record.status.to_string(),
                    record.result_url,
                    urls_to_json(&record.result_urls),
                    record.error_code,
                    record.error_message,
                    record.credits_spent,
                    record.provider_cost,
                    record.request_params,
                    record.created_at,
                    record.completed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a task by ID.
pub async fn get_task(db: &Database, id: &str) -> Result<Option<TaskRecord>, OmnigenError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], row_to_task);
            match result {
                Ok(task) => Ok(Some(task)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List tasks newest-first with optional provider/status filters.
pub async fn list_tasks(
    db: &Database,
    filter: &TaskFilter,
    page: &Page,
) -> Result<Vec<TaskRecord>, OmnigenError> {
    let provider = filter.provider.clone();
    let status = filter.status.map(|s| s.to_string());
    let limit = i64::from(page.limit);
    let offset = i64::from(page.offset);

    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks");
            let mut clauses: Vec<String> = Vec::new();
            let mut bind: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(provider) = provider {
                bind.push(Box::new(provider));
                clauses.push(format!("provider = ?{}", bind.len()));
            }
            if let Some(status) = status {
                bind.push(Box::new(status));
                clauses.push(format!("status = ?{}", bind.len()));
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            bind.push(Box::new(limit));
            sql.push_str(&format!(" ORDER BY created_at DESC, id DESC LIMIT ?{}", bind.len()));
            bind.push(Box::new(offset));
            sql.push_str(&format!(" OFFSET ?{}", bind.len()));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(bind), row_to_task)?;
            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(row?);
            }
            Ok(tasks)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move a `pending` task to `processing`, record the provider's task id, and
/// append the given event, all in one transaction.
///
/// Returns `false` (writing nothing) when the task was not `pending`.
pub async fn mark_processing(
    db: &Database,
    id: &str,
    external_task_id: &str,
    event: &NewTaskEvent,
) -> Result<bool, OmnigenError> {
    let id = id.to_string();
    let external_task_id = external_task_id.to_string();
    let event = event.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE tasks SET status = 'processing', external_task_id = ?1
                 WHERE id = ?2 AND status = 'pending'",
                params![external_task_id, id],
            )?;
            if changed == 0 {
                tx.commit()?;
                return Ok(false);
            }
            insert_event_tx(&tx, &event)?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move a live task to its terminal state and write the single terminal
/// event, all in one transaction.
///
/// The UPDATE is conditional on `status IN ('pending', 'processing')`, so a
/// second finalization attempt changes nothing and returns `false`. That
/// makes racing pollers and user-driven refreshes harmless.
pub async fn finalize_task(
    db: &Database,
    id: &str,
    finalization: &TaskFinalization,
) -> Result<bool, OmnigenError> {
    let id = id.to_string();
    let finalization = finalization.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE tasks SET status = ?1, result_url = ?2, result_urls = ?3,
                     error_code = ?4, error_message = ?5, credits_spent = ?6,
                     provider_cost = ?7,
                     completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?8 AND status IN ('pending', 'processing')",
                params![
                    finalization.status.to_string(),
                    finalization.result_url,
                    urls_to_json(&finalization.result_urls),
                    finalization.error_code,
                    finalization.error_message,
                    finalization.credits_spent,
                    finalization.provider_cost,
                    id,
                ],
            )?;
            if changed == 0 {
                tx.commit()?;
                return Ok(false);
            }
            insert_event_tx(&tx, &finalization.event)?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
