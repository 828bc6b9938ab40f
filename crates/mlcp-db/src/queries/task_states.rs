//! Database query functions for the `task_states` table.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{TaskState, TaskStatus};

/// Record the status of a node, creating the row on first use.
///
/// Last write wins: an existing row is overwritten regardless of its
/// current status. Returns the stored row.
pub async fn upsert_status(
    pool: &SqlitePool,
    run_id: &str,
    version: i64,
    node_id: &str,
    status: TaskStatus,
) -> Result<TaskState> {
    let state = sqlx::query_as::<_, TaskState>(
        "INSERT INTO task_states (run_id, version, node_id, status, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (run_id, version, node_id) \
         DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at \
         RETURNING run_id, version, node_id, status, updated_at",
    )
    .bind(run_id)
    .bind(version)
    .bind(node_id)
    .bind(status)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to record status {status} for node {node_id:?}"))?;

    Ok(state)
}

/// List every recorded status of a version, ordered by node ID.
pub async fn list_states(pool: &SqlitePool, run_id: &str, version: i64) -> Result<Vec<TaskState>> {
    let states = sqlx::query_as::<_, TaskState>(
        "SELECT run_id, version, node_id, status, updated_at FROM task_states \
         WHERE run_id = ?1 AND version = ?2 ORDER BY node_id ASC",
    )
    .bind(run_id)
    .bind(version)
    .fetch_all(pool)
    .await
    .context("failed to list task states")?;

    Ok(states)
}
