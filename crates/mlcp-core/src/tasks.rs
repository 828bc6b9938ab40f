//! Per-node task status tracking.
//!
//! Status rows are created lazily on the first event for a node and
//! overwritten by later events. There is no transition guard: a complete
//! node can be marked failed and vice versa.

use std::collections::HashMap;

use sqlx::SqlitePool;

use mlcp_db::models::{TaskState, TaskStatus};
use mlcp_db::queries::plans as plan_db;
use mlcp_db::queries::task_states as task_db;

use crate::error::PlanError;

/// Record `status` for a node of a sealed version.
///
/// Fails with [`PlanError::NodeNotFound`] when the node is not part of
/// that version.
pub async fn set_status(
    pool: &SqlitePool,
    run_id: &str,
    version: i64,
    node_id: &str,
    status: TaskStatus,
) -> Result<TaskState, PlanError> {
    if plan_db::get_node(pool, run_id, version, node_id)
        .await?
        .is_none()
    {
        return Err(PlanError::NodeNotFound {
            run_id: run_id.to_owned(),
            version,
            node_id: node_id.to_owned(),
        });
    }

    let state = task_db::upsert_status(pool, run_id, version, node_id, status).await?;
    tracing::info!(
        run_id,
        version,
        node_id,
        status = %status,
        "task status recorded"
    );
    Ok(state)
}

/// Every recorded status of a version, keyed by node ID. Nodes without an
/// event are absent.
pub async fn get_statuses(
    pool: &SqlitePool,
    run_id: &str,
    version: i64,
) -> Result<HashMap<String, TaskStatus>, PlanError> {
    let states = task_db::list_states(pool, run_id, version).await?;
    Ok(states
        .into_iter()
        .map(|s| (s.node_id, s.status))
        .collect())
}

/// Every recorded status row of a version, ordered by node ID.
pub async fn list_states(
    pool: &SqlitePool,
    run_id: &str,
    version: i64,
) -> Result<Vec<TaskState>, PlanError> {
    Ok(task_db::list_states(pool, run_id, version).await?)
}
