//! Database query functions for the `runs` table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::Run;

/// Generate a run ID: `run_<unix seconds>_<8 hex chars>`.
///
/// The timestamp prefix keeps IDs roughly ordered by creation time; the
/// random suffix keeps them unique within a second.
pub fn new_run_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("run_{}_{}", now.timestamp(), &suffix[..8])
}

/// Insert a new run row in the `initialised` state. Returns the inserted run.
pub async fn insert_run(pool: &SqlitePool, goals: &str, project: &str, owner: &str) -> Result<Run> {
    let now = Utc::now();
    let run_id = new_run_id(now);

    let run = sqlx::query_as::<_, Run>(
        "INSERT INTO runs (run_id, state, goals, project, owner, plan_sealed, created_at, updated_at) \
         VALUES (?1, 'initialised', ?2, ?3, ?4, 0, ?5, ?5) \
         RETURNING *",
    )
    .bind(&run_id)
    .bind(goals)
    .bind(project)
    .bind(owner)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("failed to insert run")?;

    Ok(run)
}

/// Fetch a run by its ID.
pub async fn get_run(pool: &SqlitePool, run_id: &str) -> Result<Option<Run>> {
    let run = sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE run_id = ?1")
        .bind(run_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch run")?;

    Ok(run)
}

/// List all runs, newest first.
pub async fn list_runs(pool: &SqlitePool) -> Result<Vec<Run>> {
    let runs = sqlx::query_as::<_, Run>("SELECT * FROM runs ORDER BY created_at DESC, run_id DESC")
        .fetch_all(pool)
        .await
        .context("failed to list runs")?;

    Ok(runs)
}

/// Flip the sealed flag and move the run to `awaiting_execution`.
///
/// Runs on the caller's connection so it commits (or rolls back) together
/// with the version being written.
pub async fn mark_plan_sealed(
    conn: &mut SqliteConnection,
    run_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE runs \
         SET plan_sealed = 1, state = 'awaiting_execution', updated_at = ?1 \
         WHERE run_id = ?2",
    )
    .bind(now)
    .bind(run_id)
    .execute(conn)
    .await
    .context("failed to mark run as sealed")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("run {run_id} not found");
    }

    Ok(())
}

/// Delete a run. Plan versions, indices, and task states cascade.
pub async fn delete_run(pool: &SqlitePool, run_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM runs WHERE run_id = ?1")
        .bind(run_id)
        .execute(pool)
        .await
        .context("failed to delete run")?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_format() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let id = new_run_id(now);
        assert!(id.starts_with("run_1700000000_"), "unexpected id: {id}");
        let suffix = id.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn run_ids_are_unique() {
        let now = Utc::now();
        assert_ne!(new_run_id(now), new_run_id(now));
    }
}
