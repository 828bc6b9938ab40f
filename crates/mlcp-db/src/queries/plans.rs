//! Database query functions for the `plan_versions`, `plan_bodies`,
//! `plan_nodes`, and `plan_edges` tables.
//!
//! Writers take a `&mut SqliteConnection` so the sealing code can run them
//! inside a single transaction; readers take the pool.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::{Gate, PlanEdgeRow, PlanNodeRow, PlanVersion, Role};

/// Parameters for inserting one node index row.
#[derive(Debug, Clone)]
pub struct NewPlanNode<'a> {
    pub node_id: &'a str,
    pub name: &'a str,
    pub role: Role,
    pub retries: i64,
    pub timeout_ms: i64,
    pub gates: &'a [Gate],
}

// -----------------------------------------------------------------------
// Writes
// -----------------------------------------------------------------------

/// Insert a version header, allocating the next version number for the run.
///
/// The number is computed as `MAX(version) + 1` (or 1 for the first
/// version) by the same statement that inserts the row. SQLite serializes
/// writers, so no other writer can observe or claim the same maximum in
/// between. Returns the allocated version.
pub async fn insert_next_version(
    conn: &mut SqliteConnection,
    run_id: &str,
    hash: &str,
    created_at: DateTime<Utc>,
) -> Result<i64> {
    let version: i64 = sqlx::query_scalar(
        "INSERT INTO plan_versions (run_id, version, hash, created_at) \
         SELECT ?1, COALESCE(MAX(version), 0) + 1, ?2, ?3 \
         FROM plan_versions WHERE run_id = ?1 \
         RETURNING version",
    )
    .bind(run_id)
    .bind(hash)
    .bind(created_at)
    .fetch_one(conn)
    .await
    .with_context(|| format!("failed to allocate plan version for run {run_id}"))?;

    Ok(version)
}

/// Store the canonical JSON body of a version.
pub async fn insert_body(
    conn: &mut SqliteConnection,
    run_id: &str,
    version: i64,
    body_json: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO plan_bodies (run_id, version, body_json) VALUES (?1, ?2, ?3)")
        .bind(run_id)
        .bind(version)
        .bind(body_json)
        .execute(conn)
        .await
        .context("failed to insert plan body")?;

    Ok(())
}

/// Insert the node index rows of a version.
pub async fn insert_nodes(
    conn: &mut SqliteConnection,
    run_id: &str,
    version: i64,
    nodes: &[NewPlanNode<'_>],
) -> Result<()> {
    for node in nodes {
        let gates_json =
            serde_json::to_string(node.gates).context("failed to encode node gates")?;
        sqlx::query(
            "INSERT INTO plan_nodes \
             (run_id, version, node_id, name, role, retries, timeout_ms, gates_json) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(run_id)
        .bind(version)
        .bind(node.node_id)
        .bind(node.name)
        .bind(node.role)
        .bind(node.retries)
        .bind(node.timeout_ms)
        .bind(gates_json)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("failed to insert plan node {:?}", node.node_id))?;
    }

    Ok(())
}

/// Insert the edge index rows of a version, numbered in list order.
pub async fn insert_edges(
    conn: &mut SqliteConnection,
    run_id: &str,
    version: i64,
    edges: &[(String, String)],
) -> Result<()> {
    for (seq, (src, dst)) in edges.iter().enumerate() {
        sqlx::query(
            "INSERT INTO plan_edges (run_id, version, seq, src, dst) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(run_id)
        .bind(version)
        .bind(seq as i64)
        .bind(src)
        .bind(dst)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("failed to insert plan edge {src:?} -> {dst:?}"))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Reads
// -----------------------------------------------------------------------

/// List every version of a run, oldest first.
pub async fn list_versions(pool: &SqlitePool, run_id: &str) -> Result<Vec<PlanVersion>> {
    let versions = sqlx::query_as::<_, PlanVersion>(
        "SELECT run_id, version, hash, created_at FROM plan_versions \
         WHERE run_id = ?1 ORDER BY version ASC",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await
    .context("failed to list plan versions")?;

    Ok(versions)
}

/// Fetch one version header.
pub async fn get_version(
    pool: &SqlitePool,
    run_id: &str,
    version: i64,
) -> Result<Option<PlanVersion>> {
    let row = sqlx::query_as::<_, PlanVersion>(
        "SELECT run_id, version, hash, created_at FROM plan_versions \
         WHERE run_id = ?1 AND version = ?2",
    )
    .bind(run_id)
    .bind(version)
    .fetch_optional(pool)
    .await
    .context("failed to fetch plan version")?;

    Ok(row)
}

/// Fetch the highest version of a run, if any.
pub async fn latest_version(pool: &SqlitePool, run_id: &str) -> Result<Option<PlanVersion>> {
    let row = sqlx::query_as::<_, PlanVersion>(
        "SELECT run_id, version, hash, created_at FROM plan_versions \
         WHERE run_id = ?1 ORDER BY version DESC LIMIT 1",
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch latest plan version")?;

    Ok(row)
}

/// Fetch the canonical JSON body of a version.
pub async fn get_body(pool: &SqlitePool, run_id: &str, version: i64) -> Result<Option<String>> {
    let body: Option<String> = sqlx::query_scalar(
        "SELECT body_json FROM plan_bodies WHERE run_id = ?1 AND version = ?2",
    )
    .bind(run_id)
    .bind(version)
    .fetch_optional(pool)
    .await
    .context("failed to fetch plan body")?;

    Ok(body)
}

/// List the node index rows of a version, ordered by node ID.
pub async fn list_nodes(pool: &SqlitePool, run_id: &str, version: i64) -> Result<Vec<PlanNodeRow>> {
    let nodes = sqlx::query_as::<_, PlanNodeRow>(
        "SELECT node_id, name, role, retries, timeout_ms, gates_json FROM plan_nodes \
         WHERE run_id = ?1 AND version = ?2 ORDER BY node_id ASC",
    )
    .bind(run_id)
    .bind(version)
    .fetch_all(pool)
    .await
    .context("failed to list plan nodes")?;

    Ok(nodes)
}

/// Fetch a single node index row.
pub async fn get_node(
    pool: &SqlitePool,
    run_id: &str,
    version: i64,
    node_id: &str,
) -> Result<Option<PlanNodeRow>> {
    let node = sqlx::query_as::<_, PlanNodeRow>(
        "SELECT node_id, name, role, retries, timeout_ms, gates_json FROM plan_nodes \
         WHERE run_id = ?1 AND version = ?2 AND node_id = ?3",
    )
    .bind(run_id)
    .bind(version)
    .bind(node_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch plan node")?;

    Ok(node)
}

/// List the edge index rows of a version in canonical order.
pub async fn list_edges(pool: &SqlitePool, run_id: &str, version: i64) -> Result<Vec<PlanEdgeRow>> {
    let edges = sqlx::query_as::<_, PlanEdgeRow>(
        "SELECT src, dst FROM plan_edges \
         WHERE run_id = ?1 AND version = ?2 ORDER BY seq ASC",
    )
    .bind(run_id)
    .bind(version)
    .fetch_all(pool)
    .await
    .context("failed to list plan edges")?;

    Ok(edges)
}
