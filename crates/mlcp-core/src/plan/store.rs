//! Versioned, immutable plan storage.
//!
//! A sealed plan is written as one transaction: version header, canonical
//! body, node index, edge index, and the run's sealed flag. Readers never
//! see a partially written version.

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use mlcp_db::models::{PlanEdgeRow, PlanNodeRow, PlanVersion};
use mlcp_db::queries::plans::{self as plan_db, NewPlanNode};
use mlcp_db::queries::runs as run_db;

use super::hash;
use super::normalize::CanonicalPlan;
use crate::error::PlanError;

/// Result of sealing a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPlan {
    pub version: i64,
    pub hash: String,
    pub node_count: usize,
    pub edge_count: usize,
}

/// Persist a canonical plan as the next version of `run_id`.
///
/// The version number is allocated by the first statement of the
/// transaction, so the write lock is held from allocation to commit. Any
/// failure drops the transaction and rolls everything back.
pub async fn persist(
    pool: &SqlitePool,
    run_id: &str,
    plan: &CanonicalPlan,
) -> Result<SealedPlan, PlanError> {
    let body = hash::canonical_json(plan).context("failed to serialize canonical plan")?;
    let plan_hash = hash::digest(&body);
    let now = Utc::now();

    let nodes: Vec<NewPlanNode<'_>> = plan
        .nodes
        .iter()
        .map(|n| NewPlanNode {
            node_id: &n.id,
            name: &n.name,
            role: n.role,
            retries: n.retries,
            timeout_ms: n.timeout_ms,
            gates: &n.gates,
        })
        .collect();

    let mut tx = pool
        .begin()
        .await
        .context("failed to begin seal transaction")?;

    let version = plan_db::insert_next_version(&mut tx, run_id, &plan_hash, now).await?;
    plan_db::insert_body(&mut tx, run_id, version, &body).await?;
    plan_db::insert_nodes(&mut tx, run_id, version, &nodes).await?;
    plan_db::insert_edges(&mut tx, run_id, version, &plan.edges).await?;
    run_db::mark_plan_sealed(&mut tx, run_id, now).await?;

    tx.commit()
        .await
        .context("failed to commit seal transaction")?;

    Ok(SealedPlan {
        version,
        hash: plan_hash,
        node_count: plan.nodes.len(),
        edge_count: plan.edges.len(),
    })
}

/// All versions of a run, oldest first.
pub async fn list_versions(pool: &SqlitePool, run_id: &str) -> Result<Vec<PlanVersion>, PlanError> {
    Ok(plan_db::list_versions(pool, run_id).await?)
}

/// The newest version of a run.
pub async fn latest_version(pool: &SqlitePool, run_id: &str) -> Result<PlanVersion, PlanError> {
    plan_db::latest_version(pool, run_id)
        .await?
        .ok_or_else(|| PlanError::PlanNotFound {
            run_id: run_id.to_owned(),
            version: None,
        })
}

/// Resolve an optional version number to a stored version, defaulting to
/// the newest.
pub async fn resolve_version(
    pool: &SqlitePool,
    run_id: &str,
    version: Option<i64>,
) -> Result<PlanVersion, PlanError> {
    let Some(number) = version else {
        return latest_version(pool, run_id).await;
    };
    plan_db::get_version(pool, run_id, number)
        .await?
        .ok_or_else(|| PlanError::PlanNotFound {
            run_id: run_id.to_owned(),
            version: Some(number),
        })
}

/// Load and decode the canonical body of a version.
pub async fn get_body(
    pool: &SqlitePool,
    run_id: &str,
    version: i64,
) -> Result<CanonicalPlan, PlanError> {
    let body = plan_db::get_body(pool, run_id, version)
        .await?
        .ok_or_else(|| PlanError::PlanNotFound {
            run_id: run_id.to_owned(),
            version: Some(version),
        })?;

    let plan = serde_json::from_str(&body)
        .with_context(|| format!("stored plan body for {run_id} v{version} is corrupt"))?;
    Ok(plan)
}

/// Node index of a version, ordered by node ID.
pub async fn get_nodes(
    pool: &SqlitePool,
    run_id: &str,
    version: i64,
) -> Result<Vec<PlanNodeRow>, PlanError> {
    Ok(plan_db::list_nodes(pool, run_id, version).await?)
}

/// Edge index of a version, in canonical order.
pub async fn get_edges(
    pool: &SqlitePool,
    run_id: &str,
    version: i64,
) -> Result<Vec<PlanEdgeRow>, PlanError> {
    Ok(plan_db::list_edges(pool, run_id, version).await?)
}
