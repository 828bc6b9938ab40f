//! The control-plane context: every externally visible operation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use sqlx::SqlitePool;
use tokio::sync::Mutex;

use mlcp_db::models::{PlanVersion, Run, TaskState, TaskStatus};
use mlcp_db::queries::runs as run_db;

use crate::error::PlanError;
use crate::frontier::{self, FrontierNode};
use crate::limits::PlanLimits;
use crate::plan::coerce::{self, PlanInput};
use crate::plan::normalize::{self, CanonicalPlan};
use crate::plan::store::{self, SealedPlan};
use crate::plan::validate::{self, ValidationReport};
use crate::tasks;

pub const DEFAULT_PROJECT: &str = "mlcp";
pub const DEFAULT_OWNER: &str = "operator";

/// Shared state of the control plane, built once at startup and passed by
/// reference.
///
/// Seals of the same run are serialized by a per-run lock held from
/// validation to commit; seals of different runs do not wait on each
/// other beyond SQLite's own writer lock.
#[derive(Debug)]
pub struct ControlPlane {
    pool: SqlitePool,
    limits: PlanLimits,
    seal_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ControlPlane {
    pub fn new(pool: SqlitePool, limits: PlanLimits) -> Self {
        Self {
            pool,
            limits,
            seal_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn limits(&self) -> &PlanLimits {
        &self.limits
    }

    // -------------------------------------------------------------------
    // Runs
    // -------------------------------------------------------------------

    /// Create a run in the `initialised` state.
    pub async fn create_run(
        &self,
        goals: &str,
        project: Option<&str>,
        owner: Option<&str>,
    ) -> Result<Run, PlanError> {
        let run = run_db::insert_run(
            &self.pool,
            goals,
            project.unwrap_or(DEFAULT_PROJECT),
            owner.unwrap_or(DEFAULT_OWNER),
        )
        .await?;
        tracing::info!(run_id = %run.run_id, project = %run.project, "run created");
        Ok(run)
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Run, PlanError> {
        run_db::get_run(&self.pool, run_id)
            .await?
            .ok_or_else(|| PlanError::RunNotFound(run_id.to_owned()))
    }

    // -------------------------------------------------------------------
    // Plans
    // -------------------------------------------------------------------

    /// Validate a plan without storing anything.
    pub fn validate_plan(&self, input: &PlanInput) -> ValidationReport {
        validate::validate_input(input, &self.limits)
    }

    /// Validate, normalize, and store a plan as the next version of a run.
    ///
    /// Invalid input is rejected with every validation error and leaves the
    /// store untouched.
    pub async fn seal_plan(&self, run_id: &str, input: &PlanInput) -> Result<SealedPlan, PlanError> {
        self.get_run(run_id).await?;

        let lock = self.seal_lock(run_id);
        let _guard = lock.lock().await;

        let tree = match coerce::coerce(input, self.limits.max_bytes) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!(run_id, error = %e, "seal rejected: unreadable plan");
                return Err(PlanError::Invalid(vec![e.to_issue()]));
            }
        };

        let report = validate::validate(&tree, &self.limits);
        if !report.ok {
            tracing::warn!(
                run_id,
                errors = report.errors.len(),
                "seal rejected: plan failed validation"
            );
            return Err(PlanError::Invalid(report.errors));
        }

        let canonical = normalize::normalize(&tree);
        let sealed = store::persist(&self.pool, run_id, &canonical).await?;
        tracing::info!(
            run_id,
            version = sealed.version,
            hash = %sealed.hash,
            nodes = sealed.node_count,
            edges = sealed.edge_count,
            "plan sealed"
        );
        Ok(sealed)
    }

    /// Every sealed version of a run, oldest first.
    pub async fn list_plan_versions(&self, run_id: &str) -> Result<Vec<PlanVersion>, PlanError> {
        self.get_run(run_id).await?;
        store::list_versions(&self.pool, run_id).await
    }

    /// The canonical plan of a version, the newest when `version` is `None`.
    pub async fn get_canonical_plan(
        &self,
        run_id: &str,
        version: Option<i64>,
    ) -> Result<CanonicalPlan, PlanError> {
        let header = store::resolve_version(&self.pool, run_id, version).await?;
        store::get_body(&self.pool, run_id, header.version).await
    }

    // -------------------------------------------------------------------
    // Execution state
    // -------------------------------------------------------------------

    /// Nodes of a version that are ready to run now.
    pub async fn get_frontier(
        &self,
        run_id: &str,
        version: Option<i64>,
    ) -> Result<Vec<FrontierNode>, PlanError> {
        let header = store::resolve_version(&self.pool, run_id, version).await?;
        let nodes = store::get_nodes(&self.pool, run_id, header.version).await?;
        let edges = store::get_edges(&self.pool, run_id, header.version).await?;
        let statuses = tasks::get_statuses(&self.pool, run_id, header.version).await?;

        let ready = frontier::compute_frontier(&nodes, &edges, &statuses);
        tracing::debug!(
            run_id,
            version = header.version,
            ready = ready.len(),
            "frontier computed"
        );
        Ok(ready)
    }

    pub async fn mark_task_complete(
        &self,
        run_id: &str,
        node_id: &str,
        version: Option<i64>,
    ) -> Result<TaskState, PlanError> {
        self.mark_task(run_id, node_id, version, TaskStatus::Complete)
            .await
    }

    pub async fn mark_task_failed(
        &self,
        run_id: &str,
        node_id: &str,
        version: Option<i64>,
    ) -> Result<TaskState, PlanError> {
        self.mark_task(run_id, node_id, version, TaskStatus::Failed)
            .await
    }

    /// Recorded statuses of a version, ordered by node ID.
    pub async fn task_statuses(
        &self,
        run_id: &str,
        version: Option<i64>,
    ) -> Result<Vec<TaskState>, PlanError> {
        let header = store::resolve_version(&self.pool, run_id, version).await?;
        tasks::list_states(&self.pool, run_id, header.version).await
    }

    async fn mark_task(
        &self,
        run_id: &str,
        node_id: &str,
        version: Option<i64>,
        status: TaskStatus,
    ) -> Result<TaskState, PlanError> {
        let header = store::resolve_version(&self.pool, run_id, version).await?;
        tasks::set_status(&self.pool, run_id, header.version, node_id, status).await
    }

    fn seal_lock(&self, run_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .seal_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(run_id.to_owned()).or_default())
    }
}
