//! Integration tests for the embedded migrations and schema constraints.
//!
//! Each test opens a fresh temporary SQLite database with migrations applied.

use sqlx::Row;

use mlcp_db::pool;
use mlcp_db::queries::{plans, runs};
use mlcp_test_utils::create_test_db;

#[tokio::test]
async fn migrations_create_all_tables() {
    let db = create_test_db().await;

    let counts = pool::table_counts(&db.pool)
        .await
        .expect("table_counts should succeed");
    let names: Vec<&str> = counts.iter().map(|(name, _)| name.as_str()).collect();

    for expected in [
        "plan_bodies",
        "plan_edges",
        "plan_nodes",
        "plan_versions",
        "runs",
        "task_states",
    ] {
        assert!(names.contains(&expected), "missing table {expected}: {names:?}");
    }
    assert!(counts.iter().all(|(_, count)| *count == 0));

    db.close().await;
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = create_test_db().await;

    pool::run_migrations(&db.pool)
        .await
        .expect("re-running migrations should be a no-op");

    db.close().await;
}

#[tokio::test]
async fn pool_uses_wal_and_foreign_keys() {
    let db = create_test_db().await;

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");

    let fk: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(fk, 1);

    db.close().await;
}

#[tokio::test]
async fn version_requires_existing_run() {
    let db = create_test_db().await;

    let mut conn = db.pool.acquire().await.unwrap();
    let result =
        plans::insert_next_version(&mut conn, "run_missing", "deadbeef", chrono::Utc::now()).await;
    assert!(result.is_err(), "foreign key should reject unknown run");
    drop(conn);

    db.close().await;
}

#[tokio::test]
async fn plan_versions_reject_updates() {
    let db = create_test_db().await;
    let run = runs::insert_run(&db.pool, "ship it", "mlcp", "operator")
        .await
        .unwrap();

    let mut conn = db.pool.acquire().await.unwrap();
    let version = plans::insert_next_version(&mut conn, &run.run_id, "abc", chrono::Utc::now())
        .await
        .unwrap();
    plans::insert_body(&mut conn, &run.run_id, version, "{}")
        .await
        .unwrap();
    drop(conn);

    let err = sqlx::query("UPDATE plan_versions SET hash = 'changed' WHERE run_id = ?1")
        .bind(&run.run_id)
        .execute(&db.pool)
        .await
        .expect_err("update should be rejected");
    assert!(err.to_string().contains("immutable"), "unexpected error: {err}");

    let err = sqlx::query("UPDATE plan_bodies SET body_json = '[]' WHERE run_id = ?1")
        .bind(&run.run_id)
        .execute(&db.pool)
        .await
        .expect_err("update should be rejected");
    assert!(err.to_string().contains("immutable"), "unexpected error: {err}");

    db.close().await;
}

#[tokio::test]
async fn task_status_check_constraint() {
    let db = create_test_db().await;
    let run = runs::insert_run(&db.pool, "goals", "mlcp", "operator")
        .await
        .unwrap();

    let mut conn = db.pool.acquire().await.unwrap();
    let version = plans::insert_next_version(&mut conn, &run.run_id, "abc", chrono::Utc::now())
        .await
        .unwrap();
    drop(conn);

    let result = sqlx::query(
        "INSERT INTO task_states (run_id, version, node_id, status, updated_at) \
         VALUES (?1, ?2, 'a', 'running', '2024-01-01T00:00:00Z')",
    )
    .bind(&run.run_id)
    .bind(version)
    .execute(&db.pool)
    .await;
    assert!(result.is_err(), "unknown status should be rejected");

    let row = sqlx::query("SELECT COUNT(*) AS n FROM task_states")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(row.get::<i64, _>("n"), 0);

    db.close().await;
}
