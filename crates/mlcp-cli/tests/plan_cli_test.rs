//! Integration tests for the `mlcp` binary.
//!
//! Each test points the binary at its own temporary database and config
//! directory, then drives a full run through the command line.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const CHAIN_PLAN: &str = "\
schema_version: \"1\"
nodes:
  - id: a
    name: Design
    role: product_owner
    gates: [review]
  - id: b
    name: Build
  - id: c
    name: Verify
    role: tester
edges:
  - [a, b]
  - [b, c]
";

struct Env {
    dir: TempDir,
    db_url: String,
}

impl Env {
    fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("mlcp_cli_test_")
            .tempdir()
            .unwrap();
        let db_url = format!("sqlite://{}", dir.path().join("cli.db").display());
        Self { dir, db_url }
    }

    fn write(&self, name: &str, contents: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path.display().to_string()
    }

    fn mlcp(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_mlcp"))
            .args(args)
            .arg("--database-url")
            .arg(&self.db_url)
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env_remove("MLCP_DATABASE_URL")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .output()
            .expect("failed to spawn mlcp")
    }

    /// Run a command that must succeed and parse its stdout as JSON.
    fn json(&self, args: &[&str]) -> serde_json::Value {
        let out = self.mlcp(args);
        assert!(
            out.status.success(),
            "mlcp {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
            panic!(
                "mlcp {args:?} printed non-JSON ({e}): {}",
                String::from_utf8_lossy(&out.stdout)
            )
        })
    }
}

fn frontier_ids(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["nodeId"].as_str().unwrap().to_owned())
        .collect()
}

fn exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}

#[test]
fn full_run_through_the_cli() {
    let env = Env::new();
    let tables = env.json(&["db-init"]);
    assert!(tables["tables"]["plan_versions"].is_number());
    assert!(tables["database_path"].as_str().unwrap().ends_with("cli.db"));
    assert!(exists(&env.dir.path().join("cli.db")));

    let run = env.json(&["run", "create", "--goals", "ship the release"]);
    let run_id = run["run_id"].as_str().unwrap().to_owned();
    assert_eq!(run["project"], "mlcp");
    assert_eq!(run["plan_sealed"], false);

    let file = env.write("plan.yaml", CHAIN_PLAN);
    let sealed = env.json(&["plan", "seal", &run_id, &file]);
    assert_eq!(sealed["version"], 1);
    assert_eq!(sealed["node_count"], 3);

    let shown = env.json(&["run", "show", &run_id]);
    assert_eq!(shown["plan_sealed"], true);
    assert_eq!(shown["state"], "awaiting_execution");

    let frontier = env.json(&["frontier", &run_id]);
    assert_eq!(frontier_ids(&frontier), vec!["a"]);
    assert_eq!(frontier[0]["gates"], serde_json::json!(["review"]));

    env.json(&["task", "complete", &run_id, "a"]);
    let frontier = env.json(&["frontier", &run_id]);
    assert_eq!(frontier_ids(&frontier), vec!["b"]);

    env.json(&["task", "fail", &run_id, "b"]);
    let frontier = env.json(&["frontier", &run_id]);
    assert!(frontier_ids(&frontier).is_empty());

    let states = env.json(&["task", "list", &run_id]);
    assert_eq!(states.as_array().unwrap().len(), 2);

    let versions = env.json(&["plan", "versions", &run_id]);
    assert_eq!(versions.as_array().unwrap().len(), 1);
    assert_eq!(versions[0]["hash"], sealed["hash"]);

    let canonical = env.json(&["plan", "show", &run_id, "--version", "1"]);
    assert_eq!(canonical["stats_nodes"], 3);
    assert_eq!(canonical["edges"], serde_json::json!([["a", "b"], ["b", "c"]]));
}

#[test]
fn invalid_plan_is_reported_as_json() {
    let env = Env::new();
    env.json(&["db-init"]);
    let run = env.json(&["run", "create", "--goals", "g"]);
    let run_id = run["run_id"].as_str().unwrap().to_owned();

    let file = env.write("bad.yaml", "nodes:\n  - {id: a, name: A}\nedges:\n  - [a, a]\n");
    let out = env.mlcp(&["plan", "seal", &run_id, &file]);
    assert!(!out.status.success());

    let body: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(body["error"], "invalid_plan");
    let codes: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["self_edge", "cycle_detected"]);

    let versions = env.json(&["plan", "versions", &run_id]);
    assert!(versions.as_array().unwrap().is_empty());
}

#[test]
fn validate_needs_no_database() {
    let env = Env::new();
    let file = env.write("plan.yaml", CHAIN_PLAN);

    let report = env.json(&["plan", "validate", &file]);
    assert_eq!(report["ok"], true);
    assert_eq!(report["stats"]["nodes"], 3);
    assert!(!exists(&env.dir.path().join("cli.db")));

    let bad = env.write("bad.yaml", "nodes: not-a-list\n");
    let out = env.mlcp(&["plan", "validate", &bad]);
    assert!(!out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["ok"], false);
    assert_eq!(report["errors"][0]["detail"], "nodes must be a list");
}

#[test]
fn unknown_run_reports_run_not_found() {
    let env = Env::new();
    env.json(&["db-init"]);

    let out = env.mlcp(&["run", "show", "run_0_deadbeef"]);
    assert!(!out.status.success());
    let body: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(body["error"], "run_not_found");
}

#[test]
fn init_writes_config_file() {
    let env = Env::new();
    let out = env.json(&["init", "--db-url", "sqlite://somewhere.db"]);
    let path = out["config_path"].as_str().unwrap().to_owned();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("sqlite://somewhere.db"));
    assert!(contents.contains("max_nodes"));

    let again = env.mlcp(&["init"]);
    assert!(!again.status.success(), "second init without --force must fail");
    env.json(&["init", "--force"]);
}
