/// Integration test suite: drives the compiled `workflow-graph` binary and the
/// library against a small Temporal order-processing module written to a temp dir.
///
/// The `CARGO_BIN_EXE_workflow-graph` environment variable is set by Cargo during
/// `cargo test` to point to the compiled binary for the current profile.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use workflow_graph::builder::{AnalysisOptions, build_graph};
use workflow_graph::graph::node::{CallKind, Classification};
use workflow_graph::query::Expansion;
use workflow_graph::query::call_tree::call_hierarchy;
use workflow_graph::query::package_tree::package_hierarchy;
use workflow_graph::resolver::Resolver;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_workflow-graph"))
}

/// Run a workflow-graph command and assert it exits successfully.
/// Returns stdout as a String.
fn run_success(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke workflow-graph binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

/// Run a workflow-graph command and assert it exits with a non-zero status.
/// Returns (stdout, stderr) as Strings.
fn run_failure(args: &[&str]) -> (String, String) {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke workflow-graph binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        !out.status.success(),
        "command {:?} expected to fail but exited successfully\nstdout: {}\nstderr: {}",
        args,
        stdout,
        stderr
    );
    (stdout, stderr)
}

fn write(root: &Path, rel: &str, src: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, src).unwrap();
}

/// A module with an order workflow, its activities and child workflow, a
/// client-side signaller, and a helper only reachable through an internal call.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    write(root, "go.mod", "module example.com/shop\n\ngo 1.22\n");
    write(
        root,
        "internal/order/workflow.go",
        r#"package order

import (
	"time"

	"go.temporal.io/sdk/workflow"
)

// OrderWorkflow charges the customer and ships the order.
func OrderWorkflow(ctx workflow.Context, id string) error {
	approve := workflow.GetSignalChannel(ctx, "approve")
	_ = workflow.SetQueryHandler(ctx, "status", orderStatus)
	if err := validateOrder(id); err != nil {
		return err
	}
	workflow.Sleep(ctx, 10*time.Second)
	if err := workflow.ExecuteActivity(ctx, PaymentActivity, id).Get(ctx, nil); err != nil {
		return err
	}
	_ = approve
	return workflow.ExecuteChildWorkflow(ctx, ShippingWorkflow, id).Get(ctx, nil)
}

func orderStatus() (string, error) {
	return "pending", nil
}
"#,
    );
    write(
        root,
        "internal/order/validate.go",
        r#"package order

// validateOrder rejects empty ids.
func validateOrder(id string) error {
	return nil
}
"#,
    );
    write(
        root,
        "internal/billing/payment.go",
        r#"package billing

import "context"

// PaymentActivity charges the card on file.
func PaymentActivity(ctx context.Context, id string) error {
	return nil
}
"#,
    );
    write(
        root,
        "internal/shipping/shipping.go",
        r#"package shipping

import "go.temporal.io/sdk/workflow"

func ShippingWorkflow(ctx workflow.Context, id string) error {
	return workflow.ExecuteActivity(ctx, "BookCourierActivity", id).Get(ctx, nil)
}
"#,
    );
    write(
        root,
        "cmd/api/approve.go",
        r#"package main

import (
	"context"

	"go.temporal.io/sdk/client"
)

func approveOrder(c client.Client, id string) error {
	return c.SignalWorkflow(context.Background(), id, "", "approve", nil)
}
"#,
    );
    write(root, "vendor/lib/lib.go", "package lib\n\nfunc VendoredWorkflow() {}\n");
    write(root, "internal/order/broken.go", "package order\n\nfunc broken( {\n");
    dir
}

// ---------------------------------------------------------------------------
// Library end to end
// ---------------------------------------------------------------------------

#[test]
fn test_library_builds_order_graph() {
    let dir = fixture();
    let out = build_graph(&AnalysisOptions::new(dir.path())).unwrap();
    let graph = &out.graph;

    assert_eq!(out.warnings.len(), 1, "only broken.go should warn: {:?}", out.warnings);
    assert!(!graph.contains("VendoredWorkflow"));

    let order = graph.get("OrderWorkflow").unwrap();
    assert_eq!(order.classification, Classification::Workflow);
    assert_eq!(order.package, "order");
    assert_eq!(order.description, "OrderWorkflow charges the customer and ships the order.");
    assert_eq!(order.signals[0].name, "approve");
    assert_eq!(order.queries[0].handler, "orderStatus");
    assert!(order.timers[0].is_sleep);
    let sites: Vec<(&str, CallKind)> = order
        .call_sites
        .iter()
        .map(|c| (c.target.as_str(), c.kind))
        .collect();
    assert_eq!(
        sites,
        vec![
            ("PaymentActivity", CallKind::Activity),
            ("ShippingWorkflow", CallKind::ChildWorkflow)
        ]
    );
    assert_eq!(order.internal_calls[0].target, "validateOrder");

    assert_eq!(
        graph.get("orderStatus").unwrap().classification,
        Classification::QueryHandler
    );
    assert_eq!(graph.get("PaymentActivity").unwrap().parents, vec!["OrderWorkflow"]);

    let courier = graph.get("BookCourierActivity").unwrap();
    assert!(courier.external);
    assert_eq!(courier.parents, vec!["ShippingWorkflow"]);

    let stats = graph.stats();
    assert_eq!(stats.max_depth, 3);
    assert_eq!(stats.external_nodes, 1);
}

#[test]
fn test_library_trees_and_resolver() {
    let dir = fixture();
    let mut graph = build_graph(&AnalysisOptions::new(dir.path())).unwrap().graph;

    let items = call_hierarchy(&graph, &Expansion::expanded());
    let order_rows: Vec<&str> = items
        .iter()
        .filter(|i| i.key.starts_with("OrderWorkflow"))
        .map(|i| i.key.as_str())
        .collect();
    assert_eq!(
        order_rows,
        vec![
            "OrderWorkflow",
            "OrderWorkflow/PaymentActivity",
            "OrderWorkflow/ShippingWorkflow",
            "OrderWorkflow/ShippingWorkflow/BookCourierActivity",
        ]
    );

    let packages = package_hierarchy(&graph, &Expansion::expanded());
    let dirs: Vec<&str> = packages
        .iter()
        .filter(|i| i.key.starts_with("dir:"))
        .map(|i| i.label.as_str())
        .collect();
    assert_eq!(
        dirs,
        vec!["(external)/", "cmd/api/", "internal/", "billing/", "order/", "shipping/"]
    );

    // validateOrder is in the graph already; resolve a fresh copy from the caller's file.
    let order = graph.get("OrderWorkflow").unwrap().clone();
    let resolved = Resolver::default()
        .resolve_from(&order.name, "validateOrder", &order.file_path)
        .unwrap();
    assert!(resolved.file_path.ends_with("internal/order/validate.go"));
    assert_eq!(resolved.description, "validateOrder rejects empty ids.");
    assert!(!graph.merge_resolved(resolved));

    let mut narrowed = AnalysisOptions::new(dir.path());
    narrowed.filter = workflow_graph::graph::NodeFilter::new(Some("Workflow$"), None).unwrap();
    let mut small = build_graph(&narrowed).unwrap().graph;
    assert!(!small.contains("validateOrder"));
    let order = small.get("OrderWorkflow").unwrap().clone();
    let resolved = Resolver::default()
        .resolve_from(&order.name, "validateOrder", &order.file_path)
        .unwrap();
    assert!(small.merge_resolved(resolved));
    assert_eq!(small.get("validateOrder").unwrap().parents, vec!["OrderWorkflow"]);
    assert!(small.is_synthetic_parent("validateOrder", "OrderWorkflow"));
}

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[test]
fn test_index_compact() {
    let dir = fixture();
    let stdout = run_success(&["index", dir.path().to_str().unwrap()]);
    assert!(stdout.contains("workflow 2 activity 2"), "stdout: {stdout}");
    assert!(stdout.contains("max_depth 3"), "stdout: {stdout}");
}

#[test]
fn test_index_json_output() {
    let dir = fixture();
    let stdout = run_success(&["index", dir.path().to_str().unwrap(), "--format", "json"]);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("index --format json output is not valid JSON");
    assert_eq!(parsed["file_count"].as_u64(), Some(5));
    assert_eq!(parsed["workflows"].as_u64(), Some(2));
    assert_eq!(parsed["activities"].as_u64(), Some(2));
    assert_eq!(parsed["query_handlers"].as_u64(), Some(1));
}

#[test]
fn test_index_warns_on_stderr() {
    let dir = fixture();
    let out = Command::new(binary())
        .args(["index", dir.path().to_str().unwrap()])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("broken.go"), "stderr: {stderr}");
}

#[test]
fn test_tree_output() {
    let dir = fixture();
    let stdout = run_success(&["tree", dir.path().to_str().unwrap()]);
    assert!(stdout.contains("OrderWorkflow [workflow]"), "stdout: {stdout}");
    assert!(
        stdout.contains("  PaymentActivity [activity] via activity"),
        "stdout: {stdout}"
    );
    assert!(
        stdout.contains("    BookCourierActivity [activity] via activity"),
        "stdout: {stdout}"
    );
}

#[test]
fn test_packages_json() {
    let dir = fixture();
    let stdout = run_success(&["packages", dir.path().to_str().unwrap(), "--format", "json"]);
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert!(rows.iter().any(|r| r["key"] == "dir:internal/order"));
    assert!(rows.iter().any(|r| r["key"] == "node:OrderWorkflow"));
}

#[test]
fn test_show_node() {
    let dir = fixture();
    let stdout = run_success(&["show", "ShippingWorkflow", dir.path().to_str().unwrap()]);
    assert!(stdout.contains("ShippingWorkflow [workflow]"), "stdout: {stdout}");
    assert!(stdout.contains("internal/shipping/shipping.go:5"), "stdout: {stdout}");
    assert!(stdout.contains("OrderWorkflow"), "stdout: {stdout}");
    assert!(stdout.contains("activity BookCourierActivity"), "stdout: {stdout}");
}

#[test]
fn test_show_unknown_node_fails() {
    let dir = fixture();
    let (_, stderr) = run_failure(&["show", "NopeWorkflow", dir.path().to_str().unwrap()]);
    assert!(stderr.contains("no node named"), "stderr: {stderr}");
}

#[test]
fn test_find_with_kind_filter() {
    let dir = fixture();
    let stdout = run_success(&[
        "find",
        "order",
        dir.path().to_str().unwrap(),
        "-i",
        "--kind",
        "workflow",
    ]);
    let defs: Vec<&str> = stdout.lines().filter(|l| l.starts_with("def")).collect();
    assert_eq!(defs.len(), 1, "stdout: {stdout}");
    assert!(defs[0].starts_with("def OrderWorkflow internal/order/workflow.go:"));
}

#[test]
fn test_name_filter_flag() {
    let dir = fixture();
    let stdout = run_success(&[
        "index",
        dir.path().to_str().unwrap(),
        "--name",
        "Activity$",
        "--format",
        "json",
    ]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["workflows"].as_u64(), Some(0));
    assert_eq!(parsed["activities"].as_u64(), Some(1));
}

#[test]
fn test_invalid_filter_is_fatal() {
    let dir = fixture();
    let (_, stderr) = run_failure(&["index", dir.path().to_str().unwrap(), "--name", "(oops"]);
    assert!(stderr.contains("invalid name filter"), "stderr: {stderr}");
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = fixture();
    let missing = dir.path().join("does-not-exist");
    run_failure(&["index", missing.to_str().unwrap()]);
}

#[test]
fn test_resolve_command() {
    let dir = fixture();
    let start = dir.path().join("internal/order/workflow.go");
    let stdout = run_success(&[
        "resolve",
        "PaymentActivity",
        start.to_str().unwrap(),
        "--caller",
        "OrderWorkflow",
        "--format",
        "json",
    ]);
    let node: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(node["classification"], "activity");
    assert_eq!(node["package"], "billing");
    assert_eq!(node["parents"][0], "OrderWorkflow");

    run_failure(&["resolve", "missingHelper", start.to_str().unwrap()]);
}

#[test]
fn test_resolve_from_relative_file_searches_its_directory() {
    let dir = fixture();
    let out = Command::new(binary())
        .current_dir(dir.path().join("internal/order"))
        .args(["resolve", "validateOrder", "workflow.go", "--format", "json"])
        .output()
        .expect("failed to invoke workflow-graph binary");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let node: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(node["name"], "validateOrder");
    assert_eq!(node["package"], "order");
}

#[test]
fn test_cycles_command() {
    let dir = fixture();
    write(
        dir.path(),
        "internal/loop/loop.go",
        r#"package loop

import "go.temporal.io/sdk/workflow"

func PingWorkflow(ctx workflow.Context) error {
	return workflow.ExecuteChildWorkflow(ctx, PongWorkflow).Get(ctx, nil)
}

func PongWorkflow(ctx workflow.Context) error {
	return workflow.ExecuteChildWorkflow(ctx, PingWorkflow).Get(ctx, nil)
}
"#,
    );
    let stdout = run_success(&["cycles", dir.path().to_str().unwrap()]);
    assert!(
        stdout.contains("cycle PingWorkflow -> PongWorkflow -> PingWorkflow"),
        "stdout: {stdout}"
    );
    assert!(stdout.contains("1 cycles found"), "stdout: {stdout}");
}

#[test]
fn test_config_file_adds_exclusions() {
    let dir = fixture();
    write(dir.path(), "workflow-graph.toml", "exclude = [\"cmd\"]\n");
    let stdout = run_success(&["find", "approveOrder", dir.path().to_str().unwrap()]);
    assert!(stdout.contains("0 nodes found"), "stdout: {stdout}");
}
