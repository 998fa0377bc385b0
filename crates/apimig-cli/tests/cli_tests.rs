//! Command line tests

use apimig_cli::{build_cli, run};
use apimig_test_utils::{read_fixture, write_fixture, LEGACY_SERVICE, LEGACY_SERVICE_MIGRATED};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

async fn invoke(args: &[&str]) -> anyhow::Result<(bool, String)> {
    let matches = build_cli().try_get_matches_from(std::iter::once("apimig").chain(args.iter().copied()))?;
    let mut out = Vec::new();
    let clean = run(&matches, &mut out).await?;
    Ok((clean, String::from_utf8(out)?))
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), "src/lib/api/leave.ts", LEGACY_SERVICE);
    dir
}

fn config_file(dir: &Path, body: &str) -> String {
    let path = dir.join("apimig.toml");
    std::fs::write(&path, body).unwrap();
    path.display().to_string()
}

#[test]
fn command_definition_is_valid() {
    build_cli().debug_assert();
}

#[tokio::test]
async fn migrate_dry_run_then_write() {
    let dir = project();
    let root = dir.path().display().to_string();
    let file = dir.path().join("src/lib/api/leave.ts");

    let (clean, out) = invoke(&["migrate", &root]).await.unwrap();
    assert!(clean);
    assert!(out.contains("would migrate"));
    assert!(out.contains("1 scanned, 1 changed, 0 unchanged, 0 tests skipped, 0 failed (dry run)"));
    assert_eq!(read_fixture(&file), LEGACY_SERVICE);

    let (clean, out) = invoke(&["migrate", "--write", "--json", &root]).await.unwrap();
    assert!(clean);
    let summary: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(summary["mode"], "write");
    assert_eq!(summary["changed"].as_array().map(Vec::len), Some(1));
    assert_eq!(read_fixture(&file), LEGACY_SERVICE_MIGRATED);

    let (clean, out) = invoke(&["verify", &root]).await.unwrap();
    assert!(clean, "{out}");
}

#[tokio::test]
async fn analyze_prints_csv() {
    let dir = project();
    let (clean, out) = invoke(&["analyze", &dir.path().display().to_string()]).await.unwrap();
    assert!(clean);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("path,role,preset"));
    assert!(lines[1].ends_with(",2,true,"));
}

#[tokio::test]
async fn rollout_decide_uses_config_file() {
    let dir = TempDir::new().unwrap();
    let config = config_file(
        dir.path(),
        "[rollout]\nenabled = true\nenabled_paths = [\"/admin\"]\ndisabled_paths = [\"/admin/legacy\"]\n",
    );
    let (_, out) = invoke(&["--config", &config, "rollout", "decide", "/admin/users", "/billing", "/admin/legacy/x"])
        .await
        .unwrap();
    assert_eq!(
        out,
        "/admin/users -> new (path is allow-listed)\n\
         /billing -> old (path is not allow-listed)\n\
         /admin/legacy/x -> old (path is deny-listed)\n"
    );
}

#[tokio::test]
async fn rollout_status_persists_token() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("rollout.json");
    let config = config_file(
        dir.path(),
        &format!("[store]\npath = {:?}\n", store.display().to_string()),
    );
    let (_, first) = invoke(&["--config", &config, "rollout", "status", "--json"]).await.unwrap();
    let (_, second) = invoke(&["--config", &config, "rollout", "status", "--json"]).await.unwrap();
    let first: serde_json::Value = serde_json::from_str(&first).unwrap();
    let second: serde_json::Value = serde_json::from_str(&second).unwrap();
    assert_eq!(first["assignment"]["token"], second["assignment"]["token"]);
    assert_eq!(first["assignment"]["persisted"], true);
    assert!(store.exists());
}

#[tokio::test]
async fn compare_requires_debug_mode() {
    let dir = TempDir::new().unwrap();
    let config = config_file(dir.path(), "[rollout]\ndebug_mode = false\n");
    let err = invoke(&["--config", &config, "rollout", "compare", "/me"]).await.unwrap_err();
    assert!(err.to_string().contains("requires debug mode"));
}

#[tokio::test]
async fn interceptor_order_and_check() {
    let (_, out) = invoke(&["interceptors", "order", "error", "retry", "logging", "auth"]).await.unwrap();
    assert_eq!(out, "logging -> auth -> retry -> error\n");

    let (_, out) = invoke(&["interceptors", "check", "--method", "post", "--cached", "/orders"]).await.unwrap();
    assert_eq!(
        out,
        "logging  skip\nauth     run\ncustom   run\nretry    run\nerror    skip\n"
    );
}

#[tokio::test]
async fn unknown_interceptor_is_rejected() {
    assert!(invoke(&["interceptors", "order", "tracing"]).await.is_err());
}
