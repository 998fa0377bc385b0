//! Subcommand implementations
//!
//! Each command writes its report to `out` and returns whether the run was
//! clean; the binary maps that to the exit code.

use crate::config::ToolkitConfig;
use anyhow::{bail, Context};
use apimig_codemod::{BatchMode, BatchRunner, MigrationStatus, Rewriter, UsageReport};
use apimig_core::{InterceptorType, Preset};
use apimig_interceptor::{HttpMethod, InterceptorOptimizer, RequestContext};
use apimig_rollout::{DebugConsole, HttpProbe, MigrationClientFactory, RolloutController};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

fn runner(config: &ToolkitConfig) -> BatchRunner {
    BatchRunner::new(Rewriter::new(config.rewrite.clone()))
}

fn controller(config: &ToolkitConfig) -> RolloutController {
    RolloutController::with_store(config.rollout.clone(), config.store.open())
}

/// Rewrite every candidate under `roots`
///
/// # Errors
/// Fails on discovery or output errors; per-file failures are reported
pub fn migrate<W: Write>(
    config: &ToolkitConfig,
    roots: &[PathBuf],
    write: bool,
    json: bool,
    out: &mut W,
) -> anyhow::Result<bool> {
    let mode = if write { BatchMode::Write } else { BatchMode::DryRun };
    let summary = runner(config).run(roots, mode)?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &summary)?;
        writeln!(out)?;
        return Ok(summary.is_clean());
    }

    let verb = if write { "migrated" } else { "would migrate" };
    for file in &summary.changed {
        writeln!(
            out,
            "{verb} {} [{}] preset={}",
            file.path.display(),
            file.applied_rules.join(", "),
            file.preset
        )?;
    }
    for failure in &summary.failures {
        let kind = if failure.parse_failure { "parse error" } else { "error" };
        writeln!(out, "{kind}: {}: {}", failure.path.display(), failure.message)?;
    }
    writeln!(
        out,
        "{} scanned, {} changed, {} unchanged, {} tests skipped, {} failed{}",
        summary.scanned,
        summary.changed.len(),
        summary.unchanged,
        summary.skipped_tests,
        summary.failures.len(),
        if write { "" } else { " (dry run)" }
    )?;
    Ok(summary.is_clean())
}

/// Usage inventory as CSV
///
/// # Errors
/// Fails on discovery or output errors; per-file failures go to the log
pub fn analyze<W: Write>(config: &ToolkitConfig, roots: &[PathBuf], out: &mut W) -> anyhow::Result<bool> {
    let (reports, failures) = runner(config).analyze(roots)?;
    writeln!(out, "{}", UsageReport::csv_header())?;
    for report in &reports {
        writeln!(out, "{}", report.to_csv_row())?;
    }
    for failure in &failures {
        tracing::warn!("Skipped {}: {}", failure.path.display(), failure.message);
    }
    let pending = reports.iter().filter(|r| r.needs_migration).count();
    tracing::info!("{} files analyzed, {} need migration", reports.len(), pending);
    Ok(failures.is_empty())
}

/// Post-migration check
///
/// Clean when no file is failed or partial.
///
/// # Errors
/// Fails on discovery or output errors
pub fn verify<W: Write>(
    config: &ToolkitConfig,
    roots: &[PathBuf],
    json: bool,
    out: &mut W,
) -> anyhow::Result<bool> {
    let (reports, failures) = runner(config).verify(roots)?;
    let broken = reports
        .iter()
        .filter(|r| matches!(r.status, MigrationStatus::Failed | MigrationStatus::Partial))
        .count();

    if json {
        serde_json::to_writer_pretty(&mut *out, &serde_json::json!({
            "reports": reports,
            "failures": failures,
        }))?;
        writeln!(out)?;
        return Ok(broken == 0 && failures.is_empty());
    }

    for report in &reports {
        writeln!(out, "{:<8} {}", report.status, report.path.display())?;
        for issue in &report.issues {
            writeln!(out, "         - {issue}")?;
        }
    }
    for failure in &failures {
        writeln!(out, "{:<8} {}: {}", "error", failure.path.display(), failure.message)?;
    }
    writeln!(out, "{} verified, {} need attention", reports.len(), broken + failures.len())?;
    Ok(broken == 0 && failures.is_empty())
}

/// Current rollout status
///
/// # Errors
/// Fails on output errors
pub fn rollout_status<W: Write>(config: &ToolkitConfig, json: bool, out: &mut W) -> anyhow::Result<bool> {
    let status = controller(config).status();
    if json {
        serde_json::to_writer_pretty(&mut *out, &status)?;
        writeln!(out)?;
    } else {
        write!(out, "{status}")?;
    }
    Ok(true)
}

/// Decision for each path
///
/// # Errors
/// Fails on output errors
pub fn rollout_decide<W: Write>(config: &ToolkitConfig, paths: &[String], out: &mut W) -> anyhow::Result<bool> {
    let controller = controller(config);
    if paths.is_empty() {
        let decision = controller.decide(None);
        writeln!(out, "(no path) -> {} ({})", variant_word(decision.use_new), decision.reason)?;
    }
    for path in paths {
        let decision = controller.decide(Some(path));
        writeln!(out, "{path} -> {} ({})", variant_word(decision.use_new), decision.reason)?;
    }
    Ok(true)
}

fn variant_word(use_new: bool) -> &'static str {
    if use_new {
        "new"
    } else {
        "old"
    }
}

/// Time one request through each variant
///
/// # Errors
/// Fails outside debug mode, or if either request fails
pub async fn rollout_compare<W: Write>(
    config: &ToolkitConfig,
    preset: Preset,
    path: &str,
    out: &mut W,
) -> anyhow::Result<bool> {
    let factory = MigrationClientFactory::new(Arc::new(controller(config)), config.client.clone());
    let Some(console) = DebugConsole::attach(&factory) else {
        bail!("performance comparison requires debug mode (set APIMIG_DEBUG=true)");
    };
    let comparison = console
        .compare_performance(&HttpProbe, preset, path)
        .await
        .context("performance probe failed")?;
    writeln!(out, "{comparison}")?;
    Ok(true)
}

/// Execution order and optimizer report
///
/// # Errors
/// Fails on output errors
pub fn interceptors_order<W: Write>(
    config: &ToolkitConfig,
    types: &[InterceptorType],
    out: &mut W,
) -> anyhow::Result<bool> {
    let optimizer = InterceptorOptimizer::new(config.interceptors.clone());
    let types = if types.is_empty() {
        InterceptorType::ALL.to_vec()
    } else {
        types.to_vec()
    };
    let order: Vec<&str> = optimizer
        .optimize_execution_order(&types)
        .iter()
        .map(|t| t.as_str())
        .collect();
    writeln!(out, "{}", order.join(" -> "))?;
    Ok(true)
}

/// Which stages run for one request
///
/// # Errors
/// Fails on output errors
pub fn interceptors_check<W: Write>(
    config: &ToolkitConfig,
    context: &RequestContext,
    out: &mut W,
) -> anyhow::Result<bool> {
    let optimizer = InterceptorOptimizer::new(config.interceptors.clone());
    for kind in optimizer.optimize_execution_order(&InterceptorType::ALL) {
        let verdict = if optimizer.should_execute(kind, context) { "run" } else { "skip" };
        writeln!(out, "{:<8} {verdict}", kind.as_str())?;
    }
    Ok(true)
}

/// Request context from CLI flags
#[must_use]
pub fn request_context(method: HttpMethod, url: &str, cached: bool, success: bool) -> RequestContext {
    let mut context = RequestContext::new(method, url);
    if cached {
        context = context.cached();
    }
    if success {
        context = context.succeeded();
    }
    context
}
