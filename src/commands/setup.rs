use anyhow::Result;
use setupkit::{
    Executor, FileSystem, Setup, SetupMode, SetupReport, StateSession, SystemExecutor,
};
use std::path::Path;
use std::sync::Arc;

use crate::Context;
use crate::paths;
use crate::plan::Plan;
use crate::sudo::{self, SudoContext};
use crate::ui::{self, ConsoleReporter};

/// Run one section of a plan; returns the process exit code
pub fn run(ctx: &Context, mode: SetupMode, plan: Option<&Path>) -> Result<i32> {
    let plan_path = paths::plan_file(plan);
    let plan = Plan::load(&plan_path)?;
    let section = plan.section(mode)?;

    let executor: Arc<dyn Executor> = Arc::new(SystemExecutor::new(ctx.elevation.clone()));
    let tasks = section.build_tasks(&executor)?;

    let _sudo = if sudo::required(&ctx.elevation, mode, section.has_elevated_tasks()) {
        Some(SudoContext::acquire(&format!("{} modifies system paths", section.purpose))?)
    } else {
        None
    };

    let fs = FileSystem::new(Arc::clone(&executor), ctx.elevation.is_enabled());
    let session = StateSession::new(mode, &ctx.config, section.install_state(), fs);

    let mut reporter = ConsoleReporter::new(ctx.quiet);
    let report = Setup::new(section.purpose.clone(), session, executor)
        .tasks(tasks)
        .process(&mut reporter);

    summarize(ctx, mode, &report);
    Ok(report.exit_code())
}

fn summarize(ctx: &Context, mode: SetupMode, report: &SetupReport) {
    println!();
    let Some(err) = &report.error else {
        if !ctx.quiet {
            let done = report.completed().len();
            ui::success(&format!("{} finished ({done} task(s))", report.purpose));
        }
        return;
    };

    ui::error(&format!("{} failed: {err}", report.purpose));
    let category = err.category();
    ui::dim(&format!("{}: {}", category.description(), category.advice()));

    if report.restored {
        match &report.restore_error {
            None => ui::info("Previous installation restored from snapshot"),
            Some(restore) => ui::error(&format!("Rollback incomplete: {restore}")),
        }
    } else if matches!(mode, SetupMode::Install) && !report.completed().is_empty() {
        ui::warn("A fresh install has no snapshot; completed steps were left in place");
    }

    if let Some(cleanup) = &report.cleanup_error {
        ui::warn(&format!("Snapshot was not removed: {cleanup}"));
    }
}
