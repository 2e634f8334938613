use anyhow::Result;
use setupkit::{Executor, SystemExecutor};
use std::path::Path;
use std::sync::Arc;

use crate::Context;
use crate::paths;
use crate::plan::Plan;
use crate::ui;

pub fn run(ctx: &Context, plan: Option<&Path>) -> Result<()> {
    let plan_path = paths::plan_file(plan);
    let plan = Plan::load(&plan_path)?;
    let executor: Arc<dyn Executor> = Arc::new(SystemExecutor::new(ctx.elevation.clone()));

    ui::header(&format!("Plan {}", plan_path.display()));

    let mut sections = 0;
    for (mode, section) in plan.sections() {
        sections += 1;
        ui::section(&format!("{mode}: {}", section.purpose));

        if let Some(state) = section.install_state() {
            ui::kv("Environment", &state.env_path);
            if !state.exec_paths.is_empty() {
                ui::kv("Executables", &state.exec_paths.join(", "));
            }
        }

        let tasks = section.build_tasks(&executor)?;
        let total = tasks.len();
        for (i, task) in tasks.iter().enumerate() {
            ui::step(i + 1, total, task.purpose());
            ui::dim(&task.action().describe());
            for requirement in task.requirement_list() {
                ui::dim(&format!("requires: {}", requirement.purpose()));
            }
        }
        if total == 0 {
            ui::dim("no tasks");
        }
    }

    if sections == 0 {
        ui::warn("Plan has no install, update or uninstall section");
    }
    println!();
    Ok(())
}
