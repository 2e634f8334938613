use anyhow::{Context as _, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use setupkit::StateStore;
use std::fs;
use std::path::Path;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let store = StateStore::new(&ctx.config.state_file);
    let Some(state) = store.read()? else {
        if json {
            println!("null");
        } else {
            ui::warn(&format!(
                "No installation recorded at {}",
                store.path().display()
            ));
        }
        return Ok(());
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&state).context("Could not serialize state")?
        );
        return Ok(());
    }

    ui::header("Installation");
    ui::kv("State", &store.path().display().to_string());
    if let Some(recorded) = recorded_at(store.path()) {
        ui::kv("Recorded", &recorded);
    }
    ui::kv("Environment", &presence(&state.env_path));

    ui::section("Executables");
    if state.exec_paths.is_empty() {
        ui::dim("none");
    }
    for exec in &state.exec_paths {
        println!("  {}", presence(exec));
    }
    println!();
    Ok(())
}

fn presence(path: &str) -> String {
    if setupkit::path::exists(Path::new(path)) {
        format!("{} {path}", "✓".green())
    } else {
        format!("{} {path} {}", "✗".red(), "(missing)".red())
    }
}

fn recorded_at(path: &Path) -> Option<String> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let local: DateTime<Local> = modified.into();
    Some(local.format("%Y-%m-%d %H:%M:%S").to_string())
}
