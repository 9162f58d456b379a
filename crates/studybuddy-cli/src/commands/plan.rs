use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use studybuddy_core::{Config, PlanEntry, SessionPlan};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Print a blank plan shaped by the current config
    Template {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate a plan file against the current config
    Check {
        /// Plan file (.toml or .json)
        file: PathBuf,
    },
}

/// On-disk plan: one entry per student.
#[derive(Debug, Serialize, Deserialize)]
struct PlanFile {
    students: Vec<PlanEntry>,
}

/// Read a plan file. `.json` files are parsed as JSON, anything else as TOML.
pub fn load_plan(path: &Path) -> Result<SessionPlan, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read plan {}: {e}", path.display()))?;
    let file: PlanFile = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        _ => toml::from_str(&content)?,
    };
    Ok(SessionPlan::from_entries(file.students))
}

pub fn run(action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    match action {
        PlanAction::Template { out } => {
            let file = PlanFile {
                students: SessionPlan::skeleton(&config).to_entries(),
            };
            let content = toml::to_string_pretty(&file)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("plan template written to {}", path.display());
                }
                None => print!("{content}"),
            }
        }
        PlanAction::Check { file } => {
            let plan = load_plan(&file)?;
            plan.validate(&config)?;
            println!(
                "ok: {} students, {} sessions each",
                plan.students.len(),
                config.num_sessions
            );
        }
    }
    Ok(())
}
