//! Ember - headless arena runner for the skill and combat engine
//!
//! Usage: `ember [settings.toml]`. Without an argument, settings come from
//! `~/.config/ember/settings.toml` and fall back to defaults.
//! `ember --init` writes the default settings to that location.

mod arena;
mod settings;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ember_combat::SkillCatalog;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use settings::SimSettings;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    info!("Starting Ember arena...");

    let arg = std::env::args().nth(1);
    if arg.as_deref() == Some("--init") {
        return SimSettings::default().save();
    }
    let settings_path = arg.map(PathBuf::from);
    let settings = SimSettings::load(settings_path.as_deref());

    let catalog = match &settings.arena.catalog {
        Some(path) => SkillCatalog::load(path).with_context(|| format!("Failed to load skill catalog {:?}", path))?,
        None => SkillCatalog::starter().context("Failed to load starter skills")?,
    };
    info!("Skill catalog ready ({} skills)", catalog.len());

    let report = arena::run(&settings, &catalog)?;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;

    match &settings.arena.report {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write report to {:?}", path))?;
            info!("Report written to {:?}", path);
        }
        None => println!("{json}"),
    }

    info!("Ember arena shutdown complete");
    Ok(())
}
