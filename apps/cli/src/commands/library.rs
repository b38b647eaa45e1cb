//! Library command implementation: lists the persisted models.

use anyhow::{Context, Result};
use colored::Colorize;
use covcast_core::Config;
use covcast_store::{StoreLayout, discover_persisted_models};
use serde_json::json;

pub fn execute(config: &Config, json_output: bool) -> Result<()> {
    let layout = StoreLayout::for_data_dir(&config.store.data_dir);
    let models = discover_persisted_models(layout.root())
        .context("Failed to discover persisted models")?;

    if json_output {
        let out: Vec<_> = models
            .iter()
            .map(|m| {
                json!({
                    "key": m.identity.key(),
                    "kind": m.identity.kind,
                    "region": m.identity.region,
                    "last_true_date": m.last_true_date,
                    "saved_at": m.saved_at,
                    "path": m.path,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Persisted Models ({})", models.len()).bold().cyan());
    println!();

    if models.is_empty() {
        println!("  {}", "No models found in the model store.".dimmed());
        println!();
        println!("  {}", "Tip: run `covcast train` to fit and save region models.".dimmed());
        return Ok(());
    }

    println!("{:<16} {:<16} {}", "Model", "Last true date", "Saved at");
    println!("{}", "─".repeat(60));
    for m in models {
        println!(
            "{:<16} {:<16} {}",
            m.identity.key().cyan(),
            m.last_true_date.to_string(),
            m.saved_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!();
    Ok(())
}
