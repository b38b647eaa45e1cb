//! Training command implementation.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use covcast_core::{Config, RequestValidator, build_service};

pub async fn execute(config: &Config, regions: Vec<String>) -> Result<()> {
    let validator = RequestValidator::new(config.validation.clone());
    let regions =
        if regions.is_empty() { config.validation.available_regions.clone() } else { regions };

    if let Some(unknown) = regions.iter().find(|r| !validator.check_region(r)) {
        bail!("Region {unknown} is not available");
    }

    let service = build_service(config).context("Failed to build forecast service")?;

    println!();
    println!("{}", format!("Training {} region(s)", regions.len()).bold().cyan());
    println!();

    for region in &regions {
        let summary = service
            .train_region(region)
            .await
            .with_context(|| format!("Failed to train region {region}"))?;
        println!(
            "  {} {:<14} {} observations, last true date {}",
            "✓".green(),
            summary.identity.key().cyan(),
            summary.observations,
            summary.last_true_date.to_string().bold()
        );
    }
    println!();
    Ok(())
}
