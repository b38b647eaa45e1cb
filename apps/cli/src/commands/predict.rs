//! Predict command implementation.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use colored::Colorize;
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL};
use covcast_core::{Config, ForecastPoint, RequestValidator, build_service};
use serde_json::json;

pub async fn execute(
    config: &Config,
    region: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
    json_output: bool,
) -> Result<()> {
    let service = build_service(config).context("Failed to build forecast service")?;
    let end = end.unwrap_or_else(|| service.default_end(start));

    let validator = RequestValidator::new(config.validation.clone());
    let invalid = validator.check_all(start, end, region, true, Utc::now().date_naive());
    if !invalid.is_empty() {
        for param in &invalid {
            eprintln!("{} {}: {}", "✗".red(), param.field.bold(), param.message);
        }
        bail!("Invalid forecast request");
    }

    let timeline = service
        .resolve_and_forecast(region, start, Some(end))
        .await
        .with_context(|| format!("Failed to forecast region {region}"))?;

    if json_output {
        let out: Vec<_> = timeline
            .iter()
            .map(|p| json!({"date": p.date, "cases": p.value.round() as i64, "predicted": p.predicted}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Forecast for {region} ({start} to {end})").bold().cyan());
    println!();
    println!("{}", render_table(&timeline));
    Ok(())
}

fn render_table(timeline: &[ForecastPoint]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Date", "Cases", "Source"]);

    for point in timeline {
        let source = if point.predicted {
            Cell::new("predicted").fg(Color::Yellow)
        } else {
            Cell::new("observed").fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(point.date),
            Cell::new(format!("{:.0}", point.value)),
            source,
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use covcast_abstraction::SeriesPoint;

    #[test]
    fn test_render_table_marks_sources() {
        let day = |d| NaiveDate::from_ymd_opt(2022, 1, d).unwrap();
        let timeline = vec![
            ForecastPoint::observed(SeriesPoint::new(day(10), 120.0)),
            ForecastPoint::predicted(SeriesPoint::new(day(11), 131.6)),
        ];
        let rendered = render_table(&timeline).to_string();
        assert!(rendered.contains("2022-01-10"));
        assert!(rendered.contains("observed"));
        assert!(rendered.contains("132"));
        assert!(rendered.contains("predicted"));
    }
}
