use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gridguide_core::marks::compute_marks;
use gridguide_core::{DateBounds, DateRange, JumpMarks, WindowCalculator};
use gridguide_runtime_config::GuideConfig;
use gridguide_sync::bounds_from_settings;
use serde::Serialize;

use crate::output::{OutputFormat, describe_marks, describe_window, print_json};

#[derive(Debug, Serialize)]
struct MarksReport {
    bounds: DateBounds,
    marks: JumpMarks,
}

pub fn run_marks(
    config: &GuideConfig,
    left: DateTime<Utc>,
    right: DateTime<Utc>,
    now: Option<DateTime<Utc>>,
    format: OutputFormat,
) -> Result<()> {
    let visible = DateRange::new(left, right).context("--left must be before --right")?;
    let bounds = bounds_from_settings(now.unwrap_or_else(Utc::now), &config.bounds)
        .context("Invalid [bounds] configuration")?;
    let marks = compute_marks(&visible, &bounds);

    match format {
        OutputFormat::Json => print_json(&MarksReport { bounds, marks }),
        OutputFormat::Text => {
            println!("{}", describe_marks(&marks));
            Ok(())
        }
    }
}

pub fn run_window(config: &GuideConfig, scroll_y: f64, height: f64, total: usize) -> Result<()> {
    let window = WindowCalculator::compute_channel_window(
        scroll_y,
        height,
        config.layout.row_height,
        total,
    );
    println!("{}", describe_window(&window, total));
    Ok(())
}
