pub mod html;
pub mod json;
pub mod types;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::runner::context::RunContext;
pub use types::RunReport;

pub const RESULTS_FILE: &str = "results.json";
pub const HTML_FILE: &str = "report.html";

/// Generate report from saved run results
pub async fn generate_report(
    results_path: &Path,
    format: &str,
    photos_dir: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let results = RunReport::load(results_path)?;

    match format {
        "json" => json::generate(&results, output).await,
        "html" => html::generate(&results, photos_dir, output).await,
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}

/// Write `results.json` and `report.html` into the results directory
pub async fn write_run_reports(results: &RunReport, context: &RunContext) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(&context.results_dir)?;
    let json_path = context.output_path(RESULTS_FILE);
    let html_path = context.output_path(HTML_FILE);

    json::generate(results, Some(&json_path)).await?;
    html::generate(results, &context.photos_dir, Some(&html_path)).await?;
    Ok((json_path, html_path))
}
