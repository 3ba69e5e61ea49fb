use super::types::RunReport;
use anyhow::{Context, Result};
use std::path::Path;

/// Generate JSON report
pub async fn generate(results: &RunReport, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;

    if let Some(path) = output {
        std::fs::write(path, json)
            .with_context(|| format!("cannot write {}", path.display()))?;
        log::info!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}
