use crate::runner::state::{RunSummary, ScenarioReport};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Run results as written to `results.json` and read back for reports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub session_id: String,
    pub scenarios: Vec<ScenarioReport>,
    pub summary: RunSummary,
    pub generated_at: String,
}

impl RunReport {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read results file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid results file {}", path.display()))
    }
}
