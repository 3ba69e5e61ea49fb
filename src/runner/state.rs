use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::flow::ItemOutcome;
use crate::pages::CartState;
use crate::report::types::RunReport;

/// Step execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed { error: String },
    /// Finished with a problem that does not fail the scenario
    Degraded { warning: String },
    Skipped { reason: String },
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Passed
                | StepStatus::Failed { .. }
                | StepStatus::Degraded { .. }
                | StepStatus::Skipped { .. }
        )
    }
}

/// One stage of a scenario: login, search, add loop, cart check
#[derive(Debug, Clone)]
pub struct StepState {
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
    pub started_at: Option<Instant>,
    pub duration_ms: Option<u64>,
}

impl StepState {
    pub fn new(index: usize, name: &str) -> Self {
        Self {
            index,
            name: name.to_string(),
            status: StepStatus::Pending,
            started_at: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn pass(&mut self) {
        self.finish(StepStatus::Passed);
    }

    pub fn fail(&mut self, error: String) {
        self.finish(StepStatus::Failed { error });
    }

    pub fn degrade(&mut self, warning: String) {
        self.finish(StepStatus::Degraded { warning });
    }

    pub fn skip(&mut self, reason: String) {
        self.status = StepStatus::Skipped { reason };
    }

    fn finish(&mut self, status: StepStatus) {
        self.status = status;
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    pub fn to_report(&self) -> StepStateReport {
        StepStateReport {
            index: self.index,
            name: self.name.clone(),
            status: self.status.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStateReport {
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScenarioStatus {
    Pending,
    Running,
    Passed,
    Failed,
}

pub const STEP_LOGIN: usize = 0;
pub const STEP_SEARCH: usize = 1;
pub const STEP_ADD_TO_CART: usize = 2;
pub const STEP_CART_TOTAL: usize = 3;

const STEP_NAMES: [&str; 4] = ["login", "search", "add to cart", "cart total"];

/// State of one scenario run
#[derive(Debug, Clone)]
pub struct ScenarioState {
    pub name: String,
    pub user_key: String,
    pub status: ScenarioStatus,
    pub steps: Vec<StepState>,
    pub collected_urls: Vec<String>,
    pub items: Vec<ItemOutcome>,
    pub cart: Option<CartState>,
    pub error: Option<String>,
    pub started_at: Option<Instant>,
    pub total_duration_ms: Option<u64>,
}

impl ScenarioState {
    pub fn new(name: &str, user_key: &str) -> Self {
        Self {
            name: name.to_string(),
            user_key: user_key.to_string(),
            status: ScenarioStatus::Pending,
            steps: STEP_NAMES
                .iter()
                .enumerate()
                .map(|(i, n)| StepState::new(i, n))
                .collect(),
            collected_urls: Vec::new(),
            items: Vec::new(),
            cart: None,
            error: None,
            started_at: None,
            total_duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = ScenarioStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut StepState> {
        self.steps.get_mut(index)
    }

    pub fn skip_remaining(&mut self, reason: &str) {
        for step in &mut self.steps {
            if matches!(step.status, StepStatus::Pending) {
                step.skip(reason.to_string());
            }
        }
    }

    /// Passed unless a step failed; degraded steps still pass
    pub fn finish(&mut self) {
        if let Some(start) = self.started_at {
            self.total_duration_ms = Some(start.elapsed().as_millis() as u64);
        }
        let failed = self
            .steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Failed { .. }));
        self.status = if failed {
            ScenarioStatus::Failed
        } else {
            ScenarioStatus::Passed
        };
    }

    pub fn to_report(&self) -> ScenarioReport {
        ScenarioReport {
            name: self.name.clone(),
            user_key: self.user_key.clone(),
            status: self.status.clone(),
            steps: self.steps.iter().map(|s| s.to_report()).collect(),
            collected_urls: self.collected_urls.clone(),
            items: self.items.clone(),
            cart: self.cart.clone(),
            total_duration_ms: self.total_duration_ms,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub name: String,
    pub user_key: String,
    pub status: ScenarioStatus,
    pub steps: Vec<StepStateReport>,
    pub collected_urls: Vec<String>,
    pub items: Vec<ItemOutcome>,
    pub cart: Option<CartState>,
    pub total_duration_ms: Option<u64>,
    pub error: Option<String>,
}

/// Whole run state
#[derive(Debug, Clone)]
pub struct RunSessionState {
    pub session_id: String,
    pub scenarios: Vec<ScenarioState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl RunSessionState {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            scenarios: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            session_id: self.session_id.clone(),
            total_scenarios: self.scenarios.len() as u32,
            ..RunSummary::default()
        };

        for scenario in &self.scenarios {
            match scenario.status {
                ScenarioStatus::Passed => summary.passed += 1,
                ScenarioStatus::Failed => summary.failed += 1,
                _ => {}
            }
            for step in &scenario.steps {
                match step.status {
                    StepStatus::Skipped { .. } => summary.skipped_steps += 1,
                    StepStatus::Degraded { .. } => summary.degraded_steps += 1,
                    _ => {}
                }
            }
            summary.items_attempted += scenario.items.len() as u32;
            summary.items_confirmed += scenario
                .items
                .iter()
                .filter(|item| item.is_confirmed())
                .count() as u32;
        }

        summary.total_duration_ms = self.started_at.map(|start| {
            self.finished_at
                .unwrap_or_else(Instant::now)
                .duration_since(start)
                .as_millis() as u64
        });
        summary
    }

    pub fn to_report(&self) -> RunReport {
        RunReport {
            session_id: self.session_id.clone(),
            generated_at: chrono::Local::now().to_rfc3339(),
            scenarios: self.scenarios.iter().map(|s| s.to_report()).collect(),
            summary: self.summary(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub session_id: String,
    pub total_scenarios: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped_steps: u32,
    #[serde(default)]
    pub degraded_steps: u32,
    pub items_attempted: u32,
    pub items_confirmed: u32,
    pub total_duration_ms: Option<u64>,
}
