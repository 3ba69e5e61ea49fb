use anyhow::Result;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::context::RunContext;
use super::events::{EventEmitter, RunEvent};
use super::flow::ShoppingFlow;
use super::state::{
    RunSessionState, ScenarioState, STEP_ADD_TO_CART, STEP_CART_TOTAL, STEP_LOGIN, STEP_SEARCH,
};
use crate::driver::traits::PageDriver;
use crate::error::FlowError;
use crate::parser::types::{CredentialMap, Scenario};
use crate::report::{self, RunReport};
use crate::utils::config::RunConfig;

/// Runs scenarios one after another over a single browser session
pub struct ScenarioExecutor {
    driver: Arc<dyn PageDriver>,
    config: RunConfig,
    context: RunContext,
    session: RunSessionState,
    emitter: EventEmitter,
}

impl ScenarioExecutor {
    pub fn new(driver: Arc<dyn PageDriver>, config: RunConfig) -> Self {
        let context = RunContext::from_config(&config);
        let session_id = Uuid::new_v4().to_string();
        Self {
            driver,
            config,
            context,
            session: RunSessionState::new(&session_id),
            emitter: EventEmitter::default(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.emitter.subscribe()
    }

    pub fn session(&self) -> &RunSessionState {
        &self.session
    }

    /// Run every scenario in order, stopping at the first run-failing condition
    pub async fn run(
        &mut self,
        scenarios: &[Scenario],
        users: &CredentialMap,
    ) -> std::result::Result<(), FlowError> {
        self.context.reset_photos_dir();
        self.session.start();
        let engine = self.driver.engine_name().to_string();
        info!(
            "session {} on {}: {} scenarios",
            self.session.session_id,
            engine,
            scenarios.len()
        );
        self.emitter.emit(RunEvent::SessionStarted {
            session_id: self.session.session_id.clone(),
            engine,
            scenario_count: scenarios.len(),
        });

        for (index, scenario) in scenarios.iter().enumerate() {
            if let Err(e) = self.run_scenario(index, scenario, users).await {
                error!("scenario {} stopped the run: {}", index + 1, e);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn run_scenario(
        &mut self,
        index: usize,
        scenario: &Scenario,
        users: &CredentialMap,
    ) -> std::result::Result<(), FlowError> {
        let mut state = ScenarioState::new(&scenario.label(), &scenario.user_key);
        state.start();
        self.emitter.emit(RunEvent::ScenarioStarted {
            index,
            name: state.name.clone(),
        });

        let result = self.drive_scenario(scenario, users, &mut state).await;
        if let Err(e) = &result {
            state.error = Some(e.to_string());
            let reason = format!("stopped after: {}", e);
            for step in state.steps.iter().filter(|s| !s.status.is_terminal()) {
                self.emitter.emit(RunEvent::StepSkipped {
                    index: step.index,
                    reason: reason.clone(),
                });
            }
            state.skip_remaining(&reason);
        }
        state.finish();

        self.emitter.emit(RunEvent::ScenarioFinished {
            name: state.name.clone(),
            status: state.status.clone(),
            duration_ms: state.total_duration_ms,
        });
        self.session.scenarios.push(state);
        result
    }

    /// Login gate, search, add loop, cart gate
    async fn drive_scenario(
        &self,
        scenario: &Scenario,
        users: &CredentialMap,
        state: &mut ScenarioState,
    ) -> std::result::Result<(), FlowError> {
        let flow = ShoppingFlow::new(
            self.driver.as_ref(),
            &self.config,
            &self.context,
            &self.emitter,
        );

        self.begin_step(state, STEP_LOGIN);
        let Some(credential) = users.get(&scenario.user_key) else {
            let err = FlowError::UnknownUser(scenario.user_key.clone());
            self.fail_step(state, STEP_LOGIN, &err);
            return Err(err);
        };
        if !flow.login(credential).await {
            let err = FlowError::LoginFailed {
                user_key: scenario.user_key.clone(),
            };
            self.fail_step(state, STEP_LOGIN, &err);
            return Err(err);
        }
        self.pass_step(state, STEP_LOGIN);

        self.begin_step(state, STEP_SEARCH);
        let urls = match flow
            .search_under_price(&scenario.query, scenario.max_price, scenario.limit)
            .await
        {
            Ok(urls) => {
                self.pass_step(state, STEP_SEARCH);
                urls
            }
            Err(e) if !e.is_fatal() => {
                warn!("{}; continuing with no items", e);
                self.degrade_step(state, STEP_SEARCH, &e);
                Vec::new()
            }
            Err(e) => {
                self.fail_step(state, STEP_SEARCH, &e);
                return Err(e);
            }
        };
        state.collected_urls = urls.clone();

        self.begin_step(state, STEP_ADD_TO_CART);
        state.items = flow.add_items_to_cart(&urls).await;
        self.pass_step(state, STEP_ADD_TO_CART);

        self.begin_step(state, STEP_CART_TOTAL);
        match flow
            .assert_cart_total_within_limit(scenario.max_cart_total)
            .await
        {
            Ok(cart) => {
                state.cart = Some(cart);
                self.pass_step(state, STEP_CART_TOTAL);
                Ok(())
            }
            Err(e) => {
                self.fail_step(state, STEP_CART_TOTAL, &e);
                Err(e)
            }
        }
    }

    fn begin_step(&self, state: &mut ScenarioState, index: usize) {
        if let Some(step) = state.step_mut(index) {
            step.start();
            self.emitter.emit(RunEvent::StepStarted {
                index,
                step: step.name.clone(),
            });
        }
    }

    fn pass_step(&self, state: &mut ScenarioState, index: usize) {
        if let Some(step) = state.step_mut(index) {
            step.pass();
            self.emitter.emit(RunEvent::StepPassed {
                index,
                duration_ms: step.duration_ms.unwrap_or(0),
            });
        }
    }

    fn fail_step(&self, state: &mut ScenarioState, index: usize, err: &FlowError) {
        if let Some(step) = state.step_mut(index) {
            step.fail(err.to_string());
            self.emitter.emit(RunEvent::StepFailed {
                index,
                error: err.to_string(),
                duration_ms: step.duration_ms.unwrap_or(0),
            });
        }
    }

    fn degrade_step(&self, state: &mut ScenarioState, index: usize, err: &FlowError) {
        if let Some(step) = state.step_mut(index) {
            step.degrade(err.to_string());
            self.emitter.emit(RunEvent::StepDegraded {
                index,
                warning: err.to_string(),
                duration_ms: step.duration_ms.unwrap_or(0),
            });
        }
    }

    /// Close the browser, announce the summary and write the reports
    pub async fn finish(&mut self) -> Result<RunReport> {
        if let Err(e) = self.driver.close().await {
            warn!("browser teardown: {}", e);
        }

        self.session.finish();
        let summary = self.session.summary();
        info!(
            "run {}: {} passed, {} failed",
            summary.session_id, summary.passed, summary.failed
        );
        self.emitter.emit(RunEvent::SessionFinished { summary });

        let results = self.session.to_report();
        let (json_path, html_path) = report::write_run_reports(&results, &self.context).await?;
        info!(
            "reports written: {} and {}",
            json_path.display(),
            html_path.display()
        );
        Ok(results)
    }
}
