pub mod context;
pub mod events;
pub mod executor;
pub mod flow;
pub mod state;

use anyhow::{Context, Result};
use colored::Colorize;
use log::info;
use std::sync::Arc;

use crate::driver::web::{WebDriver, WebDriverConfig};
use crate::parser::{load_credentials, load_scenarios};
use crate::report::RunReport;
use crate::utils::config::RunConfig;

pub use events::*;
pub use executor::ScenarioExecutor;
pub use flow::{ItemOutcome, ShoppingFlow};
pub use state::*;

/// Load the scenario data, run it in one browser session and write the reports
///
/// Errors when data cannot be loaded, the browser cannot start, or a
/// scenario hits a run-failing condition. Reports are written in every case
/// once the browser is up.
pub async fn run_suite(config: RunConfig) -> Result<RunReport> {
    let scenarios = load_scenarios(&config.scenarios_path).context("Failed to load scenarios")?;
    let users = load_credentials(&config.users_path).context("Failed to load credentials")?;
    info!(
        "{} scenarios from {}, {} users",
        scenarios.len(),
        config.scenarios_path.display(),
        users.len()
    );

    let driver = WebDriver::launch(WebDriverConfig::from(&config))
        .await
        .context("Failed to launch browser")?;

    let mut executor = ScenarioExecutor::new(Arc::new(driver), config);
    let listener = tokio::spawn(ConsoleEventListener::listen(executor.subscribe()));

    let outcome = executor.run(&scenarios, &users).await;
    let results = executor.finish().await;
    let _ = listener.await;

    let results = results.context("Failed to write reports")?;
    if let Err(e) = outcome {
        println!("{} {}", "✗".red().bold(), e.to_string().red());
        return Err(e).context("Shopping run failed");
    }
    Ok(results)
}
