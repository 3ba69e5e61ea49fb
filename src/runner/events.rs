use super::state::{RunSummary, ScenarioStatus};
use tokio::sync::broadcast;

/// Run events for real-time updates
#[derive(Debug, Clone)]
pub enum RunEvent {
    // Session events
    SessionStarted {
        session_id: String,
        engine: String,
        scenario_count: usize,
    },
    SessionFinished {
        summary: RunSummary,
    },

    // Scenario events
    ScenarioStarted {
        index: usize,
        name: String,
    },
    ScenarioFinished {
        name: String,
        status: ScenarioStatus,
        duration_ms: Option<u64>,
    },

    // Step events
    StepStarted {
        index: usize,
        step: String,
    },
    StepPassed {
        index: usize,
        duration_ms: u64,
    },
    StepFailed {
        index: usize,
        error: String,
        duration_ms: u64,
    },
    StepDegraded {
        index: usize,
        warning: String,
        duration_ms: u64,
    },
    StepSkipped {
        index: usize,
        reason: String,
    },

    /// One product processed by the add-to-cart loop
    ItemProcessed {
        position: usize,
        total: usize,
        url: String,
        verdict: String,
    },

    // Log event for coordinated output
    Log {
        message: String,
    },
}

/// Event emitter for broadcasting run events
pub struct EventEmitter {
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<RunEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(RunEvent::Log {
            message: message.into(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<RunEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // Hidden target when piped, to keep escape codes out of logs
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut spinner: Option<ProgressBar> = None;
        let mut step_text = String::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                RunEvent::SessionStarted {
                    session_id,
                    engine,
                    scenario_count,
                } => {
                    multi
                        .println(format!(
                            "\n{} Shopping run started: {} on {} ({} scenarios)",
                            "▶".green().bold(),
                            session_id.cyan(),
                            engine.cyan(),
                            scenario_count
                        ))
                        .ok();
                }

                RunEvent::SessionFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish();
                    }
                    println!("\n{} Shopping run finished", "■".blue().bold());
                    println!("  Scenarios: {}", summary.total_scenarios);
                    println!(
                        "  {} passed, {} failed, {} steps degraded, {} steps skipped",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.degraded_steps.to_string().yellow(),
                        summary.skipped_steps.to_string().yellow()
                    );
                    println!(
                        "  Items: {} confirmed of {} attempted",
                        summary.items_confirmed, summary.items_attempted
                    );
                    if let Some(duration) = summary.total_duration_ms {
                        println!("  Duration: {}ms", duration);
                    }
                    break;
                }

                RunEvent::ScenarioStarted { index, name } => {
                    println!(
                        "\n  {} Scenario {}: {}",
                        "→".blue(),
                        index + 1,
                        name.white().bold()
                    );
                }

                RunEvent::ScenarioFinished {
                    name,
                    status,
                    duration_ms,
                } => {
                    let status_str = match status {
                        ScenarioStatus::Passed => "PASSED".green().bold(),
                        ScenarioStatus::Failed => "FAILED".red().bold(),
                        _ => "UNKNOWN".white().bold(),
                    };
                    println!("  {} Scenario {} [{}]", "←".blue(), name, status_str);
                    if let Some(duration) = duration_ms {
                        println!("    Duration: {}ms", duration);
                    }
                }

                RunEvent::StepStarted { index, step } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    step_text = format!("[{}] {}... ", index, step.dimmed());
                    pb.set_message(step_text.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                RunEvent::StepPassed { duration_ms, .. } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("    {} {}({}ms)", "✓".green(), step_text, duration_ms);
                }

                RunEvent::StepFailed {
                    error, duration_ms, ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("    {} {}({}ms)", "✗".red(), step_text, duration_ms);
                    println!("      {}", error.red());
                }

                RunEvent::StepDegraded {
                    warning, duration_ms, ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("    {} {}({}ms)", "!".yellow(), step_text, duration_ms);
                    println!("      {}", warning.yellow());
                }

                RunEvent::StepSkipped { index, reason } => {
                    println!("    {} [{}] skipped ({})", "○".yellow(), index, reason.dimmed());
                }

                RunEvent::ItemProcessed {
                    position,
                    total,
                    url,
                    verdict,
                } => {
                    multi
                        .println(format!(
                            "      {}/{} {} {}",
                            position,
                            total,
                            verdict.cyan(),
                            url.dimmed()
                        ))
                        .ok();
                }

                RunEvent::Log { message } => {
                    multi.println(format!("      {}", message)).ok();
                }
            }
        }
    }
}
