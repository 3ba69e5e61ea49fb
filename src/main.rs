use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use cart_tester::{report, runner, utils::config::RunConfig};

#[derive(Parser)]
#[command(name = "cart-tester")]
#[command(version = "0.1.0")]
#[command(about = "Budget-bounded shopping journey UI tests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every scenario in one browser session
    Run {
        /// YAML run configuration (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Scenario file (JSON array)
        #[arg(short, long)]
        scenarios: Option<PathBuf>,

        /// Credentials file (JSON object keyed by user key)
        #[arg(short, long)]
        users: Option<PathBuf>,

        /// Run the browser without a window
        #[arg(long, default_value = "false")]
        headless: bool,

        /// Output directory for results.json and report.html
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate report from saved run results
    Report {
        /// Path to results.json
        results: PathBuf,

        /// Output format (json, html)
        #[arg(short, long, default_value = "html")]
        format: String,

        /// Screenshot directory to embed in HTML reports
        #[arg(long, default_value = "photos")]
        photos: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            scenarios,
            users,
            headless,
            output,
        } => {
            let mut run_config = RunConfig::load(config.as_deref()).context("Invalid configuration")?;
            if let Some(path) = scenarios {
                run_config.scenarios_path = path;
            }
            if let Some(path) = users {
                run_config.users_path = path;
            }
            if headless {
                run_config.headless = true;
            }
            if let Some(dir) = output {
                run_config.results_dir = dir;
            }

            println!(
                "{} Running scenarios from: {}",
                "▶".green().bold(),
                run_config.scenarios_path.display()
            );
            println!("  Browser: {}", run_config.browser.as_str().cyan());
            if run_config.headless {
                println!("  Headless: {}", "Enabled".yellow());
            }
            println!(
                "  Output: {}",
                run_config.results_dir.display().to_string().cyan()
            );

            runner::run_suite(run_config).await?;
        }

        Commands::Report {
            results,
            format,
            photos,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, &photos, output.as_deref()).await?;
        }
    }

    Ok(())
}
