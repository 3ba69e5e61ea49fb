use super::types::RunReport;
use crate::runner::context::screenshots_in;
use crate::runner::flow::ItemOutcome;
use crate::runner::state::{ScenarioStatus, StepStatus};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use log::warn;
use std::path::Path;

/// Generate HTML report, embedding the screenshots found in `photos_dir`
pub async fn generate(results: &RunReport, photos_dir: &Path, output: Option<&Path>) -> Result<()> {
    let html = generate_html(results, &embedded_screenshots(photos_dir));

    if let Some(path) = output {
        std::fs::write(path, html).with_context(|| format!("cannot write {}", path.display()))?;
        log::info!("HTML report saved to: {}", path.display());
    } else {
        println!("{}", html);
    }

    Ok(())
}

/// (file name, base64 PNG) for every product screenshot, in numeric order
fn embedded_screenshots(photos_dir: &Path) -> Vec<(String, String)> {
    screenshots_in(photos_dir)
        .into_iter()
        .filter_map(|path| match std::fs::read(&path) {
            Ok(bytes) => {
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some((name, STANDARD.encode(bytes)))
            }
            Err(e) => {
                warn!("skipping screenshot {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

fn generate_html(results: &RunReport, screenshots: &[(String, String)]) -> String {
    let summary = &results.summary;
    let pass_rate = if summary.total_scenarios > 0 {
        (summary.passed as f64 / summary.total_scenarios as f64 * 100.0) as u32
    } else {
        0
    };

    let mut scenarios_html = String::new();
    for scenario in &results.scenarios {
        let (status_text, status_class) = match scenario.status {
            ScenarioStatus::Passed => ("Passed", "passed"),
            ScenarioStatus::Failed => ("Failed", "failed"),
            ScenarioStatus::Running => ("Running", "running"),
            ScenarioStatus::Pending => ("Pending", "pending"),
        };

        let mut steps_html = String::new();
        for step in &scenario.steps {
            let (icon, class) = match &step.status {
                StepStatus::Passed => ("✓", "passed"),
                StepStatus::Failed { .. } => ("✗", "failed"),
                StepStatus::Degraded { .. } => ("!", "degraded"),
                StepStatus::Skipped { .. } => ("○", "skipped"),
                StepStatus::Running => ("⋯", "running"),
                StepStatus::Pending => ("○", "pending"),
            };
            let detail = match &step.status {
                StepStatus::Failed { error } => {
                    format!(r#"<div class="error-message">{}</div>"#, html_escape(error))
                }
                StepStatus::Degraded { warning } => {
                    format!(r#"<div class="note">{}</div>"#, html_escape(warning))
                }
                StepStatus::Skipped { reason } => {
                    format!(r#"<div class="note">{}</div>"#, html_escape(reason))
                }
                _ => String::new(),
            };
            let duration = step
                .duration_ms
                .map(|d| format!(r#"<span class="duration">{}</span>"#, format_duration(d)))
                .unwrap_or_default();

            steps_html.push_str(&format!(
                r#"<div class="step {class}"><span class="icon">{icon}</span><span class="name">{}</span>{duration}{detail}</div>"#,
                html_escape(&step.name),
            ));
        }

        let items_html: String = scenario.items.iter().map(item_row).collect();
        let cart_html = scenario
            .cart
            .as_ref()
            .map(|cart| {
                format!(
                    r#"<div class="cart">Cart: {} item(s), total {:.2}{}</div>"#,
                    cart.prices.len(),
                    cart.total,
                    if cart.from_subtotal { " (subtotal)" } else { "" }
                )
            })
            .unwrap_or_default();
        let error_html = scenario
            .error
            .as_ref()
            .map(|e| format!(r#"<div class="error-message">{}</div>"#, html_escape(e)))
            .unwrap_or_default();

        scenarios_html.push_str(&format!(
            r#"
        <div class="scenario {status_class}">
            <div class="scenario-header">
                <h3>{} <span class="badge">{status_text}</span></h3>
                <span class="duration">{}</span>
            </div>
            <div class="user">user: {}</div>
            <div class="steps">{steps_html}</div>
            <table class="items">{items_html}</table>
            {cart_html}
            {error_html}
        </div>"#,
            html_escape(&scenario.name),
            format_duration(scenario.total_duration_ms.unwrap_or(0)),
            html_escape(&scenario.user_key),
        ));
    }

    let gallery_html: String = screenshots
        .iter()
        .map(|(name, data)| {
            format!(
                r#"<figure><img src="data:image/png;base64,{data}" alt="{name}"><figcaption>{name}</figcaption></figure>"#,
                name = html_escape(name),
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Cart Run Report - {session}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; background: #0a0f1d; color: #f9fafb; padding: 2rem; }}
        .container {{ max-width: 1100px; margin: 0 auto; }}
        .summary {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 1rem; margin-bottom: 2rem; }}
        .stat {{ background: #141b2d; border: 1px solid #374151; border-radius: 0.75rem; padding: 1rem; }}
        .stat-value {{ font-size: 2rem; font-weight: 800; }}
        .stat.passed .stat-value, .step.passed .icon {{ color: #10b981; }}
        .stat.failed .stat-value, .step.failed .icon {{ color: #ef4444; }}
        .step.skipped .icon, .step.degraded .icon {{ color: #f59e0b; }}
        .scenario {{ background: #141b2d; border: 1px solid #374151; border-radius: 1rem; margin-bottom: 1.5rem; padding: 1rem 1.5rem; }}
        .scenario-header {{ display: flex; justify-content: space-between; align-items: center; }}
        .scenario.passed .badge {{ color: #10b981; }}
        .scenario.failed .badge {{ color: #ef4444; }}
        .step {{ padding: 0.25rem 0; display: flex; gap: 0.75rem; flex-wrap: wrap; }}
        .duration, .user, .note {{ color: #9ca3af; font-size: 0.8rem; }}
        .items td {{ padding: 0.2rem 0.75rem 0.2rem 0; font-size: 0.85rem; }}
        .error-message {{ background: rgba(239, 68, 68, 0.1); color: #fca5a5; border-radius: 0.5rem; padding: 0.5rem; font-family: monospace; width: 100%; }}
        .gallery {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 1rem; }}
        .gallery img {{ width: 100%; border-radius: 0.5rem; }}
        .meta {{ margin-top: 2rem; color: #9ca3af; font-size: 0.8rem; text-align: center; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Cart Run Report</h1>
        <div class="summary">
            <div class="stat"><div class="stat-value">{total}</div>Scenarios</div>
            <div class="stat passed"><div class="stat-value">{passed}</div>Passed</div>
            <div class="stat failed"><div class="stat-value">{failed}</div>Failed</div>
            <div class="stat"><div class="stat-value">{confirmed}/{attempted}</div>Items added</div>
            <div class="stat"><div class="stat-value">{pass_rate}%</div>Success rate</div>
            <div class="stat"><div class="stat-value">{duration}</div>Duration</div>
        </div>
        {scenarios_html}
        <h2>Screenshots</h2>
        <div class="gallery">{gallery_html}</div>
        <div class="meta">Session: {session} | Generated: {generated}</div>
    </div>
</body>
</html>"#,
        session = html_escape(&summary.session_id),
        total = summary.total_scenarios,
        passed = summary.passed,
        failed = summary.failed,
        confirmed = summary.items_confirmed,
        attempted = summary.items_attempted,
        duration = format_duration(summary.total_duration_ms.unwrap_or(0)),
        generated = html_escape(&results.generated_at),
    )
}

fn item_row(item: &ItemOutcome) -> String {
    let verdict = match (&item.add_to_cart, &item.error) {
        (_, Some(error)) => format!("error: {}", error),
        (Some(outcome), None) if outcome.is_confirmed() => "added".to_string(),
        (Some(outcome), None) => format!("not added: {:?}", outcome),
        (None, None) => "no add to cart button".to_string(),
    };
    format!(
        r#"<tr><td>#{}</td><td><a href="{url}">{url}</a></td><td>{}</td></tr>"#,
        item.position,
        html_escape(&verdict),
        url = html_escape(&item.url),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60000;
        let seconds = (ms % 60000) as f64 / 1000.0;
        format!("{}m {:.0}s", minutes, seconds)
    }
}
