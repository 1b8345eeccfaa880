use anyhow::Result;
use tracing::info;

mod types;
mod config;
mod format;
mod fetch;
mod slack;
mod services;
mod report;

use config::{load_options, read_config};
use report::{collect_results, parse_report};
use services::build_services;
use slack::send_to_slack;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let options = load_options()?;
    let config = read_config(&options.config_path)?;

    let client = reqwest::Client::new();
    let services = build_services(&config, &options.tokens, &client)?;
    info!("Running {} status services", services.len());

    let results = collect_results(&services).await?;
    let report = parse_report(&results);

    // The report is the program's output; the host posts it to chat.
    println!("{report}");

    if let Some(webhook_url) = &options.slack_webhook_url {
        if report.is_empty() {
            info!("Report is empty, skipping Slack notification");
        } else {
            info!("Posting report to Slack");
            send_to_slack(&client, webhook_url, &report).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
