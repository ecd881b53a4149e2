//! Flow client - terminal entry point.

use anyhow::Result;
use flow_client::{Config, GatewayClient, Outcome, VerificationFlow};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prompt on stdout and read one trimmed line. `None` on EOF.
async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<Option<String>> {
    print!("{}: ", label);
    io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    // Keep stdout for the prompts, logs go to stderr.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let client = GatewayClient::new(&config.gateway.base_url, config.gateway.timeout)?;
    let mut flow = VerificationFlow::new(
        client,
        config.gateway.check_interval,
        config.gateway.max_checks,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(phone) = prompt(&mut lines, "Phone number").await? else {
            break;
        };
        let Some(country) = prompt(&mut lines, "Country").await? else {
            break;
        };

        if let Err(e) = flow.submit_phone(&phone, &country).await {
            eprintln!("Submission failed: {}", e);
            continue;
        }
        println!("Submitted. An operator has been notified.");

        let Some(code) = prompt(&mut lines, "Verification code").await? else {
            break;
        };

        println!("Waiting for the operator's decision...");
        match flow.submit_code(&phone, &code).await? {
            Outcome::Approved => println!("Approved."),
            Outcome::Rejected => println!("Rejected."),
        }

        let Some(again) = prompt(&mut lines, "Start over? [y/N]").await? else {
            break;
        };
        if !again.eq_ignore_ascii_case("y") {
            break;
        }
        flow.reset();
    }

    Ok(())
}
