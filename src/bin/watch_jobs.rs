//! Watch translation jobs - prints the jobs list every time the poller refreshes it
//!
//! Usage:
//!   cargo run --bin watch-jobs
//!   cargo run --bin watch-jobs -- --active   # Hide COMPLETED and FAILED jobs
//!
//! Required environment variables:
//! - CMS_BASE_URL
//! - CMS_API_TOKEN
//!
//! Optional:
//! - JOB_POLL_INTERVAL_MS (defaults to 2000)

use anyhow::{bail, Result};
use multilingual_publisher::api::HttpCmsClient;
use multilingual_publisher::config::Config;
use multilingual_publisher::models::{count_by_status, TranslationJob};
use multilingual_publisher::session::{Auth, Session};
use std::sync::Arc;
use tracing::info;

fn print_jobs(jobs: &[TranslationJob], active_only: bool) {
    let summary: Vec<String> = count_by_status(jobs)
        .into_iter()
        .map(|(status, count)| format!("{}={}", status, count))
        .collect();
    println!("\n---------- {} jobs ({}) ----------", jobs.len(), summary.join(" "));

    for job in jobs
        .iter()
        .filter(|job| !active_only || !job.status.is_terminal())
    {
        println!(
            "#{:<6} {:<10} {:<4} {} ({})",
            job.id,
            job.status.as_str(),
            job.target_language,
            job.post_title,
            job.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("multilingual_publisher=info".parse()?),
        )
        .init();

    let active_only = std::env::args().any(|arg| arg == "--active");

    let config = Config::from_env()?;
    let api = Arc::new(HttpCmsClient::new(&config)?);
    let session = Session::start(api, Auth::from_token(config.cms_api_token.as_deref()));

    let Some(poller) = session.mount_job_poller(config.job_poll_interval) else {
        bail!("CMS_API_TOKEN is required to watch jobs");
    };
    let mut jobs = poller.subscribe();

    info!(
        "Polling jobs every {}ms, Ctrl-C to stop",
        config.job_poll_interval.as_millis()
    );

    loop {
        tokio::select! {
            changed = jobs.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = jobs.borrow_and_update().clone();
                print_jobs(&snapshot, active_only);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.unmount();
    session.logout();
    Ok(())
}
