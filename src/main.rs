//! Operator CLI for the multilingual publishing workflow.
//!
//! Usage:
//!   multilingual-publisher status
//!   multilingual-publisher translate-categories <id> [<id> ...]
//!   multilingual-publisher translate-interface
//!   multilingual-publisher publish-interface <lang>
//!
//! Required environment variables:
//! - CMS_BASE_URL
//!
//! Optional:
//! - CMS_API_TOKEN (without it the session is anonymous and nothing is fetched)
//! - TARGET_LANGUAGES (comma-separated, defaults to the CMS settings)
//! - JOB_POLL_INTERVAL_MS (defaults to 2000)
//! - PROGRESS_SAMPLE_INTERVAL_MS (defaults to 500)
//! - HTTP_TIMEOUT_SECS (defaults to 30)

use anyhow::{bail, Context, Result};
use multilingual_publisher::api::HttpCmsClient;
use multilingual_publisher::config::Config;
use multilingual_publisher::i18n::Language;
use multilingual_publisher::models::count_by_status;
use multilingual_publisher::notify::Notifier;
use multilingual_publisher::orchestrator::Selection;
use multilingual_publisher::session::{Auth, Session};
use std::sync::Arc;
use tracing::info;

fn print_usage() {
    println!(
        r#"Usage: multilingual-publisher <command> [args]

Commands:
  status                          Show jobs, categories and interface coverage
  translate-categories <id>...    Translate then publish each category, in order
  translate-interface             Machine-translate every interface string
  publish-interface <lang>        Publish the interface strings for one language
  help                            Show this message"#
    );
}

/// Print every notification until the session's notifier goes away.
fn print_notifications(notifier: &Notifier) -> tokio::task::JoinHandle<()> {
    let mut rx = notifier.subscribe();
    tokio::spawn(async move {
        while let Ok(notification) = rx.recv().await {
            println!("{}", notification);
        }
    })
}

async fn status_command(session: &Session, config: &Config) -> Result<()> {
    let resources = session.resources();
    let targets = session.target_languages(&config.target_languages);
    let target_codes: Vec<String> = targets.iter().map(|l| l.code().to_string()).collect();
    let source = session.source_language();

    let stats = resources.stats.data();
    println!("\n========== CMS STATUS ==========");
    println!(
        "Posts: {} ({} translated)",
        stats.total_posts, stats.translated_posts
    );
    println!("Source language: {}", source.name());
    println!("Target languages: {}", target_codes.join(", "));

    println!("\nJobs:");
    for (status, count) in count_by_status(&resources.jobs.data()) {
        println!("  {:<10} {}", status, count);
    }

    let categories = resources.categories.data();
    let pending: Vec<_> = categories
        .iter()
        .filter(|c| !c.is_translated(source.code(), &target_codes))
        .collect();
    println!(
        "\nCategories: {} total, {} missing translations",
        categories.len(),
        pending.len()
    );
    for category in pending {
        println!(
            "  #{} {} (missing: {})",
            category.id,
            category.name,
            category.missing_languages(source.code(), &target_codes).join(", ")
        );
    }

    let strings = resources.interface_strings.data().len();
    let rows = resources.interface_translations.data();
    println!("\nInterface strings: {}", strings);
    for language in &targets {
        let done = rows
            .iter()
            .filter(|row| row.language == language.code())
            .count();
        println!("  {:<4} {}/{}", language.code(), done, strings);
    }
    println!("================================\n");
    Ok(())
}

async fn translate_categories_command(
    session: &Session,
    config: &Config,
    ids: &[String],
) -> Result<()> {
    if ids.is_empty() {
        bail!("translate-categories needs at least one category id");
    }
    let mut selection: Selection = ids
        .iter()
        .map(|id| id.parse::<u64>().with_context(|| format!("Invalid category id: {}", id)))
        .collect::<Result<_>>()?;

    let orchestrator = session.orchestrator(session.target_languages(&config.target_languages));
    orchestrator.run(&mut selection).await?;
    Ok(())
}

async fn translate_interface_command(session: &Session, config: &Config) -> Result<()> {
    let languages = session.target_languages(&config.target_languages);
    let monitor = session.progress_monitor(config.progress_sample_interval);
    let mut progress = monitor.subscribe();

    session
        .interface_workflow()
        .translate_all(&monitor, &languages)
        .await?;

    loop {
        tokio::select! {
            changed = progress.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopped watching; translation continues on the server");
                return Ok(());
            }
        }

        let report = *progress.borrow_and_update();
        match report.eta_seconds() {
            Some(secs) => println!("{:>3}%  ~{}s remaining", report.display_percent(), secs),
            None => println!("{:>3}%", report.display_percent()),
        }
        if report.is_complete() || !report.active {
            break;
        }
    }
    Ok(())
}

async fn publish_interface_command(session: &Session, code: Option<&String>) -> Result<()> {
    let code = code.context("publish-interface needs a language code")?;
    let language = Language::from_code(code)?;
    session.interface_workflow().publish(language).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("multilingual_publisher=info".parse()?),
        )
        .init();

    // Parse CLI arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }
    let command = args[1].as_str();
    if matches!(command, "--help" | "-h" | "help") {
        print_usage();
        return Ok(());
    }

    let config = Config::from_env()?;
    let api = Arc::new(HttpCmsClient::new(&config)?);
    let session = Session::start(api, Auth::from_token(config.cms_api_token.as_deref()));
    let printer = print_notifications(session.notifier());

    info!("Waiting for resources to load");
    session.gate().ready().await;

    let result = match command {
        "status" => status_command(&session, &config).await,
        "translate-categories" => translate_categories_command(&session, &config, &args[2..]).await,
        "translate-interface" => translate_interface_command(&session, &config).await,
        "publish-interface" => publish_interface_command(&session, args.get(2)).await,
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    };

    // Dropping the session closes the notifier, so the printer drains and exits
    session.logout();
    let _ = printer.await;
    result
}
