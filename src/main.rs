use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, Instrument};

use card_sheets_sync::app::ports::{NotificationPort, SheetStorePort};
use card_sheets_sync::config::Config;
use card_sheets_sync::infra::in_memory_sheet::InMemorySheet;
use card_sheets_sync::infra::outbox::Outbox;
use card_sheets_sync::infra::sheets_client::SheetsClient;
use card_sheets_sync::infra::telegram_client::TelegramNotifier;
use card_sheets_sync::logging;
use card_sheets_sync::observability::metrics;
use card_sheets_sync::tasks::{self, PublishScope};

#[derive(Parser)]
#[command(name = "card_sheets_sync")]
#[command(about = "Publishes optimizer card and leg extracts to Google Sheets and sends Kelly stake alerts")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print to stdout instead of calling Google Sheets or Telegram
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish cards and legs tables
    Publish,
    /// Publish the canonical cards table only
    Cards,
    /// Publish the legs tables only
    Legs,
    /// Send Kelly stake alerts for the current extracts
    Alerts,
    /// Send a connectivity test message
    TestAlert,
    /// Publish everything, then send alerts
    Run,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Publish => "publish",
            Commands::Cards => "cards",
            Commands::Legs => "legs",
            Commands::Alerts => "alerts",
            Commands::TestAlert => "test-alert",
            Commands::Run => "run",
        }
    }
}

fn sheet_store(config: &Config, dry_run: bool) -> anyhow::Result<Arc<dyn SheetStorePort>> {
    if dry_run {
        return Ok(Arc::new(InMemorySheet::new()));
    }
    let (spreadsheet_id, token) = config.sheets_credentials()?;
    let client = SheetsClient::new(
        &config.sheets.api_base,
        spreadsheet_id,
        token,
        Duration::from_secs(config.sheets.timeout_seconds),
    )?;
    Ok(Arc::new(client))
}

fn notifier(config: &Config, dry_run: bool) -> anyhow::Result<Arc<dyn NotificationPort>> {
    if dry_run {
        return Ok(Arc::new(Outbox::echoing()));
    }
    let (bot_token, chat_id) = config.telegram_credentials()?;
    let client = TelegramNotifier::new(
        &config.telegram.api_base,
        bot_token,
        chat_id,
        Duration::from_secs(config.telegram.timeout_seconds),
    )?;
    Ok(Arc::new(client))
}

async fn execute(command: &Commands, config: &Config, dry_run: bool) -> anyhow::Result<()> {
    match command {
        Commands::Publish | Commands::Cards | Commands::Legs => {
            let scope = match command {
                Commands::Cards => PublishScope::Cards,
                Commands::Legs => PublishScope::Legs,
                _ => PublishScope::All,
            };
            println!("🔄 Publishing to Google Sheets...");
            // Read everything before building the client so a missing file fails first
            let prepared = tasks::prepare_publish(config, scope).context("failed to load sources")?;
            tasks::print_load_summary(&prepared, config);
            let store = sheet_store(config, dry_run)?;
            let outcome = tasks::publish_prepared(config, store, &prepared)
                .await
                .context("publish failed")?;
            tasks::print_publish_outcome(&outcome);
        }
        Commands::Alerts => {
            println!("🔔 Checking Kelly stakes...");
            let notifier = notifier(config, dry_run)?;
            tasks::alerts(config, notifier).await.context("alerts failed")?;
        }
        Commands::TestAlert => {
            let notifier = notifier(config, dry_run)?;
            tasks::test_alert(config, notifier)
                .await
                .context("test message was not delivered")?;
        }
        Commands::Run => {
            println!("🚀 Running publish + alerts...");
            let store = sheet_store(config, dry_run)?;
            let notifier = match notifier(config, dry_run) {
                Ok(n) => Some(n),
                Err(e) => {
                    info!("Alerts disabled: {}", e);
                    None
                }
            };
            tasks::run(config, store, notifier).await.context("publish failed")?;
            println!("✅ Run complete");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let _guard = logging::init_logging(&config.log_dir);
    metrics::init()?;

    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("run", run_id = %run_id, command = cli.command.name());
    info!(parent: &span, dry_run = cli.dry_run, sources = ?tasks::source_paths(&config), "Starting");

    let result = execute(&cli.command, &config, cli.dry_run).instrument(span).await;

    if let Some(path) = &config.metrics_textfile {
        if let Err(e) = metrics::write_textfile(path) {
            error!("Failed to write metrics textfile: {}", e);
        }
    }
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
