use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, AppState, ClientConfig, ClientResult, FileTokenStore, TokenStore};
use polling::PollingSession;
use shared::api::{CashFlowQueryCriteria, ExportFormat, TransactionQueryCriteria};
use shared::progress::{transaction_lifecycle, Stepper};
use shared::Route;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "dashboard-watch", about = "Follow a transaction or cash flow as it settles")]
struct Cli {
    /// API base URL, absolute or relative to API_ORIGIN (overrides API_BASE_URL)
    #[arg(long)]
    api_base_url: Option<String>,

    /// Refresh interval in milliseconds (overrides POLL_INTERVAL_MS)
    #[arg(long)]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch a transaction's back-office lifecycle
    Transaction { external_id: String },
    /// Watch a cash flow's payment progress
    CashFlow { cash_flow_id: String },
    /// Store the bearer token used for API calls
    Login { token: String },
    /// Forget the stored bearer token
    Logout,
    /// Download a transaction or cash-flow export
    Export {
        #[arg(value_enum)]
        dataset: Dataset,
        /// excel or csv
        #[arg(long, default_value = "excel")]
        format: ExportFormat,
        /// Output file (defaults to the server-suggested name)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Dataset {
    Transactions,
    CashFlows,
}

#[derive(Debug, Clone)]
enum Target {
    Transaction(String),
    CashFlow(String),
}

impl Target {
    fn route(&self) -> Route {
        match self {
            Self::Transaction(external_id) => Route::TransactionDetail {
                external_id: external_id.clone(),
            },
            Self::CashFlow(cash_flow_id) => Route::CashFlowDetail {
                cash_flow_id: cash_flow_id.clone(),
            },
        }
    }
}

/// Fetches the watched item and publishes its rendered view.
struct Watcher {
    api: ApiClient,
    state: AppState,
    target: Target,
    view: watch::Sender<Option<String>>,
}

impl Watcher {
    async fn refresh(&self) -> ClientResult<()> {
        let rendered = self.state.track(self.render()).await?;
        self.view.send_if_modified(|view| {
            if view.as_deref() == Some(rendered.as_str()) {
                return false;
            }
            *view = Some(rendered);
            true
        });
        Ok(())
    }

    async fn render(&self) -> ClientResult<String> {
        match &self.target {
            Target::Transaction(external_id) => {
                let detail = self.api.transaction(external_id).await?;
                let stepper = transaction_lifecycle(detail.back_office_status);
                Ok(format!(
                    "{} ({}) {}%\n{}",
                    detail.external_id,
                    detail.back_office_status,
                    stepper.progress_percentage(),
                    stepper
                ))
            }
            Target::CashFlow(cash_flow_id) => {
                let progress = self.api.cash_flow_progress(cash_flow_id).await?;
                let stepper = Stepper::from_flow_nodes(&progress.flow_visualization);
                let mut out = format!(
                    "{} {} / {} via {} {}%\n{}",
                    cash_flow_id,
                    progress.current_stage,
                    progress.current_status,
                    progress.sending_route,
                    progress.progress_percentage,
                    stepper
                );
                if let Some(guide) = &progress.operation_guide {
                    out.push_str(&format!("\nNext: {}", guide.next_action));
                }
                Ok(out)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard_watch=info,client=info,polling=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(base) = &cli.api_base_url {
        config.set_api_base_url(base)?;
    }
    if let Some(ms) = cli.interval_ms {
        config.poll_interval = Duration::from_millis(ms);
    }

    let target = match cli.command {
        Command::Login { token } => {
            FileTokenStore::new(&config.token_file)
                .set_token(&token)
                .with_context(|| format!("Failed to write {}", config.token_file.display()))?;
            tracing::info!("Token stored in {}", config.token_file.display());
            return Ok(());
        }
        Command::Logout => {
            FileTokenStore::new(&config.token_file)
                .clear()
                .with_context(|| format!("Failed to remove {}", config.token_file.display()))?;
            tracing::info!("Token removed");
            return Ok(());
        }
        Command::Export {
            dataset,
            format,
            output,
        } => return export(&config, dataset, format, output).await,
        Command::Transaction { external_id } => Target::Transaction(external_id),
        Command::CashFlow { cash_flow_id } => Target::CashFlow(cash_flow_id),
    };

    watch_target(config, target).await
}

async fn export(
    config: &ClientConfig,
    dataset: Dataset,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let api = ApiClient::from_config(config)?;
    let file = match dataset {
        Dataset::Transactions => {
            api.export_transactions(format, &TransactionQueryCriteria::default(), &[])
                .await?
        }
        Dataset::CashFlows => {
            api.export_cash_flows(format, &CashFlowQueryCriteria::default())
                .await?
        }
    };

    let path = output.unwrap_or_else(|| {
        let fallback = match dataset {
            Dataset::Transactions => "transactions",
            Dataset::CashFlows => "cash_flows",
        };
        // Only the final component of a suggested name is trusted.
        file.filename
            .as_deref()
            .and_then(|name| std::path::Path::new(name).file_name())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}.{}", fallback, format.extension())))
    });
    tokio::fs::write(&path, &file.content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {} bytes to {}", file.content.len(), path.display());
    Ok(())
}

async fn watch_target(config: ClientConfig, target: Target) -> Result<()> {
    let api = ApiClient::from_config(&config)?;
    let state = AppState::new();
    let route = target.route();

    tracing::info!(
        "Watching {} at {} (api: {}, every {:?})",
        route.name(),
        route,
        api.base_url(),
        config.poll_interval
    );

    let watcher = Arc::new(Watcher {
        api,
        state: state.clone(),
        target,
        view: watch::Sender::new(None),
    });
    let mut view = watcher.view.subscribe();
    let mut status = state.subscribe();

    // First paint without waiting a full interval.
    if let Err(e) = watcher.refresh().await {
        tracing::warn!("Initial fetch failed: {}", e);
    }

    let mut session = {
        let watcher = Arc::clone(&watcher);
        PollingSession::new(
            move || {
                let watcher = Arc::clone(&watcher);
                async move { watcher.refresh().await }
            },
            config.poll_interval,
        )?
        .with_label(route.name())
    };
    session.start();

    if let Some(rendered) = view.borrow_and_update().as_deref() {
        println!("{}\n", rendered);
    }

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            Ok(()) = view.changed() => {
                if let Some(rendered) = view.borrow_and_update().as_deref() {
                    println!("{}\n", rendered);
                }
            }
            Ok(()) = status.changed() => {
                if let Some(error) = status.borrow_and_update().error.as_deref() {
                    eprintln!("error: {}", error);
                }
            }
        }
    }

    tracing::info!("Shutdown signal received, stopping...");
    session.stop();
    Ok(())
}
