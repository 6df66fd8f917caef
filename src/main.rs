use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ing_payment_gateway::app::{logging, AppState, Config};
use ing_payment_gateway::handlers;
use ing_payment_gateway::models::{PaymentMethod, PaymentRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "ing-gateway", version, about = "ING Open Banking payment gateway")]
struct Cli {
    /// TOML configuration file; environment variables override its values
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve POST /payments
    Serve,
    /// Initiate a single payment and print the result
    Pay {
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "EUR")]
        currency: String,
        #[arg(long)]
        return_url: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = PaymentMethod::IngOpenBanking.as_str())]
        payment_method: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config.logging.level);

    let state = Arc::new(AppState::from_config(&config));

    match cli.command {
        Command::Serve => serve(state, config.server.port).await,
        Command::Pay {
            amount,
            currency,
            return_url,
            description,
            payment_method,
        } => {
            let request = PaymentRequest {
                currency,
                amount,
                payment_method,
                return_url,
                description,
                status: "processing".to_string(),
            };
            let response = state.launcher.process_transaction(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("ING gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
