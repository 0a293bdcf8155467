mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use trialflow_shared::OrderType;
use trialflow_store::{app_config::Config, DbClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "trialflow", version, about = "Inspect trial workflow decisions against the billing database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Show the step a purchase of an offer enrolls into
    Initial {
        #[arg(long)]
        offer: i64,
        /// Workflow to use instead of the offer's default
        #[arg(long)]
        workflow: Option<i64>,
    },
    /// Show the overrides the next rebill of an order would receive
    Rebill {
        #[arg(long)]
        order: i64,
        #[arg(long, value_enum, default_value_t = OrderKind::Main)]
        order_type: OrderKind,
    },
    /// Show decline, confirmation and shipping policy for a main order chain
    Chain {
        #[arg(long)]
        order: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderKind {
    Main,
    Upsell,
}

impl From<OrderKind> for OrderType {
    fn from(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Main => OrderType::Main,
            OrderKind::Upsell => OrderType::Upsell,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("Failed to load config")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to database")?;

    let output = match cli.command {
        Command::Migrate => {
            db.migrate().await?;
            serde_json::json!({ "migrated": true })
        }
        Command::Initial { offer, workflow } => {
            commands::initial(&db.repositories(), offer, workflow).await?
        }
        Command::Rebill { order, order_type } => {
            commands::rebill(&db.repositories(), order, order_type.into()).await?
        }
        Command::Chain { order } => commands::chain(&db.repositories(), order).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
