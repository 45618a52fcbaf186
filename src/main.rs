use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyboard::{api, party::RoomRegistry};
use storyboard_core::db::Database;

#[derive(Parser)]
#[command(name = "storyboard")]
#[command(about = "Collaborative story tracking with agent runs and live presence")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Storyboard server
    Serve {
        /// Port for HTTP API and presence WebSocket
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Path to the database file (defaults to the platform data dir)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Keep all state in memory; nothing survives exit
        #[arg(long)]
        ephemeral: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "storyboard=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let (port, db) = match cli.command {
        Some(Commands::Serve {
            port,
            db,
            ephemeral,
        }) => (port, open_database(db, ephemeral)?),
        // Default: serve on 3000 with the default database
        None => (3000, open_database(None, false)?),
    };
    db.migrate()?;

    let app = api::create_router(db, RoomRegistry::new());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Storyboard server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn open_database(path: Option<PathBuf>, ephemeral: bool) -> anyhow::Result<Database> {
    if ephemeral {
        Database::open_memory()
    } else if let Some(path) = path {
        Database::open(path)
    } else {
        Database::open_default()
    }
}
