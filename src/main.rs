use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qotd::bot::Bot;
use qotd::client::{ChatClient, SlackClient};
use qotd::config::BotConfig;
use qotd::server::{self, ServerState};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qotd=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting QOTD Bot...");

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let client = Arc::new(SlackClient::new(config.bot_token.clone()));

    let bot_user = match client.auth_test().await {
        Ok(user) => {
            tracing::info!(user, "Connected to Slack");
            Some(user)
        }
        Err(e) => {
            tracing::warn!(
                "auth.test failed: {}. Public-channel mentions will be ignored.",
                e
            );
            None
        }
    };

    match client.refresh_user_list().await {
        Ok(count) => tracing::info!(count, "User list loaded"),
        Err(e) => tracing::warn!("Could not load user list: {}", e),
    }

    let bot = match Bot::new(client, &config) {
        Ok(bot) => Arc::new(bot),
        Err(e) => {
            tracing::error!("Could not load data files: {}", e);
            std::process::exit(1);
        }
    };

    let (events_tx, events_rx) = mpsc::channel(256);
    server::spawn_dispatcher(bot, events_rx);

    let state = Arc::new(ServerState {
        signing_secret: config.signing_secret,
        bot_user,
        events: events_tx,
    });
    let app = server::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
