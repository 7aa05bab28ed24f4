use std::sync::Arc;
use std::time::Duration;

use flashdeck_api::assistant::{CardGenerator, OpenAiClient};
use flashdeck_api::auth::TokenCodec;
use flashdeck_api::config::AppConfig;
use flashdeck_api::state::AppState;
use flashdeck_api::{app, database};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, OPENAI_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("configuration error: {}", err);
            std::process::exit(1);
        }
    };
    tracing::info!("starting flashdeck API in {:?} mode", config.environment);

    let pool = match database::connect(&config.database_url).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!("failed to connect to database: {}", err);
            std::process::exit(1);
        }
    };
    tracing::info!("connected to database");

    let client = Arc::new(OpenAiClient::new(config.assistant.api_key.clone()));
    let generator = Arc::new(CardGenerator::new(
        client,
        Duration::from_secs(config.assistant.poll_deadline_secs),
    ));
    let codec = TokenCodec::new(&config.security.jwt_secret);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let state = AppState {
        config,
        pool,
        codec,
        generator,
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("server listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.expect("server");
}
