use autodialer_rs::config::Config;
use autodialer_rs::handlers;
use autodialer_rs::repo;
use autodialer_rs::types::AppState;

use std::sync::Arc;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", tracing_subscriber::filter::LevelFilter::OFF),
            ("autodialer_rs", tracing_subscriber::filter::LevelFilter::DEBUG),
        ]));
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let config = Config::from_env();
    let addr = config.bind_addr.parse().expect("invalid BIND_ADDR");
    let db_pool = repo::connect(&config.database_url)
        .await
        .expect("failed to open database");
    let http_client = reqwest::Client::new();
    tracing::info!(addr=%config.bind_addr, mock_mode=config.mock_mode, "starting autodialer");

    let app_state = Arc::new(AppState {
        config,
        http_client,
        db_pool,
    });
    let app = handlers::router(app_state);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
