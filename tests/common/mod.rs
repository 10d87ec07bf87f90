use autodialer_rs::config::Config;
use autodialer_rs::repo;
use autodialer_rs::types::AppState;

use std::sync::Arc;
use tempfile::TempDir;

/// Fresh app state over a throwaway SQLite file.  The `TempDir` guard must
/// be kept alive for the duration of the test.
pub async fn test_state() -> (Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let url = format!("sqlite://{}/test.db", dir.path().display());
    let mut config = Config::for_tests();
    config.database_url = url.clone();
    let db_pool = repo::connect(&url).await.expect("failed to open test db");
    let state = Arc::new(AppState {
        config,
        http_client: reqwest::Client::new(),
        db_pool,
    });
    (state, dir)
}
