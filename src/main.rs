use time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::Key};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use my_finance_server::{
    AppState, app,
    config::Config,
    constants::{DEFAULT_LOG_FILTER, SESSION_EXPIRY_DAYS, SESSION_NAME, SNAPSHOT_IDLE_SECS},
    database, recurring, snapshot,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let main_db = database::init_main_db(&config.data_path).await?;
    info!(data_path = %config.data_path, "main database ready");

    let state = AppState::new(main_db, &config.data_path);

    // TODO: MemoryStore never evicts expired sessions; swap in a store with deletion tasks
    // before running long-lived deployments.
    let key = Key::try_from(config.session_secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid session secret: {:?}", e))?;
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_name(SESSION_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_EXPIRY_DAYS)))
        .with_signed(key);

    snapshot::spawn_eviction(
        state.snapshots.clone(),
        std::time::Duration::from_secs(SNAPSHOT_IDLE_SECS),
    );
    recurring::spawn_scheduler(state.clone(), config.recurring_interval_secs);
    info!(
        interval_secs = config.recurring_interval_secs,
        "recurring transaction scheduler started"
    );

    let app = app(state).layer(session_layer);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
