use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

use payment_sessions_api::cleanup::CleanupScheduler;
use payment_sessions_api::config::{init_tracing, load_config};
use payment_sessions_api::events::{process_events, EventSender};
use payment_sessions_api::gateway::SecurityGateway;
use payment_sessions_api::handlers::app_router;
use payment_sessions_api::service::SessionService;
use payment_sessions_api::settlement::{MockSettlementProcessor, SettlementProcessor};
use payment_sessions_api::store::SessionStore;
use payment_sessions_api::tokenization::CardTokenizer;
use payment_sessions_api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(&config.log_level, config.log_json);
    info!(environment = %config.environment, "starting payment sessions API");

    let (event_tx, event_rx) = mpsc::channel(1024);
    tokio::spawn(process_events(event_rx));
    let events = EventSender::new(event_tx);

    let policy = config.policy.clone();
    let store = Arc::new(SessionStore::new(policy.session_ttl(), policy.max_retries));
    let settlement: Arc<dyn SettlementProcessor> = Arc::new(MockSettlementProcessor);
    let service = Arc::new(SessionService::new(
        Arc::clone(&store),
        settlement,
        events.clone(),
        policy.clone(),
    ));
    let tokenizer = CardTokenizer::new(config.token_secret.clone());
    let gateway = Arc::new(SecurityGateway::new(service, tokenizer));

    let scheduler =
        CleanupScheduler::start(Arc::clone(&store), events.clone(), policy.sweep_interval());

    let state = AppState { gateway, store };
    let app = app_router(state);

    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    scheduler.stop().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
