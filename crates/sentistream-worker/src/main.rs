mod notify;
mod payload;
mod worker;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::worker::Worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = sentistream_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = sentistream_db::PoolConfig::from_app_config(&config);
    let pool = sentistream_db::connect_pool(&config.database_url, pool_config).await?;
    sentistream_db::run_migrations(&pool).await?;

    let analyzer = sentistream_analyzer::build_analyzer(
        &config.analyzer_backend,
        Duration::from_secs(config.analyzer_timeout_secs),
    );

    let worker = Worker::from_config(pool, analyzer, &config);
    worker.bootstrap().await?;
    worker.run(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
