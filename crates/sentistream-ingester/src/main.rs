mod generator;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

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

    let interval = Duration::from_secs_f64(60.0 / f64::from(config.ingest_posts_per_minute.max(1)));
    let deadline = config
        .ingest_duration_secs
        .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));

    tracing::info!(
        stream = %config.stream_name,
        posts_per_minute = config.ingest_posts_per_minute,
        duration_secs = config.ingest_duration_secs,
        "ingester started"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    let mut published: u64 = 0;
    loop {
        if let Some(deadline) = deadline {
            if tokio::time::Instant::now() >= deadline {
                break;
            }
        }
        tokio::select! {
            _ = ticker.tick() => {}
            () = &mut shutdown => break,
        }

        let post = generator::generate_post(&mut rand::rng());
        match sentistream_db::append(&pool, &config.stream_name, &post).await {
            Ok(entry_id) => {
                published += 1;
                tracing::debug!(entry_id, post_id = %post["post_id"], "post published");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to publish post");
            }
        }
    }

    tracing::info!(published, "ingester stopped");
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
}
