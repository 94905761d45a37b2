use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use k1s0_order_server::adapter::handler::{self, AppState};
use k1s0_order_server::adapter::repository::import_job_in_memory::InMemoryImportJobStore;
use k1s0_order_server::adapter::repository::order_in_memory::InMemoryOrderRepository;
use k1s0_order_server::adapter::repository::order_postgres::OrderPostgresRepository;
use k1s0_order_server::domain::repository::OrderRepository;
use k1s0_order_server::domain::service::ImportJobRegistry;
use k1s0_order_server::infrastructure::config::Config;
use k1s0_order_server::infrastructure::logger::init_logger;
use k1s0_order_server::infrastructure::metrics::ImportMetrics;
use k1s0_order_server::infrastructure::stamp_renderer::{HttpStampRenderer, StampRenderer};
use k1s0_order_server::usecase::{
    GetImportJobUseCase, ImportOrdersUseCase, RegenerateStampUseCase, RunImportJobUseCase,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    // Logger
    init_logger(&cfg.log)?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting order server"
    );

    // Database pool (optional)
    let db_pool = if let Some(ref db_config) = cfg.database {
        let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| db_config.connection_url());
        info!("connecting to database");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .connect(&url)
            .await?;
        info!("database connection pool established");
        Some(pool)
    } else if let Ok(url) = std::env::var("DATABASE_URL") {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(25)
            .connect(&url)
            .await?;
        info!("database connection pool established from DATABASE_URL");
        Some(pool)
    } else {
        info!("no database configured, using in-memory order repository");
        None
    };

    if let Some(ref pool) = db_pool {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("database migrations applied");
    }

    // Order repository
    let order_repo: Arc<dyn OrderRepository> = if let Some(ref pool) = db_pool {
        Arc::new(OrderPostgresRepository::new(pool.clone()))
    } else {
        Arc::new(InMemoryOrderRepository::new())
    };

    // Stamp renderer
    let stamp_renderer: Arc<dyn StampRenderer> =
        Arc::new(HttpStampRenderer::new(&cfg.stamp_renderer)?);
    info!(base_url = %cfg.stamp_renderer.base_url, "stamp renderer client initialized");

    // Metrics
    let metrics = Arc::new(ImportMetrics::new(&cfg.app.name)?);

    // Job registry（ジョブ状態はプロセス内のみ）
    let registry = Arc::new(ImportJobRegistry::new(Arc::new(InMemoryImportJobStore::new())));

    // Use cases
    let import_uc = Arc::new(
        ImportOrdersUseCase::new(
            order_repo.clone(),
            stamp_renderer.clone(),
            cfg.import.max_rows_per_import,
        )
        .with_metrics(metrics.clone()),
    );
    let run_import_job_uc = Arc::new(
        RunImportJobUseCase::new(registry.clone(), import_uc, cfg.import.job_retention())
            .with_metrics(metrics.clone()),
    );
    let get_import_job_uc = Arc::new(GetImportJobUseCase::new(registry));
    let regenerate_stamp_uc = Arc::new(RegenerateStampUseCase::new(order_repo, stamp_renderer));

    let state = AppState {
        run_import_job_uc,
        get_import_job_uc,
        regenerate_stamp_uc,
        metrics,
        db_pool,
        max_upload_bytes: cfg.import.max_file_size_bytes(),
    };

    // Router
    let app = handler::router(state);

    // REST server
    let host: std::net::IpAddr = cfg.server.host.parse()?;
    let rest_addr = SocketAddr::new(host, cfg.server.port);
    info!("REST server starting on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("order server exited");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
