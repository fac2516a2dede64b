//! VetClinic - 多诊所宠物医院管理后端
//!
//! 启动顺序：配置 -> 日志 -> 数据库 -> 适配器 -> AppState -> 维护 Worker -> HTTP

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use vetclinic::application::ports::{IdentityProviderPort, RefreshTokenRepositoryPort};
use vetclinic::config::{load_config, print_config, AppConfig};
use vetclinic::infrastructure::adapters::{
    BcryptPasswordHasher, GoogleIdentityVerifier, GoogleVerifierConfig, JwtConfig,
    JwtTokenService,
};
use vetclinic::infrastructure::events::EventPublisher;
use vetclinic::infrastructure::http::{AppPorts, AppState, HttpServer, ServerConfig};
use vetclinic::infrastructure::memory::{InMemoryRateLimiter, RateLimitConfig};
use vetclinic::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteAppointmentRepository,
    SqliteClinicAccessRepository, SqliteClinicRepository, SqliteDashboardRepository,
    SqliteInvoiceRepository, SqliteMedicalRecordRepository, SqlitePatientRepository,
    SqliteProductRepository, SqliteRefreshTokenRepository, SqliteUserRepository,
};
use vetclinic::infrastructure::worker::{MaintenanceWorker, MaintenanceWorkerConfig};

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},vetclinic={},tower_http=debug,sqlx=warn",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("VetClinic backend v{}", env!("CARGO_PKG_VERSION"));
    print_config(&config);

    // 确保数据目录存在
    if let Some(dir) = config.database.data_dir() {
        tokio::fs::create_dir_all(&dir).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig::new(&config.database.url, config.database.max_connections);
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 认证适配器
    let tokens = Arc::new(JwtTokenService::new(&JwtConfig {
        access_secret: config.auth.jwt_secret.clone(),
        refresh_secret: config.auth.refresh_secret.clone(),
        access_ttl_secs: config.auth.access_ttl_secs,
        refresh_ttl_secs: config.auth.refresh_ttl_secs,
    }));
    let identity: Option<Arc<dyn IdentityProviderPort>> = match config.auth.google_client_id() {
        Some(client_id) => {
            let verifier: Arc<dyn IdentityProviderPort> = Arc::new(GoogleIdentityVerifier::new(
                GoogleVerifierConfig::new(client_id),
            )?);
            Some(verifier)
        }
        None => {
            tracing::info!("Google login disabled (no client id configured)");
            None
        }
    };

    let refresh_repo: Arc<dyn RefreshTokenRepositoryPort> =
        Arc::new(SqliteRefreshTokenRepository::new(pool.clone()));

    let ports = AppPorts {
        user_repo: Arc::new(SqliteUserRepository::new(pool.clone())),
        refresh_repo: refresh_repo.clone(),
        clinic_repo: Arc::new(SqliteClinicRepository::new(pool.clone())),
        access_repo: Arc::new(SqliteClinicAccessRepository::new(pool.clone())),
        patient_repo: Arc::new(SqlitePatientRepository::new(pool.clone())),
        appointment_repo: Arc::new(SqliteAppointmentRepository::new(pool.clone())),
        record_repo: Arc::new(SqliteMedicalRecordRepository::new(pool.clone())),
        invoice_repo: Arc::new(SqliteInvoiceRepository::new(pool.clone())),
        product_repo: Arc::new(SqliteProductRepository::new(pool.clone())),
        dashboard_repo: Arc::new(SqliteDashboardRepository::new(pool.clone())),
        tokens,
        hasher: Arc::new(BcryptPasswordHasher::new(config.auth.bcrypt_cost)),
        identity,
    };

    // 事件发布器与限流器
    let event_publisher = Arc::new(EventPublisher::new());
    let rate_limiter = Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
        enabled: config.rate_limit.enabled,
        window: config.rate_limit.window(),
        max_requests: config.rate_limit.max_requests,
        auth_max_requests: config.rate_limit.auth_max_requests,
    }));

    let state = Arc::new(AppState::new(
        ports,
        event_publisher.clone(),
        rate_limiter.clone(),
    ));

    // 启动维护 Worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = if config.maintenance.enabled {
        let worker = MaintenanceWorker::new(
            MaintenanceWorkerConfig {
                interval: Duration::from_secs(config.maintenance.interval_secs),
            },
            refresh_repo,
            rate_limiter,
            event_publisher,
        );
        Some(tokio::spawn(worker.run(shutdown_rx)))
    } else {
        None
    };

    // 创建 HTTP 服务器
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        cors_origins: config.server.cors_origins.clone(),
        body_limit_bytes: config.server.body_limit_bytes,
    };
    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "MaintenanceWorker task ended abnormally");
        }
    }

    pool.close().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}
