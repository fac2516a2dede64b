//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

const ENV_PREFIX: &str = "VETCLINIC";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VETCLINIC_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VETCLINIC_SERVER__PORT=8080`
/// - `VETCLINIC_SERVER__CORS_ORIGINS=https://a.example,https://b.example`
/// - `VETCLINIC_DATABASE__URL=sqlite:/var/lib/vetclinic/db.sqlite?mode=rwc`
/// - `VETCLINIC_AUTH__JWT_SECRET=...`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 4000)?
        .set_default("server.body_limit_bytes", 1024 * 1024)?
        .set_default("database.url", "sqlite:data/vetclinic.db?mode=rwc")?
        .set_default("database.max_connections", 5)?
        .set_default("auth.access_ttl_secs", 900)?
        .set_default("auth.refresh_ttl_secs", 7 * 24 * 3600)?
        .set_default("auth.bcrypt_cost", 10)?
        .set_default("rate_limit.enabled", true)?
        .set_default("rate_limit.window_secs", 60)?
        .set_default("rate_limit.max_requests", 300)?
        .set_default("rate_limit.auth_max_requests", 20)?
        .set_default("maintenance.enabled", true)?
        .set_default("maintenance.interval_secs", 3600)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级），cors_origins 以逗号分隔
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("server.cors_origins")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub(crate) fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.database.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Database url cannot be empty".to_string(),
        ));
    }

    let auth = &config.auth;
    if auth.jwt_secret.is_empty() || auth.refresh_secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.jwt_secret and auth.refresh_secret must be set".to_string(),
        ));
    }
    if auth.jwt_secret == auth.refresh_secret {
        return Err(ConfigError::ValidationError(
            "auth.jwt_secret and auth.refresh_secret must differ".to_string(),
        ));
    }
    if auth.access_ttl_secs <= 0 || auth.refresh_ttl_secs <= 0 {
        return Err(ConfigError::ValidationError(
            "Token lifetimes must be positive".to_string(),
        ));
    }
    if !(4..=31).contains(&auth.bcrypt_cost) {
        return Err(ConfigError::ValidationError(format!(
            "auth.bcrypt_cost must be within 4..=31, got {}",
            auth.bcrypt_cost
        )));
    }

    if config.rate_limit.enabled && config.rate_limit.window_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Rate limit window cannot be 0 when rate limiting is enabled".to_string(),
        ));
    }

    if config.maintenance.enabled && config.maintenance.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Maintenance interval cannot be 0 when maintenance is enabled".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志），不输出密钥
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    if config.server.cors_origins.is_empty() {
        tracing::info!("CORS Origins: *");
    } else {
        tracing::info!("CORS Origins: {}", config.server.cors_origins.join(", "));
    }
    tracing::info!("Body Limit: {} bytes", config.server.body_limit_bytes);
    tracing::info!("Database: {}", config.database.url);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!(
        "Token TTL: access {}s, refresh {}s",
        config.auth.access_ttl_secs,
        config.auth.refresh_ttl_secs
    );
    tracing::info!("Bcrypt Cost: {}", config.auth.bcrypt_cost);
    tracing::info!(
        "Google Login: {}",
        if config.auth.google_client_id().is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );
    tracing::info!("Rate Limit Enabled: {}", config.rate_limit.enabled);
    if config.rate_limit.enabled {
        tracing::info!(
            "Rate Limit: {} req / {} auth req per {}s",
            config.rate_limit.max_requests,
            config.rate_limit.auth_max_requests,
            config.rate_limit.window_secs
        );
    }
    tracing::info!("Maintenance Enabled: {}", config.maintenance.enabled);
    if config.maintenance.enabled {
        tracing::info!("Maintenance Interval: {}s", config.maintenance.interval_secs);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
