//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 认证配置
    #[serde(default)]
    pub auth: AuthConfig,

    /// 限流配置
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// 后台维护配置
    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 允许的跨域来源，空表示任意来源
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// 请求体上限（字节）
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_body_limit() -> usize {
    1024 * 1024 // 1 MiB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx 连接串
    #[serde(default = "default_db_url")]
    pub url: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_url() -> String {
    "sqlite:data/vetclinic.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 数据库文件所在目录（内存库返回 None）
    pub fn data_dir(&self) -> Option<std::path::PathBuf> {
        let path = self.url.strip_prefix("sqlite:")?;
        let path = path.trim_start_matches("//");
        let path = path.split('?').next()?;
        if path.is_empty() || path.contains(":memory:") {
            return None;
        }
        std::path::Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
    }
}

/// 认证配置
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// 访问令牌签名密钥
    #[serde(default)]
    pub jwt_secret: String,

    /// 刷新令牌签名密钥
    #[serde(default)]
    pub refresh_secret: String,

    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,

    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// 未设置时禁用 Google 登录
    #[serde(default)]
    pub google_client_id: Option<String>,
}

fn default_access_ttl() -> i64 {
    900 // 15 分钟
}

fn default_refresh_ttl() -> i64 {
    7 * 24 * 3600 // 7 天
}

fn default_bcrypt_cost() -> u32 {
    10
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            refresh_secret: String::new(),
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
            bcrypt_cost: default_bcrypt_cost(),
            google_client_id: None,
        }
    }
}

impl AuthConfig {
    /// 去除空白后的 Google client id
    pub fn google_client_id(&self) -> Option<&str> {
        self.google_client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// 限流配置
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 固定窗口长度（秒）
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// 每窗口普通 API 请求上限
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// 每窗口认证接口请求上限
    #[serde(default = "default_auth_max_requests")]
    pub auth_max_requests: u32,
}

fn default_true() -> bool {
    true
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_requests() -> u32 {
    300
}

fn default_auth_max_requests() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
            auth_max_requests: default_auth_max_requests(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// 后台维护配置
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 清理间隔（秒）
    #[serde(default = "default_maintenance_interval")]
    pub interval_secs: u64,
}

fn default_maintenance_interval() -> u64 {
    3600 // 1 小时
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_maintenance_interval(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.database.url, "sqlite:data/vetclinic.db?mode=rwc");
        assert_eq!(config.auth.access_ttl_secs, 900);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.maintenance.interval_secs, 3600);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:4000");
    }

    #[test]
    fn test_data_dir() {
        let config = DatabaseConfig::default();
        assert_eq!(config.data_dir(), Some(std::path::PathBuf::from("data")));

        let memory = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..DatabaseConfig::default()
        };
        assert_eq!(memory.data_dir(), None);

        let bare = DatabaseConfig {
            url: "sqlite:clinic.db".to_string(),
            ..DatabaseConfig::default()
        };
        assert_eq!(bare.data_dir(), None);
    }

    #[test]
    fn test_blank_google_client_id_is_disabled() {
        let mut auth = AuthConfig::default();
        assert_eq!(auth.google_client_id(), None);

        auth.google_client_id = Some("  ".to_string());
        assert_eq!(auth.google_client_id(), None);

        auth.google_client_id = Some("abc.apps.googleusercontent.com".to_string());
        assert_eq!(auth.google_client_id(), Some("abc.apps.googleusercontent.com"));
    }
}
