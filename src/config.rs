use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub webhooks: WebhookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 完整连接串, 设置后覆盖下面的分项
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

/// 外部工作流 webhook 地址
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub receipt_url: Option<String>,
    pub analytics_url: Option<String>,
    pub timeout_secs: u64,
}

/// 环境变量的扁平视图 (DB_HOST -> db_host)
#[derive(Debug, Deserialize)]
struct EnvSettings {
    server_host: String,
    port: u16,
    database_url: Option<String>,
    db_host: String,
    db_port: u16,
    db_user: String,
    db_password: String,
    db_database: String,
    db_max_connections: u32,
    receipt_webhook_url: Option<String>,
    analytics_webhook_url: Option<String>,
    webhook_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 4000,
            },
            database: DatabaseConfig {
                url: None,
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new(),
                database: "receipts".to_string(),
                max_connections: 10,
            },
            webhooks: WebhookConfig {
                receipt_url: None,
                analytics_url: None,
                timeout_secs: 60,
            },
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default())
    }

    /// 从给定的环境源加载, 缺省值取 `AppConfig::default()`
    pub fn from_environment(env: Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("server_host", defaults.server.host)?
            .set_default("port", defaults.server.port)?
            .set_default("db_host", defaults.database.host)?
            .set_default("db_port", defaults.database.port)?
            .set_default("db_user", defaults.database.user)?
            .set_default("db_password", defaults.database.password)?
            .set_default("db_database", defaults.database.database)?
            .set_default("db_max_connections", defaults.database.max_connections)?
            .set_default("webhook_timeout_secs", defaults.webhooks.timeout_secs)?
            .add_source(env.try_parsing(true))
            .build()?;

        let raw: EnvSettings = settings.try_deserialize()?;

        Ok(Self {
            server: ServerConfig {
                host: raw.server_host,
                port: raw.port,
            },
            database: DatabaseConfig {
                url: non_empty(raw.database_url),
                host: raw.db_host,
                port: raw.db_port,
                user: raw.db_user,
                password: raw.db_password,
                database: raw.db_database,
                max_connections: raw.db_max_connections,
            },
            webhooks: WebhookConfig {
                receipt_url: non_empty(raw.receipt_webhook_url),
                analytics_url: non_empty(raw.analytics_webhook_url),
                timeout_secs: raw.webhook_timeout_secs,
            },
        })
    }
}

impl DatabaseConfig {
    /// 拼接 postgres 连接串
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        if self.password.is_empty() {
            format!(
                "postgres://{}@{}:{}/{}",
                self.user, self.host, self.port, self.database
            )
        } else {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            )
        }
    }
}

// 密码不进日志
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = if self.password.is_empty() { "" } else { "******" };
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "******"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &masked)
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
