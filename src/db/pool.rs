use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;

/// 启动时确保表结构存在
const TABLE_DEFINITIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS invoice_items (
        id SERIAL PRIMARY KEY,
        invoice_id INTEGER NOT NULL,
        name VARCHAR(255) NOT NULL,
        category VARCHAR(255) NOT NULL,
        unit VARCHAR(255) NOT NULL,
        unit_price NUMERIC(10, 2) NOT NULL,
        quantity DOUBLE PRECISION NOT NULL,
        price NUMERIC(10, 2) NOT NULL,
        date DATE NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice_id ON invoice_items (invoice_id)",
];

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let connect_options = connect_options(config)?;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options)
        .await
}

/// 延迟连接的连接池, 首次查询时才建立连接
pub fn create_lazy_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let connect_options = connect_options(config)?;

    Ok(PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy_with(connect_options))
}

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    let connect_options = PgConnectOptions::from_str(&config.connection_url())?;

    // 设置慢查询日志阈值为 5秒
    Ok(connect_options.log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(5)))
}

/// 建表 (幂等)
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    for sql in TABLE_DEFINITIONS {
        sqlx::query(sql).execute(&mut *conn).await?;
    }
    tracing::info!("invoice_items 表已就绪");
    Ok(())
}
