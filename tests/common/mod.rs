#![allow(dead_code)]

use axum::async_trait;
use receipt_ledger_rust::config::DatabaseConfig;
use receipt_ledger_rust::db::{create_lazy_pool, create_pool, init_schema};
use receipt_ledger_rust::models::{AnalyticsItem, ItemSummary};
use receipt_ledger_rust::service::{WorkflowError, WorkflowService};
use receipt_ledger_rust::AppConfig;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// 测试库连接串, 未设置时跳过依赖 Postgres 的用例
pub fn test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty())
}

fn database_config(url: String) -> DatabaseConfig {
    let mut database = AppConfig::default().database;
    database.url = Some(url);
    database
}

pub async fn test_pool() -> Option<PgPool> {
    let Some(url) = test_database_url() else {
        eprintln!("TEST_DATABASE_URL not set, skipping Postgres-backed test");
        return None;
    };
    let pool = create_pool(&database_config(url)).await.unwrap();
    init_schema(&pool).await.unwrap();
    Some(pool)
}

/// 不连库的连接池, 用于不触及存储的路由
pub fn lazy_pool() -> PgPool {
    create_lazy_pool(&database_config(
        "postgres://nobody@127.0.0.1:1/unused".to_string(),
    ))
    .unwrap()
}

/// 写库用例串行执行, 需要观察整张表的用例依赖它
pub async fn exclusive_table() -> tokio::sync::MutexGuard<'static, ()> {
    static TABLE: OnceLock<tokio::sync::Mutex<()>> = OnceLock::new();
    TABLE.get_or_init(|| tokio::sync::Mutex::new(())).lock().await
}

/// 每个用例唯一的名字前缀, 避免并行用例互相干扰
pub fn unique_tag(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}-{}", prefix, std::process::id(), nanos)
}

/// 固定回复的工作流替身
#[derive(Default)]
pub struct StubWorkflow {
    pub receipts: Mutex<Vec<String>>,
    pub questions: Mutex<Vec<String>>,
}

#[async_trait]
impl WorkflowService for StubWorkflow {
    async fn process_receipt(
        &self,
        qr_url: &str,
        _items: &[ItemSummary],
    ) -> Result<Value, WorkflowError> {
        self.receipts.lock().unwrap().push(qr_url.to_string());
        Ok(json!([{"crtd": "2024-01-05 10:00:00 +0100"}, {"id": 1, "name": "Milk"}]))
    }

    async fn answer_question(
        &self,
        question: &str,
        _items: &[AnalyticsItem],
    ) -> Result<Option<String>, WorkflowError> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(Some("stub answer".to_string()))
    }
}
