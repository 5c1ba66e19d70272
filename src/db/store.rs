use axum::async_trait;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::db::queries::{self, INSERT_CHUNK_SIZE};
use crate::models::{resolve_invoice_date, InvalidInvoice, InvoiceItem, NewItem};

/// 单个 INSERT 语句的超时
const DEFAULT_INSERT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid invoice: {0}")]
    Invalid(#[from] InvalidInvoice),

    #[error("insert timed out after {0:?}")]
    Timeout(Duration),
}

/// 只读的明细来源, 收据派发和分析转发依赖它
#[async_trait]
pub trait InvoiceReader: Send + Sync {
    async fn list_items(&self) -> Result<Vec<InvoiceItem>, StoreError>;
}

/// 发票明细存储
#[derive(Clone)]
pub struct InvoiceStore {
    pool: PgPool,
    insert_timeout: Duration,
}

impl InvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            insert_timeout: DEFAULT_INSERT_TIMEOUT,
        }
    }

    /// 在一个事务里分配发票号并写入全部明细, 返回发票号
    ///
    /// 1. 开启事务并加发票号锁
    /// 2. 发票号 = MAX(invoice_id) + 1
    /// 3. 明细非空时批量插入, 每行带同一个发票号
    /// 4. 提交; 任一步失败整体回滚, 不留下部分行
    ///
    /// `items` 为空时照样分配并返回新发票号, 但不写任何行。
    /// 连接在提交、回滚或 drop 时都会归还连接池。
    pub async fn commit_invoice(
        &self,
        date: Option<NaiveDate>,
        items: &[NewItem],
    ) -> Result<i32, StoreError> {
        let invoice_date = resolve_invoice_date(date, items)?;

        let start_time = Instant::now();
        let mut tx = self.pool.begin().await?;

        match self.write_invoice(&mut *tx, invoice_date, items).await {
            Ok(invoice_id) => {
                tx.commit().await?;
                tracing::info!(
                    "✓ 发票 {} 已保存, {} 条明细, 耗时: {:?}",
                    invoice_id,
                    items.len(),
                    start_time.elapsed()
                );
                Ok(invoice_id)
            }
            Err(e) => {
                tracing::error!("✗ 保存发票失败, 回滚事务: {}", e);
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("回滚失败 (连接归还时将被丢弃): {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn write_invoice(
        &self,
        conn: &mut PgConnection,
        date: Option<NaiveDate>,
        items: &[NewItem],
    ) -> Result<i32, StoreError> {
        queries::lock_invoice_ids(&mut *conn).await?;
        let invoice_id = queries::next_invoice_id(&mut *conn).await?;
        tracing::debug!("分配发票号 {}, 待写入 {} 条明细", invoice_id, items.len());

        for chunk in items.chunks(INSERT_CHUNK_SIZE) {
            let execute_result = tokio::time::timeout(
                self.insert_timeout,
                queries::insert_items(&mut *conn, invoice_id, date, chunk),
            )
            .await;

            match execute_result {
                Ok(Ok(rows)) => {
                    tracing::debug!("INSERT 影响 {} 行", rows);
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    tracing::error!("✗ INSERT操作超时 (>{:?})!", self.insert_timeout);
                    return Err(StoreError::Timeout(self.insert_timeout));
                }
            }
        }

        Ok(invoice_id)
    }
}

#[async_trait]
impl InvoiceReader for InvoiceStore {
    async fn list_items(&self) -> Result<Vec<InvoiceItem>, StoreError> {
        let items = queries::list_items(&self.pool).await?;
        tracing::debug!("读取 {} 条明细", items.len());
        Ok(items)
    }
}
