use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::db::{InvoiceReader, StoreError};
use crate::models::ItemSummary;
use crate::service::workflow::{WorkflowError, WorkflowService};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("QR payload is not a URL: {0}")]
    InvalidUrl(String),

    #[error("failed to read invoice history: {0}")]
    Store(#[from] StoreError),

    #[error("receipt workflow failed: {0}")]
    Transport(#[from] WorkflowError),
}

/// 仅接受带 scheme 和 authority 的 URL
pub fn is_dispatchable(raw_text: &str) -> bool {
    Url::parse(raw_text.trim())
        .map(|url| url.has_authority())
        .unwrap_or(false)
}

/// 收据派发: 校验二维码文本, 附上历史明细后交给外部工作流
pub struct ReceiptDispatcher {
    reader: Arc<dyn InvoiceReader>,
    workflow: Arc<dyn WorkflowService>,
}

impl ReceiptDispatcher {
    pub fn new(reader: Arc<dyn InvoiceReader>, workflow: Arc<dyn WorkflowService>) -> Self {
        Self { reader, workflow }
    }

    /// 派发一次收据, 不重试
    ///
    /// 非 URL 文本直接返回 `InvalidUrl`, 不读库也不发请求。
    pub async fn dispatch(&self, raw_text: &str) -> Result<Value, DispatchError> {
        let qr_url = raw_text.trim();
        if !is_dispatchable(qr_url) {
            tracing::info!("QR text is not a URL, not dispatching: {}", qr_url);
            return Err(DispatchError::InvalidUrl(qr_url.to_string()));
        }

        let items: Vec<ItemSummary> = self
            .reader
            .list_items()
            .await?
            .iter()
            .map(ItemSummary::from)
            .collect();

        tracing::info!("派发收据 {}, 附带 {} 条历史明细", qr_url, items.len());

        match self.workflow.process_receipt(qr_url, &items).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::error!("Receipt dispatch failed for {}: {}", qr_url, e);
                Err(e.into())
            }
        }
    }
}
