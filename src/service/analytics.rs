use std::sync::Arc;

use crate::db::InvoiceReader;
use crate::models::{AnalyticsItem, NO_ANSWER};
use crate::service::workflow::WorkflowService;

/// 分析请求的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// 空问题, 本地直接拒绝
    QuestionRequired,
    /// 工作流的回答, 或错误被转成的文字
    Text(String),
}

/// 分析转发: 带上全部明细把问题交给外部工作流
///
/// 传输和存储失败都不往外抛, 转成以 "Error: " 开头的回答。
pub struct AnalyticsForwarder {
    reader: Arc<dyn InvoiceReader>,
    workflow: Arc<dyn WorkflowService>,
}

impl AnalyticsForwarder {
    pub fn new(reader: Arc<dyn InvoiceReader>, workflow: Arc<dyn WorkflowService>) -> Self {
        Self { reader, workflow }
    }

    pub async fn ask(&self, question: &str) -> Answer {
        if question.trim().is_empty() {
            return Answer::QuestionRequired;
        }
        tracing::info!("Received analytics question: {}", question);

        match self.forward(question).await {
            Ok(answer) => Answer::Text(answer),
            Err(e) => {
                tracing::error!("Analytics forwarding failed: {}", e);
                Answer::Text(format!("Error: {}", e))
            }
        }
    }

    async fn forward(&self, question: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let items: Vec<AnalyticsItem> = self
            .reader
            .list_items()
            .await?
            .iter()
            .map(AnalyticsItem::from)
            .collect();
        tracing::debug!("分析请求附带 {} 条明细", items.len());

        let answer = self.workflow.answer_question(question, &items).await?;
        Ok(answer.unwrap_or_else(|| NO_ANSWER.to_string()))
    }
}
