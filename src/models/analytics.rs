use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::InvoiceItem;

/// 空问题的固定回复
pub const QUESTION_REQUIRED: &str = "Question is required.";

/// 工作流没有给出 output 时的回复
pub const NO_ANSWER: &str = "No answer received from analytics service.";

/// 分析请求中的单条明细, 日期为 "YYYY-MM-DD"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsItem {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub unit_price: BigDecimal,
    pub quantity: f64,
    pub price: BigDecimal,
    pub date: String,
}

impl From<&InvoiceItem> for AnalyticsItem {
    fn from(item: &InvoiceItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            category: item.category.clone(),
            unit: item.unit.clone(),
            unit_price: item.unit_price.clone(),
            quantity: item.quantity,
            price: item.price.clone(),
            date: item.date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// 分析工作流请求体 `{ question, items }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsPayload {
    pub question: String,
    pub items: Vec<AnalyticsItem>,
}

/// POST /api/analytics 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsRequest {
    /// 缺省或 null 都按空问题处理
    #[serde(default)]
    pub question: Option<String>,
}

/// POST /api/analytics 响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub answer: String,
}
