use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::InvoiceItem;

/// 发给工作流的历史明细摘要, 价格和数量下游不需要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub date: NaiveDate,
}

impl From<&InvoiceItem> for ItemSummary {
    fn from(item: &InvoiceItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            category: item.category.clone(),
            date: item.date,
        }
    }
}

/// 收据工作流请求体 `{ qrUrl, items }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayload {
    pub qr_url: String,
    pub items: Vec<ItemSummary>,
}

/// POST /api/receipt 请求体
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRequest {
    #[serde(default)]
    pub qr_url: String,
}

/// 扫码/派发结果
///
/// 识别出的文本总会带回给调用方, 即使它不是 URL 或派发失败。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub qr_text: Option<String>,
    pub rotation: Option<u16>,
    pub dispatched: bool,
    pub invoice: Option<Value>,
    pub message: Option<String>,
}
