use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// 发票明细 (invoice_items 表的一行)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i32,
    pub invoice_id: i32,   // 同一次保存的明细共用
    pub name: String,
    pub category: String,
    pub unit: String,
    pub unit_price: BigDecimal,
    pub quantity: f64,
    pub price: BigDecimal,
    pub date: NaiveDate,
}

/// 待写入的明细, id 与 invoice_id 由存储分配
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub unit_price: BigDecimal,
    pub quantity: f64,
    pub price: BigDecimal,
    pub date: NaiveDate,
}

/// POST /api/invoice 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    #[serde(default, deserialize_with = "deserialize_calendar_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<NewItem>,
}

/// POST /api/invoice 响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCreated {
    pub invoice_id: i32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInvoice {
    #[error("items of one invoice must share a date (found {first} and {other})")]
    MixedDates { first: NaiveDate, other: NaiveDate },

    #[error("item {index} has invalid quantity {quantity}")]
    InvalidQuantity { index: usize, quantity: f64 },
}

/// 校验一批明细并确定整张发票的日期
///
/// 表头日期存在时覆盖每一行; 否则要求所有明细日期一致。
/// 返回 `None` 仅当表头日期为空且没有明细。
pub fn resolve_invoice_date(
    header: Option<NaiveDate>,
    items: &[NewItem],
) -> Result<Option<NaiveDate>, InvalidInvoice> {
    for (index, item) in items.iter().enumerate() {
        if !item.quantity.is_finite() || item.quantity < 0.0 {
            return Err(InvalidInvoice::InvalidQuantity {
                index,
                quantity: item.quantity,
            });
        }
    }

    if header.is_some() {
        return Ok(header);
    }

    let Some(first) = items.first().map(|i| i.date) else {
        return Ok(None);
    };
    if let Some(other) = items.iter().map(|i| i.date).find(|d| *d != first) {
        return Err(InvalidInvoice::MixedDates { first, other });
    }
    Ok(Some(first))
}

/// 解析 "YYYY-MM-DD" 或 RFC 3339 时间戳, 只保留 UTC 日历日期
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_calendar_date(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s))),
    }
}
