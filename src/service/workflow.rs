//! 外部工作流服务
//!
//! 两个能力: 收据 URL -> 结构化明细, 自然语言问题 -> 回答文本。
//! 内部逻辑不透明, 这里只负责 HTTP 往返。

use axum::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::WebhookConfig;
use crate::models::{AnalyticsItem, AnalyticsPayload, ItemSummary, ReceiptPayload};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0} webhook URL is not configured")]
    NotConfigured(&'static str),

    #[error("network error: {0}")]
    Network(String),

    #[error("webhook responded with status {0}: {1}")]
    Status(u16, String),

    #[error("malformed webhook response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// 原样返回工作流给出的结构化明细
    async fn process_receipt(
        &self,
        qr_url: &str,
        items: &[ItemSummary],
    ) -> Result<Value, WorkflowError>;

    /// 返回第一条响应的 `output`; 响应为空或缺字段时为 `None`
    async fn answer_question(
        &self,
        question: &str,
        items: &[AnalyticsItem],
    ) -> Result<Option<String>, WorkflowError>;
}

/// 通过 HTTP webhook 调用的工作流
pub struct HttpWorkflowClient {
    http_client: reqwest::Client,
    receipt_url: Option<String>,
    analytics_url: Option<String>,
}

impl HttpWorkflowClient {
    pub fn new(config: &WebhookConfig) -> Result<Self, WorkflowError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WorkflowError::Network(e.to_string()))?;

        if config.receipt_url.is_none() {
            tracing::warn!("RECEIPT_WEBHOOK_URL 未配置, 收据派发将失败");
        }
        if config.analytics_url.is_none() {
            tracing::warn!("ANALYTICS_WEBHOOK_URL 未配置, 分析请求将返回错误");
        }

        Ok(Self {
            http_client,
            receipt_url: config.receipt_url.clone(),
            analytics_url: config.analytics_url.clone(),
        })
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<Value, WorkflowError> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| WorkflowError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Status(status.as_u16(), error_text));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| WorkflowError::Parse(e.to_string()))
    }
}

#[async_trait]
impl WorkflowService for HttpWorkflowClient {
    async fn process_receipt(
        &self,
        qr_url: &str,
        items: &[ItemSummary],
    ) -> Result<Value, WorkflowError> {
        let url = self
            .receipt_url
            .as_deref()
            .ok_or(WorkflowError::NotConfigured("receipt"))?;

        let payload = ReceiptPayload {
            qr_url: qr_url.to_string(),
            items: items.to_vec(),
        };

        tracing::debug!(url = %url, items = items.len(), "Calling receipt webhook");
        self.post_json(url, &payload).await
    }

    async fn answer_question(
        &self,
        question: &str,
        items: &[AnalyticsItem],
    ) -> Result<Option<String>, WorkflowError> {
        let url = self
            .analytics_url
            .as_deref()
            .ok_or(WorkflowError::NotConfigured("analytics"))?;

        let payload = AnalyticsPayload {
            question: question.to_string(),
            items: items.to_vec(),
        };

        tracing::debug!(url = %url, items = items.len(), "Calling analytics webhook");
        let data = self.post_json(url, &payload).await?;
        Ok(first_output(&data))
    }
}

/// 取数组第一个元素的非空 `output` 字段
fn first_output(data: &Value) -> Option<String> {
    data.as_array()
        .and_then(|entries| entries.first())
        .and_then(|entry| entry.get("output"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn first_output_handles_odd_shapes() {
        assert_eq!(
            first_output(&json!([{"output": "42 EUR"}, {"output": "ignored"}])),
            Some("42 EUR".to_string())
        );
        assert_eq!(first_output(&json!([])), None);
        assert_eq!(first_output(&json!([{"text": "no output"}])), None);
        assert_eq!(first_output(&json!([{"output": ""}])), None);
        assert_eq!(first_output(&json!({"output": "not an array"})), None);
    }

    /// 在本地端口起一个假 webhook, 记录收到的请求体
    async fn spawn_webhook(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let app = Router::new().route(
            "/hook",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                let reply = reply.clone();
                async move {
                    sink.lock().unwrap().push(body);
                    (status, Json(reply))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/hook", addr), received)
    }

    fn client(receipt_url: Option<String>, analytics_url: Option<String>) -> HttpWorkflowClient {
        HttpWorkflowClient::new(&WebhookConfig {
            receipt_url,
            analytics_url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn summary() -> ItemSummary {
        ItemSummary {
            id: 1,
            name: "Milk".to_string(),
            category: "Dairy".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        }
    }

    #[tokio::test]
    async fn receipt_payload_carries_url_and_history() {
        let reply = json!([{"crtd": "2024-01-05 10:00:00 +0100"}, {"id": 1, "name": "Milk"}]);
        let (url, received) = spawn_webhook(StatusCode::OK, reply.clone()).await;

        let result = client(Some(url), None)
            .process_receipt("https://receipts.example/r/1", &[summary()])
            .await
            .unwrap();

        assert_eq!(result, reply);
        let bodies = received.lock().unwrap();
        assert_eq!(
            bodies[0],
            json!({
                "qrUrl": "https://receipts.example/r/1",
                "items": [{"id": 1, "name": "Milk", "category": "Dairy", "date": "2024-01-05"}]
            })
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, _) = spawn_webhook(StatusCode::BAD_GATEWAY, json!({"message": "down"})).await;
        let err = client(Some(url), None)
            .process_receipt("https://receipts.example/r/1", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Status(502, _)));
    }

    #[tokio::test]
    async fn missing_url_fails_without_network() {
        let err = client(None, None)
            .answer_question("anything?", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotConfigured("analytics")));
    }

    #[tokio::test]
    async fn analytics_answer_is_first_output() {
        let (url, received) =
            spawn_webhook(StatusCode::OK, json!([{"output": "You spent 12.40 on Dairy."}])).await;

        let answer = client(None, Some(url))
            .answer_question("How much on dairy?", &[])
            .await
            .unwrap();

        assert_eq!(answer.as_deref(), Some("You spent 12.40 on Dairy."));
        assert_eq!(
            received.lock().unwrap()[0],
            json!({"question": "How much on dairy?", "items": []})
        );
    }

    #[tokio::test]
    async fn unreachable_webhook_is_a_network_error() {
        // 端口 9 (discard) 上通常没有 HTTP 服务
        let err = client(Some("http://127.0.0.1:9/hook".to_string()), None)
            .process_receipt("https://receipts.example/r/1", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Network(_)));
    }
}
