use crate::api::AppState;
use crate::db::InvoiceReader;
use crate::error::ApiError;
use crate::models::{
    AnalyticsRequest, AnalyticsResponse, InvoiceCreated, InvoiceItem, NewInvoice, ReceiptRequest,
    ScanResponse, QUESTION_REQUIRED,
};
use crate::service::{
    is_dispatchable, Answer, DecodeResult, DispatchError, FrameError, RawImageFrame, Rotation,
};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /api/invoice: 全部明细
pub async fn list_invoice_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceItem>>, ApiError> {
    let items = state.store.list_items().await?;
    Ok(Json(items))
}

/// POST /api/invoice: 保存一张发票, 返回 201 和新发票号
pub async fn create_invoice(
    State(state): State<AppState>,
    payload: Result<Json<NewInvoice>, JsonRejection>,
) -> Result<(StatusCode, Json<InvoiceCreated>), ApiError> {
    let Json(req) = payload?;
    let invoice_id = state.store.commit_invoice(req.date, &req.items).await?;
    Ok((StatusCode::CREATED, Json(InvoiceCreated { invoice_id })))
}

/// POST /api/analytics: 除空问题外总是 200, 错误写在 answer 里
///
/// 请求体解析失败也按空问题处理, 响应形状始终是 `{answer}`。
pub async fn ask_analytics(
    State(state): State<AppState>,
    payload: Result<Json<AnalyticsRequest>, JsonRejection>,
) -> Response {
    let question = match payload {
        Ok(Json(AnalyticsRequest {
            question: Some(question),
        })) => question,
        Ok(_) => String::new(),
        Err(rejection) => {
            tracing::debug!("analytics 请求体无效: {}", rejection.body_text());
            String::new()
        }
    };

    match state.analytics.ask(&question).await {
        Answer::QuestionRequired => {
            let response = AnalyticsResponse {
                answer: QUESTION_REQUIRED.to_string(),
            };
            (StatusCode::BAD_REQUEST, Json(response)).into_response()
        }
        Answer::Text(answer) => (StatusCode::OK, Json(AnalyticsResponse { answer })).into_response(),
    }
}

/// POST /api/receipt: 客户端已识别出二维码文本, 只做派发
pub async fn dispatch_receipt(
    State(state): State<AppState>,
    payload: Result<Json<ReceiptRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(req)) => dispatch_decoded(&state, req.qr_url, None).await,
        Err(rejection) => ApiError::from(rejection).into_response(),
    }
}

/// POST /api/receipt/scan: 上传图片, 识别二维码后派发
pub async fn scan_receipt(State(state): State<AppState>, body: Bytes) -> Response {
    let locator = state.locator.clone();
    let decoded = tokio::task::spawn_blocking(move || -> Result<DecodeResult, FrameError> {
        let frame = RawImageFrame::from_image_bytes(&body)?;
        tracing::debug!("扫描图像 {}x{}", frame.width(), frame.height());
        Ok(locator.locate(frame))
    })
    .await;

    match decoded {
        Ok(Ok(DecodeResult::Found { text, rotation })) => {
            if !is_dispatchable(&text) {
                // 非 URL 文本照样返回给用户, 只是不派发
                let response = ScanResponse {
                    qr_text: Some(text),
                    rotation: Some(rotation.degrees()),
                    dispatched: false,
                    invoice: None,
                    message: Some("QR code is not a URL, not dispatched".to_string()),
                };
                return (StatusCode::OK, Json(response)).into_response();
            }
            dispatch_decoded(&state, text, Some(rotation)).await
        }
        Ok(Ok(DecodeResult::NotFound)) => {
            let response = ScanResponse {
                message: Some("No QR code detected".to_string()),
                ..Default::default()
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(Err(e)) => {
            let response = ScanResponse {
                message: Some(e.to_string()),
                ..Default::default()
            };
            (StatusCode::BAD_REQUEST, Json(response)).into_response()
        }
        Err(e) => ApiError::Internal(format!("QR decode task failed: {}", e)).into_response(),
    }
}

async fn dispatch_decoded(state: &AppState, text: String, rotation: Option<Rotation>) -> Response {
    let rotation = rotation.map(Rotation::degrees);

    match state.dispatcher.dispatch(&text).await {
        Ok(invoice) => {
            let response = ScanResponse {
                qr_text: Some(text),
                rotation,
                dispatched: true,
                invoice: Some(invoice),
                message: None,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e @ DispatchError::InvalidUrl(_)) => {
            let response = ScanResponse {
                qr_text: Some(text),
                rotation,
                dispatched: false,
                invoice: None,
                message: Some(e.to_string()),
            };
            (StatusCode::BAD_REQUEST, Json(response)).into_response()
        }
        Err(e) => {
            let response = ScanResponse {
                qr_text: Some(text),
                rotation,
                dispatched: false,
                invoice: None,
                message: Some(format!("Receipt dispatch failed: {}", e)),
            };
            (StatusCode::BAD_GATEWAY, Json(response)).into_response()
        }
    }
}
