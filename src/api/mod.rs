pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::InvoiceStore;
use crate::service::{AnalyticsForwarder, QrLocator, ReceiptDispatcher, WorkflowService};

pub use handlers::*;

/// 上传图片大小上限
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<InvoiceStore>,
    pub dispatcher: Arc<ReceiptDispatcher>,
    pub analytics: Arc<AnalyticsForwarder>,
    pub locator: Arc<QrLocator>,
}

impl AppState {
    pub fn new(store: InvoiceStore, workflow: Arc<dyn WorkflowService>) -> Self {
        let store = Arc::new(store);
        Self {
            dispatcher: Arc::new(ReceiptDispatcher::new(store.clone(), workflow.clone())),
            analytics: Arc::new(AnalyticsForwarder::new(store.clone(), workflow)),
            locator: Arc::new(QrLocator::new()),
            store,
        }
    }
}

/// 构建路由
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/invoice", get(list_invoice_items).post(create_invoice))
        .route("/api/analytics", post(ask_analytics))
        .route("/api/receipt", post(dispatch_receipt))
        .route("/api/receipt/scan", post(scan_receipt))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
