use receipt_ledger_rust::{
    build_router, create_pool, init_schema, AppConfig, AppState, HttpWorkflowClient, InvoiceStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池并建表
    let pool = create_pool(&config.database).await?;
    init_schema(&pool).await?;
    info!("Database pool created");

    let workflow = Arc::new(HttpWorkflowClient::new(&config.webhooks)?);
    let state = AppState::new(InvoiceStore::new(pool), workflow);
    let app = build_router(state);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /api/invoice       - list invoice items");
    info!("  POST /api/invoice       - save invoice");
    info!("  POST /api/analytics     - spending question");
    info!("  POST /api/receipt       - dispatch decoded QR URL");
    info!("  POST /api/receipt/scan  - scan receipt image");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
