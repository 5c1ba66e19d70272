pub mod analytics;
pub mod invoice;
pub mod receipt;

pub use analytics::{
    AnalyticsItem, AnalyticsPayload, AnalyticsRequest, AnalyticsResponse, NO_ANSWER,
    QUESTION_REQUIRED,
};
pub use invoice::{
    parse_calendar_date, resolve_invoice_date, InvalidInvoice, InvoiceCreated, InvoiceItem,
    NewInvoice, NewItem,
};
pub use receipt::{ItemSummary, ReceiptPayload, ReceiptRequest, ScanResponse};
