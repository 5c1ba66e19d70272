pub mod pool;
pub mod queries;
pub mod store;

pub use pool::{create_lazy_pool, create_pool, init_schema};
pub use store::{InvoiceReader, InvoiceStore, StoreError};
