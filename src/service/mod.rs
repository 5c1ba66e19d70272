pub mod analytics;
pub mod dispatcher;
pub mod frame;
pub mod qr_locator;
pub mod workflow;

pub use analytics::{AnalyticsForwarder, Answer};
pub use dispatcher::{is_dispatchable, DispatchError, ReceiptDispatcher};
pub use frame::{FrameError, RawImageFrame, Rotation};
pub use qr_locator::{DecodeResult, DecodedQr, QrDecoder, QrLocator, RqrrDecoder};
pub use workflow::{HttpWorkflowClient, WorkflowError, WorkflowService};
