//! Print Orders Domain
//!
//! Custom print jobs: customers (or guests) upload their files with the
//! print specs, get an instant quote, and follow the job through review and
//! production. Staff can override the quoted price after review and keep
//! internal notes on each job.
//!
//! ```text
//! submitted -> reviewing -> approved -> printing -> ready -> completed
//!     |            |           |
//!     +------------+-----------+--> cancelled
//! ```
//!
//! Guests track their job with the `PRN-...` reference and the email they
//! submitted with.

pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod pricing;
pub mod repository;
pub mod service;

pub use error::{PrintOrderError, PrintOrderResult};
pub use handlers::ApiDoc;
pub use models::{
    Binding, ColorMode, Contact, Fulfillment, FulfillmentMethod, PaperSize, PaperType,
    PrintOrder, PrintOrderFilter, PrintOrderList, PrintSpecs, PrintStatus, Sides,
    SubmitPrintOrder, Turnaround, UploadedFile,
};
pub use mongodb::MongoPrintOrderRepository;
pub use pricing::{PrintQuote, quote};
#[cfg(any(test, feature = "mock"))]
pub use repository::MockPrintOrderRepository;
pub use repository::PrintOrderRepository;
pub use service::PrintOrderService;
