//! Reports Domain
//!
//! Admin reporting across shop orders, print jobs, customers and stock.
//! Figures are computed in [`aggregate`] from documents loaded for the
//! requested day range, so they are testable without a database; [`export`]
//! renders them as CSV or XLSX downloads.

pub mod aggregate;
pub mod error;
pub mod export;
pub mod handlers;
pub mod models;
pub mod service;
pub mod source;

pub use aggregate::ReportData;
pub use error::{ReportError, ReportResult};
pub use handlers::ApiDoc;
pub use models::{
    Dashboard, Dataset, DateRange, ExportFile, ExportFormat, ExportQuery, Headline, ReportQuery,
    SalesReport,
};
pub use service::ReportService;
pub use source::{MongoReportSource, ReportSource};
