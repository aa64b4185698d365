//! Log export pipeline.
//!
//! Raw filter values are normalized into a canonical query, sent once to the
//! export endpoint, and the CSV body is saved through a [`SaveTarget`]. The
//! main entry point is [`ExportController::export`].

mod controller;
mod materializer;
mod normalizer;
mod requester;

// Re-export public API
pub use controller::{ExportController, ExportState};
pub use materializer::{
    default_filename, filename_from_content_disposition, materialize, DirectorySaveTarget,
    SaveTarget, SavedExport,
};
pub use normalizer::{normalize, parse_date_text, timestamp_seconds};
pub use requester::{
    request_export, ExportRequest, ExportTransport, ReqwestTransport, TransportResponse,
};
