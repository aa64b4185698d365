//! usage-logs-export library
//!
//! This crate provides the core functionality for the `usage-logs-export` binary.
//! Keep the crate root minimal — implementation and tests live in their modules.
//!
//! ## Overview
//!
//! - [`export`] - Normalizes filters, requests the CSV export and saves it to disk
//! - [`stat`] - Fetches and renders the quota / RPM / TPM summary
//! - [`cli`] - Command-line interface wiring the pieces together
//! - [`config`] - Settings loaded from TOML and command-line flags
//! - [`models`] - Filter, query, identity and stat types
//! - [`i18n`] - Message translation
//! - [`notify`] - Success and error reporting
//! - [`errors`] - Error types used throughout the application
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use url::Url;
//! use usage_logs_export::errors::AppResult;
//! use usage_logs_export::export::{DirectorySaveTarget, ExportController, ReqwestTransport};
//! use usage_logs_export::models::{FilterInput, Identity, TimestampValue};
//!
//! # async fn example() -> AppResult<()> {
//! let controller = ExportController::new(
//!     Url::parse("https://api.example.com")?,
//!     Identity { user_id: "1".into(), session_cookie: Some("session=...".into()) },
//!     true,
//!     Arc::new(ReqwestTransport::new(None)?),
//!     DirectorySaveTarget::new("exports"),
//! );
//!
//! let filters = FilterInput {
//!     model_name: Some("gpt-4o".into()),
//!     start_timestamp: TimestampValue::from("2024-01-01"),
//!     ..Default::default()
//! };
//! let saved = controller.export(Some(&filters)).await?;
//! println!("saved {}", saved.path.display());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod export;
pub mod i18n;
pub mod models;
pub mod notify;
pub mod stat;
