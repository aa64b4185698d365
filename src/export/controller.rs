use crate::constants::{MSG_ADMIN_ONLY, MSG_EXPORT_FAILED, MSG_EXPORT_SUCCEEDED};
use crate::errors::{AppError, AppResult};
use crate::export::materializer::{materialize, SaveTarget, SavedExport};
use crate::export::normalizer::normalize;
use crate::export::requester::{request_export, ExportRequest, ExportTransport};
use crate::i18n::{Catalog, Translator};
use crate::models::{FilterInput, Identity};
use crate::notify::{Notifier, TracingNotifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Observable state of an [`ExportController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Exporting,
}

/// Runs the export action: permission gate, normalize, request, materialize.
///
/// Only one export runs at a time per controller. A call made while another
/// is in flight is rejected with [`AppError::ExportInProgress`] before any
/// network traffic, and the in-flight export is left untouched.
pub struct ExportController<S: SaveTarget> {
    base_url: Url,
    identity: Identity,
    is_admin: bool,
    transport: Arc<dyn ExportTransport>,
    target: S,
    notifier: Arc<dyn Notifier>,
    translator: Arc<dyn Translator>,
    exporting: AtomicBool,
}

impl<S: SaveTarget> ExportController<S> {
    pub fn new(
        base_url: Url,
        identity: Identity,
        is_admin: bool,
        transport: Arc<dyn ExportTransport>,
        target: S,
    ) -> Self {
        Self {
            base_url,
            identity,
            is_admin,
            transport,
            target,
            notifier: Arc::new(TracingNotifier),
            translator: Arc::new(Catalog::default()),
            exporting: AtomicBool::new(false),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn save_target(&self) -> &S {
        &self.target
    }

    pub fn state(&self) -> ExportState {
        if self.exporting.load(Ordering::Acquire) {
            ExportState::Exporting
        } else {
            ExportState::Idle
        }
    }

    /// Busy flag for the presentation layer.
    pub fn is_exporting(&self) -> bool {
        self.state() == ExportState::Exporting
    }

    /// Exports the logs matching `filters` and reports the outcome.
    ///
    /// Every outcome except [`AppError::ExportInProgress`] produces exactly one
    /// notification. The error is also returned so callers can set an exit status.
    pub async fn export(&self, filters: Option<&FilterInput>) -> AppResult<SavedExport> {
        if !self.is_admin {
            self.notifier
                .report_error(&self.translator.translate(MSG_ADMIN_ONLY));
            return Err(AppError::PermissionDenied);
        }

        let Some(_busy) = BusyGuard::acquire(&self.exporting) else {
            warn!("Export already in progress, ignoring request");
            return Err(AppError::ExportInProgress);
        };

        match self.run(filters).await {
            Ok(saved) => {
                info!(
                    path = %saved.path.display(),
                    bytes = saved.bytes,
                    "Log export completed"
                );
                self.notifier
                    .report_success(&self.translator.translate(MSG_EXPORT_SUCCEEDED));
                Ok(saved)
            }
            Err(e) => {
                self.notifier.report_error(&format!(
                    "{}: {}",
                    self.translator.translate(MSG_EXPORT_FAILED),
                    e
                ));
                Err(e)
            }
        }
    }

    async fn run(&self, filters: Option<&FilterInput>) -> AppResult<SavedExport> {
        let query = normalize(filters);
        info!(
            start_timestamp = %query.start_timestamp,
            end_timestamp = %query.end_timestamp,
            "Starting log export"
        );

        let request = ExportRequest::new(&self.base_url, &query, &self.identity)?;
        let response = request_export(self.transport.as_ref(), &request).await?;
        materialize(response, &self.target).await
    }
}

/// Holds the `Exporting` state; dropping it returns the controller to `Idle`.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
