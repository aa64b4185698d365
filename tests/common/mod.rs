//! Common test doubles for integration tests

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use usage_logs_export::errors::{AppError, AppResult};
use usage_logs_export::export::{ExportRequest, ExportTransport, SaveTarget, TransportResponse};
use usage_logs_export::notify::Notifier;

/// Transport that answers every request with the same canned response.
#[allow(dead_code)]
pub struct ScriptedTransport {
    pub status: u16,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
    pub fail_with: Option<String>,
    pub gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<ExportRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            content_disposition: None,
            body: body.to_vec(),
            fail_with: None,
            gate: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::ok(b"")
        }
    }

    pub fn network_error(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::ok(b"")
        }
    }

    pub fn with_filename(mut self, disposition: &str) -> Self {
        self.content_disposition = Some(disposition.to_string());
        self
    }

    /// Holds every response until the gate is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExportTransport for ScriptedTransport {
    async fn get(&self, request: &ExportRequest) -> AppResult<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(message) = &self.fail_with {
            return Err(AppError::NetworkFailure(message.clone()));
        }

        let mut headers = HeaderMap::new();
        if let Some(value) = &self.content_disposition {
            headers.insert(CONTENT_DISPOSITION, HeaderValue::from_str(value).unwrap());
        }
        let chunks: Vec<AppResult<Bytes>> = vec![Ok(Bytes::from(self.body.clone()))];
        Ok(TransportResponse {
            status: self.status,
            headers,
            body: futures::stream::iter(chunks).boxed(),
        })
    }
}

/// Save target that keeps everything in memory and counts handle lifecycle calls.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingSaveTarget {
    pub created: AtomicUsize,
    pub revoked: AtomicUsize,
    pub saved: Mutex<Vec<(String, Vec<u8>)>>,
    pub fail_trigger: bool,
}

#[allow(dead_code)]
impl RecordingSaveTarget {
    pub fn failing_trigger() -> Self {
        Self {
            fail_trigger: true,
            ..Default::default()
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }
}

impl SaveTarget for RecordingSaveTarget {
    type Handle = Vec<u8>;

    fn create_object_url(&self, payload: &[u8]) -> AppResult<Self::Handle> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(payload.to_vec())
    }

    fn trigger_download(&self, handle: &Self::Handle, filename: &str) -> AppResult<PathBuf> {
        if self.fail_trigger {
            return Err(AppError::MaterializationFailure(
                "click was blocked".to_string(),
            ));
        }
        self.saved
            .lock()
            .unwrap()
            .push((filename.to_string(), handle.clone()));
        Ok(PathBuf::from(filename))
    }

    fn revoke_object_url(&self, _handle: Self::Handle) {
        self.revoked.fetch_add(1, Ordering::SeqCst);
    }
}

impl RecordingSaveTarget {
    #[allow(dead_code)]
    pub fn saved_files(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().unwrap().clone()
    }
}

/// Notifier that keeps every message.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingNotifier {
    pub successes: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn report_success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn report_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}
