use crate::constants::{EXPORT_PATH, USER_ID_HEADER};
use crate::errors::{AppError, AppResult};
use crate::models::{CanonicalQuery, Identity};
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::HeaderMap;
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A single authenticated GET against one of the log endpoints.
///
/// Built fresh for every export; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub url: Url,
    pub identity: Identity,
}

impl ExportRequest {
    /// Request for the CSV export endpoint.
    pub fn new(base_url: &Url, query: &CanonicalQuery, identity: &Identity) -> AppResult<Self> {
        Self::for_path(base_url, EXPORT_PATH, query, identity)
    }

    /// Request for any log endpoint taking the canonical filter query.
    ///
    /// `path` is resolved below the base URL's own path, so a server mounted
    /// under a prefix (`https://host/newapi/`) keeps it. Query parameters always
    /// appear in wire order, empty ones included.
    pub fn for_path(
        base_url: &Url,
        path: &str,
        query: &CanonicalQuery,
        identity: &Identity,
    ) -> AppResult<Self> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let prefix = format!("{}/", base.path());
            base.set_path(&prefix);
        }
        let mut url = base.join(path.trim_start_matches('/'))?;
        url.query_pairs_mut().clear().extend_pairs(query.pairs());
        Ok(Self {
            url,
            identity: identity.clone(),
        })
    }

    /// Headers carrying the caller's identity.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![(USER_ID_HEADER, self.identity.user_id.clone())];
        if let Some(cookie) = self.identity.session_cookie.as_deref() {
            if !cookie.is_empty() {
                headers.push(("Cookie", cookie.to_string()));
            }
        }
        headers
    }
}

/// Response as seen by the export pipeline. The body is not read yet.
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, AppResult<Bytes>>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value of a response header, if present.
    ///
    /// Servers put raw UTF-8 into headers such as `Content-Disposition`; those
    /// bytes are decoded, with invalid sequences replaced.
    pub fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers
            .get(name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()))
    }

    /// Reads the whole body into memory.
    pub async fn collect_body(self) -> AppResult<Vec<u8>> {
        let mut payload = Vec::new();
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            payload.extend_from_slice(&chunk?);
        }
        Ok(payload)
    }
}

/// Performs HTTP requests for the export pipeline.
#[async_trait::async_trait]
pub trait ExportTransport: Send + Sync {
    /// Sends one GET request. Transport failures map to `NetworkFailure`;
    /// any status code, success or not, is returned as a response.
    async fn get(&self, request: &ExportRequest) -> AppResult<TransportResponse>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport. `timeout` of `None` means the request may wait forever.
    pub fn new(timeout: Option<Duration>) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::NetworkFailure(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ExportTransport for ReqwestTransport {
    async fn get(&self, request: &ExportRequest) -> AppResult<TransportResponse> {
        let mut builder = self.client.get(request.url.clone());
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;

        Ok(TransportResponse {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(AppError::from))
                .boxed(),
        })
    }
}

/// Sends the export request once and checks the status.
///
/// There is no retry: a non-2xx answer fails with `HttpError` carrying the status.
pub async fn request_export(
    transport: &dyn ExportTransport,
    request: &ExportRequest,
) -> AppResult<TransportResponse> {
    debug!(url = %request.url, "Requesting log export");
    let response = transport.get(request).await?;

    if !response.is_success() {
        warn!(status = response.status, url = %request.url, "Export request rejected");
        return Err(AppError::HttpError {
            status: response.status,
        });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::normalize;
    use crate::models::{FilterInput, TimestampValue};
    use std::sync::Mutex;

    struct StaticTransport {
        status: u16,
        seen: Mutex<Vec<Url>>,
    }

    #[async_trait::async_trait]
    impl ExportTransport for StaticTransport {
        async fn get(&self, request: &ExportRequest) -> AppResult<TransportResponse> {
            self.seen.lock().unwrap().push(request.url.clone());
            Ok(TransportResponse {
                status: self.status,
                headers: HeaderMap::new(),
                body: futures::stream::iter(vec![Ok(Bytes::from_static(b"a,b\n"))]).boxed(),
            })
        }
    }

    fn identity() -> Identity {
        Identity {
            user_id: "1".to_string(),
            session_cookie: Some("session=abc".to_string()),
        }
    }

    #[test]
    fn export_url_has_all_params_in_order() {
        let filters = FilterInput {
            log_type: Some("2".to_string()),
            username: Some("alice".to_string()),
            start_timestamp: TimestampValue::Seconds(100),
            ..Default::default()
        };
        let base = Url::parse("https://api.example.com").unwrap();
        let request = ExportRequest::new(&base, &normalize(Some(&filters)), &identity()).unwrap();

        assert_eq!(
            request.url.as_str(),
            "https://api.example.com/api/log/export?type=2&username=alice&token_name=&model_name=&start_timestamp=100&end_timestamp=0&channel=&group="
        );
    }

    #[test]
    fn base_url_path_prefix_is_kept() {
        for base in ["https://example.com/newapi/", "https://example.com/newapi"] {
            let base = Url::parse(base).unwrap();
            let request = ExportRequest::new(&base, &normalize(None), &identity()).unwrap();
            assert_eq!(request.url.path(), "/newapi/api/log/export");
        }

        let root = Url::parse("https://example.com/").unwrap();
        let request = ExportRequest::new(&root, &normalize(None), &identity()).unwrap();
        assert_eq!(request.url.path(), "/api/log/export");
    }

    #[test]
    fn header_decodes_raw_utf8_bytes() {
        let mut headers = HeaderMap::new();
        let raw = "attachment; filename=\"日志.csv\"";
        headers.insert(
            "content-disposition",
            reqwest::header::HeaderValue::from_bytes(raw.as_bytes()).unwrap(),
        );
        let response = TransportResponse {
            status: 200,
            headers,
            body: futures::stream::empty().boxed(),
        };

        assert_eq!(response.header("content-disposition").as_deref(), Some(raw));
        assert!(response.header("x-missing").is_none());
    }

    #[tokio::test]
    async fn refused_connection_is_network_failure() {
        let transport = ReqwestTransport::new(Some(Duration::from_secs(5))).unwrap();
        let base = Url::parse("http://127.0.0.1:1/").unwrap();
        let request = ExportRequest::new(&base, &normalize(None), &identity()).unwrap();

        let result = request_export(&transport, &request).await;
        assert!(matches!(result, Err(AppError::NetworkFailure(_))));
    }

    #[test]
    fn query_values_are_percent_encoded() {
        let filters = FilterInput {
            model_name: Some("gpt 4&o".to_string()),
            ..Default::default()
        };
        let base = Url::parse("https://api.example.com/").unwrap();
        let request = ExportRequest::new(&base, &normalize(Some(&filters)), &identity()).unwrap();
        let model = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "model_name")
            .map(|(_, v)| v.into_owned());
        assert_eq!(model.as_deref(), Some("gpt 4&o"));
    }

    #[test]
    fn headers_carry_user_id_and_cookie() {
        let base = Url::parse("https://api.example.com").unwrap();
        let request = ExportRequest::new(&base, &normalize(None), &identity()).unwrap();
        let headers = request.headers();
        assert_eq!(headers[0], ("New-Api-User", "1".to_string()));
        assert_eq!(headers[1], ("Cookie", "session=abc".to_string()));
    }

    #[test]
    fn empty_cookie_is_not_sent() {
        let base = Url::parse("https://api.example.com").unwrap();
        let identity = Identity {
            user_id: "7".to_string(),
            session_cookie: Some(String::new()),
        };
        let request = ExportRequest::new(&base, &normalize(None), &identity).unwrap();
        assert_eq!(request.headers().len(), 1);
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let transport = StaticTransport {
            status: 500,
            seen: Mutex::new(Vec::new()),
        };
        let base = Url::parse("https://api.example.com").unwrap();
        let request = ExportRequest::new(&base, &normalize(None), &identity()).unwrap();

        let result = request_export(&transport, &request).await;
        assert!(matches!(result, Err(AppError::HttpError { status: 500 })));
        assert_eq!(transport.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn success_status_returns_readable_body() {
        let transport = StaticTransport {
            status: 200,
            seen: Mutex::new(Vec::new()),
        };
        let base = Url::parse("https://api.example.com").unwrap();
        let request = ExportRequest::new(&base, &normalize(None), &identity()).unwrap();

        let response = request_export(&transport, &request).await.unwrap();
        assert_eq!(response.collect_body().await.unwrap(), b"a,b\n");
    }
}
