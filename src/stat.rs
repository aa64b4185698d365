//! Usage summary (quota consumed, RPM, TPM) for the current filter set.

use crate::constants::{MSG_QUOTA_CONSUMED, SELF_STAT_PATH, STAT_PATH};
use crate::errors::{AppError, AppResult};
use crate::export::{ExportRequest, ExportTransport};
use crate::i18n::Translator;
use crate::models::{CanonicalQuery, Identity, Stat};
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct StatEnvelope {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Stat>,
}

/// Fetches the summary for `query`.
///
/// Administrators see every user's usage; other users are limited to their own
/// logs by the self-stat endpoint, which ignores the `username` filter.
pub async fn fetch_stat(
    transport: &dyn ExportTransport,
    base_url: &Url,
    query: &CanonicalQuery,
    identity: &Identity,
    is_admin: bool,
) -> AppResult<Stat> {
    let path = if is_admin { STAT_PATH } else { SELF_STAT_PATH };
    let request = ExportRequest::for_path(base_url, path, query, identity)?;
    debug!(url = %request.url, "Requesting log stat");

    let response = transport.get(&request).await?;
    if !response.is_success() {
        return Err(AppError::HttpError {
            status: response.status,
        });
    }

    let body = response.collect_body().await?;
    parse_stat(&body)
}

/// Parses the `{success, message, data}` envelope returned by the stat endpoint.
pub fn parse_stat(body: &[u8]) -> AppResult<Stat> {
    let envelope: StatEnvelope = serde_json::from_slice(body)?;
    if !envelope.success {
        return Err(AppError::ApiError(envelope.message));
    }
    Ok(envelope.data.unwrap_or_default())
}

/// Formats a raw quota amount as currency, two decimals.
///
/// A positive quota too small to show is displayed as `$0.01` rather than `$0.00`.
pub fn render_quota(quota: i64, quota_per_unit: f64) -> String {
    let amount = quota as f64 / quota_per_unit;
    let rounded = (amount * 100.0).round() / 100.0;
    if rounded == 0.0 && amount > 0.0 {
        return "$0.01".to_string();
    }
    format!("${rounded:.2}")
}

/// One-line summary: `Quota consumed: $1.23 | RPM: 4 | TPM: 567`.
pub fn render_stat(stat: &Stat, quota_per_unit: f64, translator: &dyn Translator) -> String {
    format!(
        "{}: {} | RPM: {} | TPM: {}",
        translator.translate(MSG_QUOTA_CONSUMED),
        render_quota(stat.quota, quota_per_unit),
        stat.rpm,
        stat.tpm
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{Catalog, Locale};

    #[test]
    fn parse_stat_reads_data() {
        let body = br#"{"success":true,"message":"","data":{"quota":1000000,"rpm":3,"tpm":450}}"#;
        assert_eq!(
            parse_stat(body).unwrap(),
            Stat {
                quota: 1_000_000,
                rpm: 3,
                tpm: 450
            }
        );
    }

    #[test]
    fn parse_stat_failure_envelope_is_api_error() {
        let body = br#"{"success":false,"message":"no permission"}"#;
        let err = parse_stat(body).unwrap_err();
        assert!(matches!(err, AppError::ApiError(ref msg) if msg == "no permission"));
    }

    #[test]
    fn parse_stat_garbage_is_parse_error() {
        assert!(matches!(
            parse_stat(b"<html>"),
            Err(AppError::ParseError(_))
        ));
    }

    #[test]
    fn render_quota_in_currency() {
        assert_eq!(render_quota(1_000_000, 500_000.0), "$2.00");
        assert_eq!(render_quota(0, 500_000.0), "$0.00");
        assert_eq!(render_quota(1, 500_000.0), "$0.01");
    }

    #[test]
    fn render_stat_is_localized() {
        let stat = Stat {
            quota: 250_000,
            rpm: 4,
            tpm: 567,
        };
        assert_eq!(
            render_stat(&stat, 500_000.0, &Catalog::new(Locale::En)),
            "Quota consumed: $0.50 | RPM: 4 | TPM: 567"
        );
        assert_eq!(
            render_stat(&stat, 500_000.0, &Catalog::new(Locale::Zh)),
            "消耗额度: $0.50 | RPM: 4 | TPM: 567"
        );
    }
}
