// Endpoint paths
pub const EXPORT_PATH: &str = "/api/log/export";
pub const STAT_PATH: &str = "/api/log/stat";
pub const SELF_STAT_PATH: &str = "/api/log/self/stat";

// Headers
pub const USER_ID_HEADER: &str = "New-Api-User";

// Default save name pattern: logs_<YYYYMMDDhhmmss>.csv
pub const DEFAULT_FILENAME_PREFIX: &str = "logs_";
pub const DEFAULT_FILENAME_EXTENSION: &str = "csv";

// Content-Disposition filename grammar: a parameter named exactly `filename`
// (or `filename*`), `=`, then a double-quoted, single-quoted or bare token.
pub const FILENAME_PARAM_PATTERN: &str =
    r#"(?i)(?:^|;)\s*filename(\*?)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^;\n]*))"#;

// Message keys passed through the translator
pub const MSG_ADMIN_ONLY: &str = "Only administrators can export logs";
pub const MSG_EXPORT_SUCCEEDED: &str = "Export succeeded";
pub const MSG_EXPORT_FAILED: &str = "Export failed";
pub const MSG_QUOTA_CONSUMED: &str = "Quota consumed";
