use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// A filter timestamp as it arrives from the filter source.
///
/// Values stay in the shape they were supplied in; the normalizer turns
/// every variant into whole Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimestampValue {
    /// No bound.
    #[default]
    Unset,
    /// Already whole seconds since the epoch.
    Seconds(i64),
    /// A concrete instant.
    Wallclock(DateTime<Utc>),
    /// Free-form date text, parsed leniently.
    RawText(String),
}

impl TimestampValue {
    /// Interprets a command-line value: an integer is taken as seconds,
    /// anything else is kept as text for the date parser.
    pub fn from_cli_arg(arg: &str) -> Self {
        match arg.parse::<i64>() {
            Ok(secs) => Self::Seconds(secs),
            Err(_) => Self::RawText(arg.to_string()),
        }
    }
}

impl From<DateTime<Utc>> for TimestampValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Wallclock(value)
    }
}

impl From<i64> for TimestampValue {
    fn from(value: i64) -> Self {
        Self::Seconds(value)
    }
}

impl From<&str> for TimestampValue {
    fn from(value: &str) -> Self {
        Self::RawText(value.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Integer(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for TimestampValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawScalar::deserialize(deserializer)? {
            RawScalar::Integer(secs) => Self::Seconds(secs),
            RawScalar::Text(text) => Self::RawText(text),
        })
    }
}

/// Accepts either a string or an integer and keeps it as a string.
fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawScalar>::deserialize(deserializer)?.map(|raw| match raw {
        RawScalar::Integer(n) => n.to_string(),
        RawScalar::Text(text) => text,
    }))
}

/// Raw filter values read from the log filter source. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterInput {
    /// Log type code (`type` on the wire)
    #[serde(rename = "type", alias = "log_type", deserialize_with = "string_or_number")]
    pub log_type: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub username: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub token_name: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub model_name: Option<String>,
    pub start_timestamp: TimestampValue,
    pub end_timestamp: TimestampValue,
    #[serde(deserialize_with = "string_or_number")]
    pub channel: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub group: Option<String>,
}

/// Fully populated, string-typed query sent to the log endpoints.
///
/// Timestamps are decimal seconds, `"0"` meaning unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalQuery {
    pub log_type: String,
    pub username: String,
    pub token_name: String,
    pub model_name: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub channel: String,
    pub group: String,
}

impl CanonicalQuery {
    /// Query parameters in wire order.
    pub fn pairs(&self) -> [(&'static str, &str); 8] {
        [
            ("type", self.log_type.as_str()),
            ("username", self.username.as_str()),
            ("token_name", self.token_name.as_str()),
            ("model_name", self.model_name.as_str()),
            ("start_timestamp", self.start_timestamp.as_str()),
            ("end_timestamp", self.end_timestamp.as_str()),
            ("channel", self.channel.as_str()),
            ("group", self.group.as_str()),
        ]
    }
}

/// Who is asking: the user id for the `New-Api-User` header and the session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub session_cookie: Option<String>,
}

/// Usage summary for the current filter set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Stat {
    #[serde(default)]
    pub quota: i64,
    #[serde(default)]
    pub rpm: i64,
    #[serde(default)]
    pub tpm: i64,
}
