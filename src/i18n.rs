use crate::constants::{
    MSG_ADMIN_ONLY, MSG_EXPORT_FAILED, MSG_EXPORT_SUCCEEDED, MSG_QUOTA_CONSUMED,
};
use crate::errors::AppError;
use std::str::FromStr;

/// Turns a message key into user-facing text.
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str) -> String;
}

/// Supported display languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl FromStr for Locale {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "english" => Ok(Self::En),
            "zh" | "zh-cn" | "chinese" => Ok(Self::Zh),
            other => Err(AppError::InvalidInput(format!(
                "Unsupported locale '{other}', expected 'en' or 'zh'"
            ))),
        }
    }
}

/// Built-in message catalog. Keys are the English strings; unknown keys are returned as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog {
    locale: Locale,
}

impl Catalog {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str) -> String {
        let translated = match self.locale {
            Locale::En => None,
            Locale::Zh => match key {
                MSG_ADMIN_ONLY => Some("仅管理员可导出日志"),
                MSG_EXPORT_SUCCEEDED => Some("导出成功"),
                MSG_EXPORT_FAILED => Some("导出失败"),
                MSG_QUOTA_CONSUMED => Some("消耗额度"),
                _ => None,
            },
        };
        translated.unwrap_or(key).to_string()
    }
}
