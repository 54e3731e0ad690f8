use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u8 = 1;
const DEFAULT_APP_NAME: &str = "Velo";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_CHAT_ENDPOINT: &str = "http://127.0.0.1:8000/api/llm/chat";
const DEFAULT_CALENDAR_WINDOW_MONTHS: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_chat_endpoint")]
    pub chat_endpoint: String,
    #[serde(default)]
    pub auth_base_url: String,
    #[serde(default)]
    pub auth_api_key: String,
    #[serde(default = "default_calendar_window_months")]
    pub calendar_window_months: u32,
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_chat_endpoint() -> String {
    DEFAULT_CHAT_ENDPOINT.to_string()
}

fn default_calendar_window_months() -> u32 {
    DEFAULT_CALENDAR_WINDOW_MONTHS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: SUPPORTED_SCHEMA,
            app_name: default_app_name(),
            timezone: default_timezone(),
            chat_endpoint: default_chat_endpoint(),
            auth_base_url: String::new(),
            auth_api_key: String::new(),
            calendar_window_months: default_calendar_window_months(),
        }
    }
}

impl AppConfig {
    pub fn time_zone(&self) -> Result<Tz, InfraError> {
        let name = self.timezone.trim();
        if name.is_empty() {
            return Ok(Tz::UTC);
        }
        name.parse::<Tz>()
            .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone: {name}")))
    }

    pub fn validate(&self) -> Result<(), InfraError> {
        if self.schema != SUPPORTED_SCHEMA {
            return Err(InfraError::InvalidConfig(format!(
                "unsupported schema {}",
                self.schema
            )));
        }
        self.time_zone()?;
        if self.chat_endpoint.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "chatEndpoint must not be empty".to_string(),
            ));
        }
        if self.calendar_window_months == 0 {
            return Err(InfraError::InvalidConfig(
                "calendarWindowMonths must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    fs::create_dir_all(config_dir)?;
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(&path, format!("{formatted}\n"))?;
        tracing::info!(path = %path.display(), "wrote default app config");
    }
    Ok(())
}

pub fn load_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let raw = fs::read_to_string(&path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != u64::from(SUPPORTED_SCHEMA) {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }

    let config: AppConfig = serde_json::from_value(parsed)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_written_once_and_loads() {
        let dir = tempfile::tempdir().expect("tempdir");
        ensure_default_configs(dir.path()).expect("write defaults");

        let path = dir.path().join(APP_JSON);
        fs::write(
            &path,
            r#"{"schema":1,"appName":"Mine","timezone":"America/New_York"}"#,
        )
        .expect("overwrite");
        ensure_default_configs(dir.path()).expect("second call keeps file");

        let config = load_config(dir.path()).expect("load");
        assert_eq!(config.app_name, "Mine");
        assert_eq!(config.time_zone().expect("tz"), chrono_tz::America::New_York);
        assert_eq!(config.chat_endpoint, DEFAULT_CHAT_ENDPOINT);
        assert_eq!(config.calendar_window_months, 24);
    }

    #[test]
    fn default_file_uses_camel_case_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        ensure_default_configs(dir.path()).expect("write defaults");
        let raw = fs::read_to_string(dir.path().join(APP_JSON)).expect("read");
        assert!(raw.contains("\"chatEndpoint\""));
        assert!(raw.contains("\"calendarWindowMonths\": 24"));
        assert_eq!(load_config(dir.path()).expect("load"), AppConfig::default());
    }

    #[test]
    fn unknown_schema_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(APP_JSON), r#"{"schema":2}"#).expect("write");
        assert!(matches!(
            load_config(dir.path()),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let config = AppConfig {
            timezone: "Mars/Olympus".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(InfraError::InvalidConfig(_))));
    }
}
