use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub csrf_header_name: Option<String>,
    pub csrf_meta_name: Option<String>,
    pub csrf_cookie_name: Option<String>,
    pub session_cookie_name: Option<String>,
    pub login_path: Option<String>,
    pub debounce_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub log_level: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Some("http://127.0.0.1:8000".to_string()),
            csrf_header_name: Some("X-CSRF-Token".to_string()),
            csrf_meta_name: Some("csrf-token".to_string()),
            csrf_cookie_name: Some("csrf_token".to_string()),
            session_cookie_name: Some("finbot_session".to_string()),
            login_path: Some("/login".to_string()),
            debounce_ms: Some(500),
            user_agent: Some(concat!("finbot-client/", env!("CARGO_PKG_VERSION")).to_string()),
            log_level: Some("INFO".to_string()),
        }
    }
}

impl ClientConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or("http://127.0.0.1:8000")
    }

    pub fn csrf_header_name(&self) -> &str {
        self.csrf_header_name.as_deref().unwrap_or("X-CSRF-Token")
    }

    pub fn csrf_meta_name(&self) -> &str {
        self.csrf_meta_name.as_deref().unwrap_or("csrf-token")
    }

    pub fn csrf_cookie_name(&self) -> &str {
        self.csrf_cookie_name.as_deref().unwrap_or("csrf_token")
    }

    pub fn session_cookie_name(&self) -> &str {
        self.session_cookie_name.as_deref().unwrap_or("finbot_session")
    }

    pub fn login_path(&self) -> &str {
        self.login_path.as_deref().unwrap_or("/login")
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(500))
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.log_level.as_deref() {
            Some("DEBUG") => log::LevelFilter::Debug,
            Some("INFO") => log::LevelFilter::Info,
            Some("WARN") => log::LevelFilter::Warn,
            Some("ERROR") => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url": "https://ctf.example", "debounce_ms": 250}"#)
                .unwrap();

        assert_eq!(config.base_url(), "https://ctf.example");
        assert_eq!(config.debounce_delay(), Duration::from_millis(250));
        assert_eq!(config.csrf_header_name(), "X-CSRF-Token");
        assert_eq!(config.csrf_cookie_name(), "csrf_token");
        assert_eq!(config.login_path(), "/login");
    }

    #[test]
    fn unknown_log_level_is_info() {
        let config = ClientConfig {
            log_level: Some("TRACE-ALL".to_string()),
            ..ClientConfig::default()
        };
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }
}
