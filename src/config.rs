use std::time::Duration;

use anyhow::Context;

use crate::domain::EntityId;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub board_id: Option<EntityId>,
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub reconnect_delay: Duration,
    pub comment_settle_delay: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let millis = |key: &str, fallback: Duration| {
            non_empty(key)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        let board_id = match non_empty("KANBAN_BOARD_ID") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .with_context(|| format!("KANBAN_BOARD_ID is not a board id: {raw}"))?,
            ),
            None => None,
        };

        Ok(Self {
            api_base: non_empty("KANBAN_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            board_id,
            access_token: non_empty("KANBAN_ACCESS_TOKEN"),
            username: non_empty("KANBAN_USERNAME"),
            password: non_empty("KANBAN_PASSWORD"),
            reconnect_delay: millis("KANBAN_RECONNECT_DELAY_MS", defaults.reconnect_delay),
            comment_settle_delay: millis("KANBAN_COMMENT_SETTLE_MS", defaults.comment_settle_delay),
            request_timeout: non_empty("KANBAN_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        })
    }

    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8000".into(),
            board_id: None,
            access_token: None,
            username: None,
            password: None,
            reconnect_delay: Duration::from_secs(1),
            comment_settle_delay: Duration::from_millis(200),
            request_timeout: Duration::from_secs(30),
        }
    }
}
