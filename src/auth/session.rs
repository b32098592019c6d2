use serde::{Deserialize, Serialize};

use crate::api::StoreClient;
use crate::domain::{EntityId, KanbanError, User};

/// Credentials and origin shared by every component talking to the store.
///
/// Built once at login and handed to each constructor; nothing reads the
/// token from ambient state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    api_base: String,
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<User>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

impl SessionContext {
    pub fn anonymous(api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: None,
            refresh_token: None,
            user: None,
        }
    }

    pub fn with_token(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        let mut session = Self::anonymous(api_base);
        session.access_token = Some(token.into());
        session
    }

    pub async fn login(
        http: &reqwest::Client,
        api_base: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, KanbanError> {
        let mut session = Self::anonymous(api_base);
        let response = http
            .post(session.url("/api/login/"))
            .json(&LoginRequest { username: username.trim(), password })
            .send()
            .await?;

        let body: LoginResponse = StoreClient::decode("/api/login/", response)
            .await
            .inspect_err(|e| tracing::warn!(username, error = %e, "Login rejected"))?;
        tracing::info!(username, "Logged in");
        session.access_token = Some(body.access);
        session.refresh_token = body.refresh;
        session.user = body.user;
        Ok(session)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// The bearer credential, or `Unauthenticated` when the caller must go
    /// through login first.
    pub fn bearer(&self) -> Result<&str, KanbanError> {
        self.access_token
            .as_deref()
            .ok_or(KanbanError::Unauthenticated)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Push endpoint for one board, on the same host as the REST API.
    pub fn push_url(&self, board_id: EntityId) -> Result<String, KanbanError> {
        let host = if let Some(rest) = self.api_base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.api_base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(KanbanError::Config(format!(
                "API base has no http(s) scheme: {}",
                self.api_base
            )));
        };
        let origin = host.split('/').take(3).collect::<Vec<_>>().join("/");
        Ok(format!("{origin}/ws/boards/{board_id}/"))
    }
}
