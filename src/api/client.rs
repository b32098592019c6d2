use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::auth::SessionContext;
use crate::domain::KanbanError;

/// Bearer-authenticated JSON transport to the remote store.
#[derive(Clone, Debug)]
pub struct StoreClient {
    http: reqwest::Client,
    session: SessionContext,
}

impl StoreClient {
    pub fn new(http: reqwest::Client, session: SessionContext) -> Self {
        Self { http, session }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, KanbanError> {
        let token = self.session.bearer()?;
        Ok(self
            .http
            .request(method, self.session.url(path))
            .bearer_auth(token))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, KanbanError> {
        let response = self
            .request(Method::GET, path)?
            .send()
            .await
            .map_err(|e| Self::network_error(path, e))?;
        Self::decode(path, response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, KanbanError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, path)?
            .json(body)
            .send()
            .await
            .map_err(|e| Self::network_error(path, e))?;
        Self::decode(path, response).await
    }

    fn network_error(path: &str, err: reqwest::Error) -> KanbanError {
        tracing::debug!(path, error = %err, "Store request did not complete");
        KanbanError::NetworkUnavailable(err.to_string())
    }

    /// Turns a store response into `T`. Failures carry the response status.
    pub(crate) async fn decode<T: DeserializeOwned>(
        path: &str,
        response: Response,
    ) -> Result<T, KanbanError> {
        let status = response.status();
        if !status.is_success() {
            let details: Option<Value> = response.json().await.ok();
            tracing::debug!(path, status = status.as_u16(), "Store rejected request");
            return Err(KanbanError::rejected(status.as_u16(), details));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(path, error = %e, "Store returned an unexpected body");
            KanbanError::Rejected {
                status: status.as_u16(),
                message: format!("unexpected response body: {e}"),
                details: None,
            }
        })
    }
}
