// src/backend/http.rs

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::debug;

use crate::backend::{
    Backend, BackendConfig, BackendFuture, MessageResponse, RunAck, RunRequest, StatusReport,
};
use crate::errors::{PipewatchError, Result};
use crate::steps::ModuleName;

/// [`Backend`] over plain HTTP + JSON.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Turn a non-2xx response into [`PipewatchError::Backend`].
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageResponse>(&body)
        .map(|m| m.text())
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(body);
    Err(PipewatchError::Backend {
        status: status.as_u16(),
        message,
    })
}

impl Backend for HttpBackend {
    fn start_run<'a>(&'a self, start_step: &'a str) -> BackendFuture<'a, RunAck> {
        Box::pin(async move {
            let request = RunRequest {
                start_step: start_step.to_string(),
            };
            let response = self.client.post(self.url("run")).json(&request).send().await?;
            let status = response.status();
            debug!(start_step, status = status.as_u16(), "run request answered");

            if status.is_client_error() {
                let reply: MessageResponse = response.json().await.unwrap_or_default();
                return Ok(RunAck::Rejected(reply.text()));
            }

            let response = ensure_success(response).await?;
            let reply: MessageResponse = response.json().await.unwrap_or_default();
            Ok(RunAck::Accepted(reply.text()))
        })
    }

    fn fetch_status(&self) -> BackendFuture<'_, StatusReport> {
        Box::pin(async move {
            let response = ensure_success(self.client.get(self.url("status")).send().await?).await?;
            Ok(response.json::<StatusReport>().await?)
        })
    }

    fn fetch_history(&self) -> BackendFuture<'_, Vec<ModuleName>> {
        Box::pin(async move {
            let response =
                ensure_success(self.client.get(self.url("history")).send().await?).await?;
            Ok(response.json::<Vec<ModuleName>>().await?)
        })
    }

    fn clear_history(&self) -> BackendFuture<'_, String> {
        Box::pin(async move {
            let response =
                ensure_success(self.client.post(self.url("history")).send().await?).await?;
            let reply: MessageResponse = response.json().await.unwrap_or_default();
            Ok(reply.text())
        })
    }

    fn fetch_config(&self) -> BackendFuture<'_, BackendConfig> {
        Box::pin(async move {
            let response =
                ensure_success(self.client.get(self.url("config")).send().await?).await?;
            Ok(response.json::<BackendConfig>().await?)
        })
    }

    fn save_config<'a>(&'a self, config: &'a BackendConfig) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let response = ensure_success(
                self.client.post(self.url("config")).json(config).send().await?,
            )
            .await?;
            let reply: MessageResponse = response.json().await.unwrap_or_default();
            Ok(reply.text())
        })
    }
}
