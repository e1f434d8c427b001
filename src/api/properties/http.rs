//! HTTP properties service implementation

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::{DraftCreated, DraftPayload, DraftUpdated, PropertiesService, PropertyRecord};
use crate::api::error::ServiceError;
use crate::config::ServiceConfig;

/// Properties service reached over its REST API
pub struct HttpPropertiesService {
    base_url: String,
    token: Option<String>,
    client: Client,
    max_retries: usize,
    base_delay: Duration,
}

impl HttpPropertiesService {
    /// Create a client for `base_url` (e.g. "https://app.example.com/api")
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ServiceError> {
        Self::with_settings(base_url, token, Duration::from_secs(30), 3)
    }

    fn with_settings(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, ServiceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ServiceError::NotConfigured("empty base url".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::network(e.to_string()))?;

        Ok(Self {
            base_url,
            token,
            client,
            max_retries,
            base_delay: Duration::from_millis(250),
        })
    }

    /// Create from config. The bearer token is read from the environment
    /// variable named by `api_key_env`; a missing token is allowed for
    /// services behind a trusted proxy.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let token = env::var(&config.api_key_env).ok().filter(|t| !t.is_empty());
        if token.is_none() {
            debug!(var = %config.api_key_env, "No properties service token in environment");
        }
        Self::with_settings(
            config.base_url.clone(),
            token,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn retry_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(self.max_retries)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        id: Option<&str>,
    ) -> Result<T, ServiceError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ServiceError::network(e.to_string()))?;
        Self::decode(response, id).await
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
        id: Option<&str>,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(match ServiceError::from_status(status.as_u16(), id, body) {
                ServiceError::RateLimited { .. } => ServiceError::RateLimited {
                    retry_after_secs: retry_after,
                },
                other => other,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::decode(e.to_string()))
    }

    async fn update_once(&self, id: &str, payload: &DraftPayload) -> Result<DraftUpdated, ServiceError> {
        let request = self
            .client
            .patch(self.url(&format!("properties/{}", id)))
            .json(payload);
        self.send(request, Some(id)).await
    }

    async fn get_once(&self, id: &str) -> Result<PropertyRecord, ServiceError> {
        let request = self.client.get(self.url(&format!("properties/{}", id)));
        self.send(request, Some(id)).await
    }
}

#[async_trait]
impl PropertiesService for HttpPropertiesService {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn create_draft(&self) -> Result<DraftCreated, ServiceError> {
        // Not retried: a timed-out create may still have inserted a row
        let request = self
            .client
            .post(self.url("properties"))
            .json(&serde_json::json!({ "etat": "draft" }));
        self.send(request, None).await
    }

    #[instrument(skip(self, payload))]
    async fn update(&self, id: &str, payload: &DraftPayload) -> Result<DraftUpdated, ServiceError> {
        let op = || async { self.update_once(id, payload).await };

        op.retry(self.retry_strategy())
            .when(ServiceError::is_retryable)
            .notify(|err, dur| {
                warn!("Retrying draft update after {:?}: {}", dur, err);
            })
            .await
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<PropertyRecord, ServiceError> {
        let op = || async { self.get_once(id).await };

        op.retry(self.retry_strategy())
            .when(ServiceError::is_retryable)
            .notify(|err, dur| {
                warn!("Retrying property load after {:?}: {}", dur, err);
            })
            .await
    }
}
