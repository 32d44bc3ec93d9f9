//! HTTP client for the local inference service.

use crate::ServiceConfig;
use serde::{Deserialize, Serialize};
use storyreel_core::GenerateRequest;
use storyreel_error::{ServerError, ServerErrorKind, ServerResult};
use tracing::{debug, instrument};

/// Body of `POST /api/generate`.
#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    keep_alive: u32,
    options: GenerateOptions,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    images: &'a [String],
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsReply {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for the service's local control endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: ServiceConfig,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new client.
    #[instrument(skip(config), fields(base_url = %config.base_url))]
    pub fn new(config: ServiceConfig) -> Self {
        debug!("Creating service client");
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Liveness probe with the short probe timeout. Never fails.
    #[instrument(skip(self))]
    pub async fn is_online(&self) -> bool {
        let result = self
            .client
            .get(self.url("/api/tags"))
            .timeout(self.config.probe_timeout())
            .send()
            .await;

        match result {
            Ok(response) => {
                let online = response.status().is_success();
                debug!(online, status = %response.status(), "Liveness probe answered");
                online
            }
            Err(e) => {
                debug!(error = %e, "Liveness probe failed");
                false
            }
        }
    }

    /// Names of the installed models.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or answers garbage.
    #[instrument(skip(self))]
    pub async fn list_models(&self) -> ServerResult<Vec<String>> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(self.config.probe_timeout())
            .send()
            .await
            .map_err(|e| ServerError::new(ServerErrorKind::Http(format!("list models: {}", e))))?;

        if !response.status().is_success() {
            return Err(ServerError::new(ServerErrorKind::Api(format!(
                "list models returned {}",
                response.status()
            ))));
        }

        let tags: TagsReply = response.json().await.map_err(|e| {
            ServerError::new(ServerErrorKind::Deserialization(format!(
                "model list: {}",
                e
            )))
        })?;

        let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        debug!(count = names.len(), "Listed installed models");
        Ok(names)
    }

    /// Run one non-streaming generation with the given model.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status or an
    /// undecodable reply.
    #[instrument(skip(self, request), fields(model, prompt_len = request.prompt.len()))]
    pub async fn generate(&self, model: &str, request: &GenerateRequest) -> ServerResult<String> {
        tracing::Span::current().record("model", model);

        let body = GenerateBody {
            model,
            prompt: &request.prompt,
            system: &request.system,
            stream: false,
            keep_alive: 0,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            images: &request.images,
        };

        let response = self
            .client
            .post(self.url("/api/generate"))
            .timeout(self.config.generation_timeout())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServerError::new(ServerErrorKind::Timeout {
                        operation: "generate".into(),
                        seconds: self.config.generation_timeout_secs,
                    })
                } else {
                    ServerError::new(ServerErrorKind::Http(format!("generate: {}", e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(ServerError::new(ServerErrorKind::Api(format!(
                "generate returned {}",
                response.status()
            ))));
        }

        let reply: GenerateReply = response.json().await.map_err(|e| {
            ServerError::new(ServerErrorKind::Deserialization(format!(
                "generate reply: {}",
                e
            )))
        })?;

        debug!(response_len = reply.response.len(), "Generation complete");
        Ok(reply.response)
    }
}
