use std::time::Duration;

use async_trait::async_trait;
use faebot_core::config::ReplicateConfig;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::provider::{GenerationProvider, GenerationRequest, ProviderError};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Replicate predictions API client.
///
/// Creates a prediction with `Prefer: wait` so short completions come back in
/// the first response, then polls the prediction's `get` URL until it reaches
/// a terminal status or the configured deadline passes.
pub struct ReplicateProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    timeout: Duration,
}

impl ReplicateProvider {
    pub fn new(config: &ReplicateConfig) -> Result<Self, ProviderError> {
        let api_token = config
            .api_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::Unavailable("no Replicate API token configured".into()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        })
    }

    async fn fetch(&self, builder: reqwest::RequestBuilder) -> Result<Prediction, ProviderError> {
        let resp = builder
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::Unavailable(e.to_string())
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Replicate API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        resp.json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl GenerationProvider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn generate(&self, req: &GenerationRequest) -> Result<String, ProviderError> {
        let deadline = Instant::now() + self.timeout;
        let target = PredictionTarget::parse(&req.model);
        let url = target.url(&self.base_url);
        let body = build_request_body(req, &target);

        debug!(model = %req.model, "creating Replicate prediction");

        let create = self
            .client
            .post(&url)
            .header("Prefer", "wait")
            .timeout(self.timeout)
            .json(&body);
        let mut prediction = tokio::time::timeout_at(deadline, self.fetch(create))
            .await
            .map_err(|_| ProviderError::Timeout {
                secs: self.timeout.as_secs(),
            })??;

        loop {
            match prediction.status.as_str() {
                "succeeded" => return Ok(prediction.output_text()),
                "failed" | "canceled" => {
                    return Err(ProviderError::Prediction {
                        status: prediction.status.clone(),
                        detail: prediction.error_text(),
                    })
                }
                _ => {}
            }

            if Instant::now() + POLL_INTERVAL >= deadline {
                warn!(id = %prediction.id, status = %prediction.status, "prediction deadline passed");
                return Err(ProviderError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
            let Some(poll_url) = prediction.urls.get.clone() else {
                return Err(ProviderError::Parse(format!(
                    "prediction {} is {} but has no poll URL",
                    prediction.id, prediction.status
                )));
            };

            tokio::time::sleep(POLL_INTERVAL).await;
            debug!(id = %prediction.id, status = %prediction.status, "polling prediction");
            let poll = self.client.get(&poll_url).timeout(self.timeout);
            prediction = tokio::time::timeout_at(deadline, self.fetch(poll))
                .await
                .map_err(|_| ProviderError::Timeout {
                    secs: self.timeout.as_secs(),
                })??;
        }
    }
}

/// Where a model identifier points: an official model (`owner/name`) or a
/// pinned version (`owner/name:version`).
#[derive(Debug, Clone, PartialEq, Eq)]
enum PredictionTarget<'a> {
    Model(&'a str),
    Version(&'a str),
}

impl<'a> PredictionTarget<'a> {
    fn parse(model: &'a str) -> Self {
        match model.split_once(':') {
            Some((_, version)) => Self::Version(version),
            None => Self::Model(model),
        }
    }

    fn url(&self, base_url: &str) -> String {
        match self {
            Self::Model(model) => format!("{base_url}/v1/models/{model}/predictions"),
            Self::Version(_) => format!("{base_url}/v1/predictions"),
        }
    }
}

fn build_request_body(req: &GenerationRequest, target: &PredictionTarget<'_>) -> serde_json::Value {
    let input = serde_json::json!({
        "prompt": req.prompt,
        "system_prompt": req.persona,
        "temperature": req.params.temperature,
        "top_p": req.params.top_p,
        "top_k": req.params.top_k,
        "seed": req.params.seed,
        "max_new_tokens": req.params.max_new_tokens,
        "min_new_tokens": -1,
    });
    match target {
        PredictionTarget::Version(version) => serde_json::json!({
            "version": version,
            "input": input,
        }),
        PredictionTarget::Model(_) => serde_json::json!({ "input": input }),
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: String,
    status: String,
    #[serde(default)]
    output: serde_json::Value,
    #[serde(default)]
    error: serde_json::Value,
    #[serde(default)]
    urls: PredictionUrls,
}

#[derive(Debug, Default, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

impl Prediction {
    /// Language models stream tokens, so `output` is usually an array of
    /// string fragments; a plain string is accepted as well.
    fn output_text(&self) -> String {
        match &self.output {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(parts) => parts
                .iter()
                .filter_map(|p| p.as_str())
                .collect::<Vec<_>>()
                .concat(),
            _ => String::new(),
        }
    }

    fn error_text(&self) -> String {
        match &self.error {
            serde_json::Value::Null => "no detail".to_string(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
