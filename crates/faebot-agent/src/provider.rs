use async_trait::async_trait;
use faebot_core::SamplingParams;

/// One text-generation call: the assembled transcript prompt plus the
/// channel's persona, routed to a specific model.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub persona: String,
    pub params: SamplingParams,
}

/// Common interface for text-generation backends (Replicate, test fakes).
///
/// The call is a single async request/response; it may take many seconds and
/// callers must not hold any channel lock across it.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    async fn generate(&self, req: &GenerationRequest) -> Result<String, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("prediction {status}: {detail}")]
    Prediction { status: String, detail: String },

    #[error("prediction did not finish within {secs}s")]
    Timeout { secs: u64 },

    #[error("provider returned an empty completion")]
    Empty,

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}
