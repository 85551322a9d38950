use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

impl FetchError {
    /// Rate limiting, server errors and network trouble are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(e) => !e.is_builder() && !e.is_decode(),
            FetchError::Status(code) => *code == 429 || (500..600).contains(code),
        }
    }
}

/// Where course pages come from.
#[async_trait]
pub trait CourseSource: Send + Sync {
    async fn fetch(&self, id: u32) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub endpoint: String,
    pub user_agent: String,
    /// Ordered form fields posted with every request.
    pub form: Vec<(String, String)>,
    /// The one form field that carries the candidate identifier.
    pub id_field: String,
    pub timeout: Duration,
}

impl FetchConfig {
    pub fn payload(&self, id: u32) -> Vec<(String, String)> {
        self.form
            .iter()
            .map(|(k, v)| {
                if *k == self.id_field {
                    (k.clone(), id.to_string())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect()
    }
}

pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Fetcher, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Fetcher { client, config })
    }
}

#[async_trait]
impl CourseSource for Fetcher {
    async fn fetch(&self, id: u32) -> Result<String, FetchError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&self.config.payload(id))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}
