use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{CreatePipeRequest, PipeRequest, PipeResponse, PipeRun, PipeSummary};
use crate::config::{LangbaseConfig, RequestConfig};
use crate::error::{LangbaseError, LangbaseResult};

const RUN_PATH: &str = "/v1/pipes/run";
const PIPES_PATH: &str = "/v1/pipes";

/// Client for the Langbase Pipes API
#[derive(Clone)]
pub struct LangbaseClient {
    http: Client,
    base_url: String,
    api_key: String,
    request: RequestConfig,
}

impl LangbaseClient {
    pub fn new(config: &LangbaseConfig, request: RequestConfig) -> LangbaseResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(request.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Delay before retry `attempt` (1-based): the base delay, doubled per attempt.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.request.retry_delay_ms.saturating_mul(factor))
    }

    /// Run a pipe, retrying failed attempts with exponential backoff.
    ///
    /// Transport errors, non-2xx statuses, unreadable bodies and runs the
    /// pipe reports as unsuccessful all count as failed attempts.
    pub async fn run_pipe(&self, request: PipeRequest) -> LangbaseResult<PipeRun> {
        let attempts = self.request.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                warn!(
                    pipe = %request.name,
                    retry = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying pipe run"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            let outcome = self
                .post::<_, PipeResponse>(RUN_PATH, &request)
                .await
                .and_then(|response| response.into_run(&request.name));
            let latency_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(run) => {
                    debug!(
                        pipe = %request.name,
                        latency_ms,
                        prompt_tokens = run.usage.prompt_tokens,
                        completion_tokens = run.usage.completion_tokens,
                        "Pipe run succeeded"
                    );
                    return Ok(run);
                }
                Err(e) => {
                    error!(
                        pipe = %request.name,
                        error = %e,
                        latency_ms,
                        retry = attempt,
                        "Pipe run failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(LangbaseError::Unavailable {
            message: last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string()),
            retries: attempts,
        })
    }

    /// Create or replace a pipe definition.
    pub async fn create_pipe(&self, request: &CreatePipeRequest) -> LangbaseResult<PipeSummary> {
        info!(pipe = %request.name, model = %request.model, "Creating Langbase pipe");
        self.post(PIPES_PATH, request).await
    }

    /// Ensure a pipe exists with the given system prompt.
    ///
    /// A 409 from the API means the pipe is already there and counts as success.
    pub async fn ensure_pipe(
        &self,
        pipe_name: &str,
        description: &str,
        system_prompt: &str,
    ) -> LangbaseResult<()> {
        let request = CreatePipeRequest::upsert(pipe_name, description, system_prompt);

        match self.create_pipe(&request).await {
            Ok(summary) => {
                info!(pipe = %summary.name, url = ?summary.url, "Pipe ready");
                Ok(())
            }
            Err(LangbaseError::Api { status: 409, .. }) => {
                info!(pipe = %pipe_name, "Pipe already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> LangbaseResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LangbaseError::Timeout {
                        timeout_ms: self.request.timeout_ms,
                    }
                } else {
                    LangbaseError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| LangbaseError::InvalidResponse {
                message: format!("unreadable body from {}: {}", path, e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str, retry_delay_ms: u64) -> LangbaseClient {
        let config = LangbaseConfig {
            api_key: "test_key".to_string(),
            base_url: base_url.to_string(),
        };
        let request = RequestConfig {
            retry_delay_ms,
            ..RequestConfig::default()
        };
        LangbaseClient::new(&config, request).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(
            client("http://localhost:8080/", 1000).base_url(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let client = client("https://api.langbase.com", 100);
        assert_eq!(client.backoff(1), Duration::from_millis(100));
        assert_eq!(client.backoff(2), Duration::from_millis(200));
        assert_eq!(client.backoff(4), Duration::from_millis(800));
    }
}
