use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::config::PipelineConfig;
use crate::domain::{FailureReason, FetchOutcome, FetchTask};
use crate::error::PackError;

/// Transport for a single image download. Implementations make exactly one
/// attempt and report every problem as a [`FailureReason`].
pub trait ImageClient: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, FailureReason>;
}

#[derive(Clone)]
pub struct HttpImageClient {
    client: Client,
}

impl HttpImageClient {
    pub fn new(config: &PipelineConfig) -> Result<Self, PackError> {
        Self::with_timeout(&config.user_agent, config.timeout())
    }

    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Result<Self, PackError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|err| PackError::HttpClient(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| PackError::HttpClient(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ImageClient for HttpImageClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, FailureReason> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| FailureReason::Transport(describe(&err)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FailureReason::Status(status.as_u16()));
        }

        response
            .bytes()
            .map(|body| body.to_vec())
            .map_err(|err| FailureReason::Transport(describe(&err)))
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    }
}

/// Runs one task to its outcome. A task without a URL never reaches the pool,
/// but is still answered with a failure rather than a panic.
pub fn fetch_task(client: &dyn ImageClient, task: FetchTask) -> FetchOutcome {
    let sanitized_name = task.sanitized_name();
    let Some(source_url) = task.source_url else {
        return FetchOutcome::Failure {
            row_index: task.row_index,
            sanitized_name,
            source_url: String::new(),
            reason: FailureReason::Transport("missing URL".to_string()),
        };
    };

    tracing::debug!(row = task.row_index, url = %source_url, "fetching");
    match client.get(&source_url) {
        Ok(bytes) => FetchOutcome::Success {
            row_index: task.row_index,
            sanitized_name,
            bytes,
        },
        Err(reason) => FetchOutcome::Failure {
            row_index: task.row_index,
            sanitized_name,
            source_url,
            reason,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticClient(Result<Vec<u8>, FailureReason>);

    impl ImageClient for StaticClient {
        fn get(&self, _url: &str) -> Result<Vec<u8>, FailureReason> {
            self.0.clone()
        }
    }

    fn task(name: &str) -> FetchTask {
        FetchTask {
            row_index: 7,
            display_name: name.to_string(),
            source_url: Some("http://example.test/x.png".to_string()),
        }
    }

    #[test]
    fn success_carries_sanitized_name_and_body() {
        let outcome = fetch_task(&StaticClient(Ok(b"png".to_vec())), task("a/b"));
        assert_eq!(
            outcome,
            FetchOutcome::Success {
                row_index: 7,
                sanitized_name: crate::domain::SanitizedName::new("a_b"),
                bytes: b"png".to_vec(),
            }
        );
    }

    #[test]
    fn failure_keeps_url_and_reason() {
        let outcome = fetch_task(&StaticClient(Err(FailureReason::Status(503))), task("x"));
        match outcome {
            FetchOutcome::Failure {
                source_url, reason, ..
            } => {
                assert_eq!(source_url, "http://example.test/x.png");
                assert_eq!(reason, FailureReason::Status(503));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn task_without_url_fails_instead_of_panicking() {
        let mut task = task("x");
        task.source_url = None;
        let outcome = fetch_task(&StaticClient(Ok(Vec::new())), task);
        assert!(!outcome.is_success());
    }
}
