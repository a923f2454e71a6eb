use std::time::Duration;

use log::{debug, warn};
use reqwest::Url;

use super::error::ExecutorError;
use super::method::HttpMethod;
use super::request::{ApiRequest, ApiResponse};
use super::transport::{ReqwestTransport, Transport};

/// Fixed-delay retry on transport failure and 5xx
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

pub struct RequestExecutor<T: Transport = ReqwestTransport> {
    transport: T,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(transport: T, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            transport,
            timeout,
            retry,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request`, retrying transport failures and 5xx responses.
    ///
    /// Responses below 500 come back on the first attempt. A 5xx that survives
    /// every retry is returned as `Ok`; a transport failure that does is
    /// returned as [`ExecutorError::Transport`]. A bad method or URL fails
    /// before anything is sent, and a request the transport cannot assemble
    /// is not retried.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ExecutorError> {
        let method: HttpMethod = request.method.parse()?;
        let url = Url::parse(&request.url).map_err(|e| ExecutorError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("{} {} (attempt {}/{})", method, url, attempt, max_attempts);

            let outcome = self
                .transport
                .send(method, &url, request, self.timeout)
                .await;

            let retryable = match &outcome {
                Ok(res) => res.is_server_error(),
                Err(e) => e.is_retryable(),
            };

            if !retryable || attempt >= max_attempts {
                return outcome
                    .map(|mut res| {
                        res.attempts = attempt;
                        res
                    })
                    .map_err(|source| ExecutorError::Transport {
                        url: request.url.clone(),
                        attempts: attempt,
                        source,
                    });
            }

            match &outcome {
                Ok(res) => warn!(
                    "{} {} returned {}, retrying in {:?} ({}/{})",
                    method, url, res.status, self.retry.retry_delay, attempt, self.retry.max_retries
                ),
                Err(e) => warn!(
                    "{} {} failed: {}, retrying in {:?} ({}/{})",
                    method, url, e, self.retry.retry_delay, attempt, self.retry.max_retries
                ),
            }
            tokio::time::sleep(self.retry.retry_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::TransportError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays canned outcomes, repeating the last one once the script runs out.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
        last: Mutex<Option<Result<ApiResponse, TransportError>>>,
        calls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<ApiResponse, TransportError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            _method: HttpMethod,
            _url: &Url,
            _request: &ApiRequest,
            _timeout: Duration,
        ) -> Result<ApiResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            if let Some(outcome) = next {
                *last = Some(outcome);
            }
            last.clone().expect("script must not be empty")
        }
    }

    fn executor(
        script: Vec<Result<ApiResponse, TransportError>>,
        max_retries: u32,
    ) -> RequestExecutor<ScriptedTransport> {
        RequestExecutor::new(
            ScriptedTransport::new(script),
            Duration::from_secs(1),
            RetryPolicy {
                max_retries,
                retry_delay: Duration::ZERO,
            },
        )
    }

    fn get() -> ApiRequest {
        ApiRequest::new("GET", "http://localhost:9/api/stats")
    }

    #[tokio::test]
    async fn test_persistent_server_error_retries_exactly_max_retries() {
        let exec = executor(vec![Ok(ApiResponse::new(500, "boom"))], 3);
        let res = exec.execute(&get()).await.unwrap();

        assert_eq!(res.status, 500);
        assert_eq!(res.attempts, 4);
        assert_eq!(exec.transport.calls(), 4);
    }

    #[tokio::test]
    async fn test_below_500_returns_without_retry() {
        for status in [200, 201, 302, 401, 404] {
            let exec = executor(vec![Ok(ApiResponse::new(status, "{}"))], 3);
            let res = exec.execute(&get()).await.unwrap();
            assert_eq!(res.status, status);
            assert_eq!(exec.transport.calls(), 1, "status {status} was retried");
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_server_error() {
        let exec = executor(
            vec![
                Ok(ApiResponse::new(503, "")),
                Ok(ApiResponse::new(200, "{\"ok\":true}")),
            ],
            2,
        );
        let res = exec.execute(&get()).await.unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(res.attempts, 2);
        assert_eq!(exec.transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_after_retries() {
        let exec = executor(vec![Err(TransportError::Timeout)], 2);
        let err = exec.execute(&get()).await.unwrap_err();

        match err {
            ExecutorError::Transport {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(source, TransportError::Timeout);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(exec.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_unbuildable_request_is_not_retried() {
        let exec = executor(
            vec![Err(TransportError::InvalidRequest("bad header".into()))],
            2,
        );
        let err = exec.execute(&get()).await.unwrap_err();

        assert!(matches!(err, ExecutorError::Transport { attempts: 1, .. }));
        assert!(!err.is_configuration());
        assert!(!err.was_sent());
        assert_eq!(exec.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_makes_single_attempt() {
        let exec = executor(vec![Ok(ApiResponse::new(502, ""))], 0);
        let res = exec.execute(&get()).await.unwrap();
        assert_eq!(res.status, 502);
        assert_eq!(exec.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_method_fails_before_sending() {
        let exec = executor(vec![Ok(ApiResponse::new(200, ""))], 2);
        let err = exec
            .execute(&ApiRequest::new("PATCH", "http://localhost:9/api/sites"))
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(exec.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_sending() {
        let exec = executor(vec![Ok(ApiResponse::new(200, ""))], 2);
        let err = exec
            .execute(&ApiRequest::new("GET", "not a url"))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutorError::InvalidUrl { .. }));
        assert_eq!(exec.transport.calls(), 0);
    }
}
