use crate::error::FetchError;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Capability to perform `GET <url>` and return the whole body
///
/// Every call takes an optional cancellation token; a cancelled call settles
/// with [`FetchError::Cancelled`].
pub trait HttpTransport: Send + Sync {
    /// Fetch the body of `url`; non-success statuses are errors
    fn get(
        &self,
        url: &Url,
        cancel: Option<&CancellationToken>,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Runs `operation` unless `cancel` fires first
pub async fn with_cancellation<T>(
    url: &Url,
    cancel: Option<&CancellationToken>,
    operation: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(FetchError::Cancelled { url: url.clone() }),
                result = operation => result,
            }
        }
        None => operation.await,
    }
}

/// [`HttpTransport`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client that identifies itself with `user_agent`
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &Url,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<u8>, FetchError> {
        let request = async {
            ::log::trace!("GET {}", url);
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| FetchError::Request {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.clone(),
                    status: status.as_u16(),
                });
            }

            let body = response.bytes().await.map_err(|e| FetchError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;
            ::log::trace!("GET {} returned {} bytes", url, body.len());
            Ok::<_, FetchError>(body.to_vec())
        };

        with_cancellation(url, cancel, request).await
    }
}
