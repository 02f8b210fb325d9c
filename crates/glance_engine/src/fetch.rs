use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use glance_logging::{glance_debug, glance_info, glance_warn};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use tokio_util::sync::CancellationToken;

use crate::guard::{ApprovedTarget, GuardVerdict, UrlGuard};
use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput};

pub const DEFAULT_USER_AGENT: &str = "GlanceReader/0.1 (+article-fetch)";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Budget for the whole fetch, redirects and body included.
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
    /// Media types accepted from the final response. A response without a
    /// `Content-Type` header is read anyway.
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allowed_content_types: default_content_types(),
        }
    }
}

pub fn default_content_types() -> Vec<String> {
    vec!["text/html".to_string(), "application/xhtml+xml".to_string()]
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a guard-approved target. Cancelling `cancel` aborts the transfer
    /// and discards whatever was read.
    async fn fetch(
        &self,
        target: &ApprovedTarget,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    guard: UrlGuard,
}

impl ReqwestFetcher {
    /// `guard` re-checks every redirect hop.
    pub fn new(settings: FetchSettings, guard: UrlGuard) -> Self {
        Self { settings, guard }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn build_client(&self, target: &ApprovedTarget) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(self.settings.user_agent.as_str());

        // Connect only to the addresses the guard checked.
        if let (Some(host), false) = (target.url.host_str(), target.pinned_addrs.is_empty()) {
            builder = builder.resolve_to_addrs(host, &target.pinned_addrs);
        }

        builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(media_type))
    }

    async fn fetch_following_redirects(
        &self,
        target: &ApprovedTarget,
    ) -> Result<FetchOutput, FetchError> {
        let mut current = target.clone();
        let mut redirect_count = 0usize;

        loop {
            let client = self.build_client(&current)?;
            let response = client
                .get(current.url.clone())
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            if status.is_redirection() {
                if let Some(location) = location {
                    if redirect_count >= self.settings.redirect_limit {
                        return Err(FetchError::new(
                            FailureKind::RedirectLimitExceeded,
                            format!("more than {} redirects", self.settings.redirect_limit),
                        ));
                    }
                    let next = current
                        .url
                        .join(&location)
                        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
                    glance_debug!("Redirect {} -> {}", current.url, next);
                    current = match self.guard.check_url(next).await {
                        GuardVerdict::Allowed(approved) => approved,
                        GuardVerdict::Blocked(reason) => {
                            return Err(FetchError::new(
                                FailureKind::Blocked(reason),
                                "redirect target rejected",
                            ));
                        }
                    };
                    redirect_count += 1;
                    continue;
                }
            }

            if !status.is_success() {
                return Err(FetchError::new(
                    FailureKind::HttpStatus(status.as_u16()),
                    status.to_string(),
                ));
            }

            if let Some(content_len) = response.content_length() {
                if content_len > self.settings.max_bytes {
                    return Err(FetchError::new(
                        FailureKind::TooLarge {
                            max_bytes: self.settings.max_bytes,
                            actual: Some(content_len),
                        },
                        "declared content length exceeds limit",
                    ));
                }
            }

            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.to_string());

            if let Some(content_type) = content_type.as_deref() {
                if !self.is_content_type_allowed(content_type) {
                    return Err(FetchError::new(
                        FailureKind::UnsupportedContentType {
                            content_type: content_type.to_string(),
                        },
                        "not an HTML document",
                    ));
                }
            }

            let bytes = read_bounded(response.bytes_stream(), self.settings.max_bytes).await?;

            let metadata = FetchMetadata {
                original_url: target.url.to_string(),
                final_url,
                redirect_count,
                content_type,
                byte_len: bytes.len() as u64,
            };
            return Ok(FetchOutput { bytes, metadata });
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        target: &ApprovedTarget,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, FetchError> {
        glance_info!("Fetching {}", target.url);
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::new(FailureKind::Cancelled, "fetch cancelled")),
            outcome = tokio::time::timeout(
                self.settings.request_timeout,
                self.fetch_following_redirects(target),
            ) => match outcome {
                Ok(result) => result,
                Err(_) => Err(FetchError::new(FailureKind::Timeout, "request timed out")),
            },
        };

        match &result {
            Ok(output) => glance_info!(
                "Fetched {} ({} bytes, {} redirects)",
                output.metadata.final_url,
                output.metadata.byte_len,
                output.metadata.redirect_count
            ),
            Err(err) => glance_warn!("Fetch of {} failed: {}", target.url, err),
        }
        result
    }
}

/// Collects a body stream, aborting as soon as more than `max_bytes` arrive.
/// Nothing read so far is returned on failure.
pub(crate) async fn read_bounded<S>(mut stream: S, max_bytes: u64) -> Result<Vec<u8>, FetchError>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: None,
                },
                format!("body exceeded {max_bytes} bytes while streaming"),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
