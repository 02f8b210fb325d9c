use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glance_logging::{glance_debug, glance_info, glance_warn};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::extract::{ExtractedContent, Extractor, ReadabilityLikeExtractor};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::guard::{BlockReason, GuardSettings, GuardVerdict, UrlGuard};
use crate::{decode_html, markup, sync, Article, FailureKind, FetchError};

/// Coarse failure class of a load; the HTTP layer maps it to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidInput,
    Forbidden,
    UpstreamFailure,
    TooLarge,
    Timeout,
    ExtractionFailure,
    Superseded,
    Unexpected,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Forbidden(BlockReason),
    #[error("Upstream returned HTTP {0}")]
    UpstreamStatus(u16),
    #[error("Upstream request failed: {0}")]
    Upstream(String),
    #[error("Response too large")]
    TooLarge,
    #[error("Unsupported content type: {0}")]
    UnsupportedContent(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Could not extract article content")]
    ExtractionFailure,
    #[error("Request superseded")]
    Superseded,
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl LoadError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LoadError::InvalidInput(_) => ErrorClass::InvalidInput,
            LoadError::Forbidden(_) => ErrorClass::Forbidden,
            LoadError::UpstreamStatus(_)
            | LoadError::Upstream(_)
            | LoadError::UnsupportedContent(_) => ErrorClass::UpstreamFailure,
            LoadError::TooLarge => ErrorClass::TooLarge,
            LoadError::Timeout => ErrorClass::Timeout,
            LoadError::ExtractionFailure => ErrorClass::ExtractionFailure,
            LoadError::Superseded => ErrorClass::Superseded,
            LoadError::Unexpected(_) => ErrorClass::Unexpected,
        }
    }

    fn from_block(reason: BlockReason) -> Self {
        match reason {
            BlockReason::InvalidUrl | BlockReason::UnsupportedScheme | BlockReason::MissingHost => {
                LoadError::InvalidInput(reason.to_string())
            }
            _ => LoadError::Forbidden(reason),
        }
    }
}

impl From<FetchError> for LoadError {
    fn from(err: FetchError) -> Self {
        match err.kind {
            FailureKind::Blocked(reason) => LoadError::Forbidden(reason),
            FailureKind::HttpStatus(code) => LoadError::UpstreamStatus(code),
            FailureKind::Timeout => LoadError::Timeout,
            FailureKind::TooLarge { .. } => LoadError::TooLarge,
            FailureKind::UnsupportedContentType { content_type } => {
                LoadError::UnsupportedContent(content_type)
            }
            FailureKind::Cancelled => LoadError::Superseded,
            FailureKind::InvalidUrl | FailureKind::RedirectLimitExceeded | FailureKind::Network => {
                LoadError::Upstream(err.to_string())
            }
        }
    }
}

struct SessionSlot {
    generation: u64,
    cancel: CancellationToken,
}

type Sessions = Mutex<HashMap<String, SessionSlot>>;

/// One load's hold on its session slot. The slot is released when the lease
/// is released or dropped, unless a newer load has taken it over.
struct SessionLease<'a> {
    sessions: &'a Sessions,
    key: Option<String>,
    generation: u64,
    cancel: CancellationToken,
}

impl SessionLease<'_> {
    /// `false` when a newer load owns the session.
    fn release(mut self) -> bool {
        match self.key.take() {
            Some(key) => release_slot(self.sessions, &key, self.generation),
            None => true,
        }
    }
}

impl Drop for SessionLease<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            if release_slot(self.sessions, &key, self.generation) {
                glance_debug!("Load {} for session {} dropped", self.generation, key);
            }
        }
    }
}

fn release_slot(sessions: &Sessions, key: &str, generation: u64) -> bool {
    let mut sessions = lock(sessions);
    match sessions.get(key) {
        Some(slot) if slot.generation == generation => {
            sessions.remove(key);
            true
        }
        _ => false,
    }
}

fn lock(sessions: &Sessions) -> MutexGuard<'_, HashMap<String, SessionSlot>> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Guard → fetch → decode → extract → synchronize, one article per call.
///
/// Loads that share a session key supersede each other: starting a new one
/// cancels the one in flight, and a load that is no longer the newest for its
/// session reports [`LoadError::Superseded`] whatever its own outcome was.
pub struct ArticleService {
    guard: UrlGuard,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    sessions: Sessions,
    generations: AtomicU64,
}

impl ArticleService {
    pub fn new(guard: UrlGuard, fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            guard,
            fetcher,
            extractor,
            sessions: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Production wiring: system resolver, reqwest fetcher, readability-like extractor.
    pub fn with_settings(fetch: FetchSettings, guard: GuardSettings) -> Self {
        let guard = UrlGuard::new(guard);
        let fetcher = ReqwestFetcher::new(fetch, guard.clone());
        Self::new(guard, Arc::new(fetcher), Arc::new(ReadabilityLikeExtractor))
    }

    pub async fn load(&self, session: Option<&str>, url: &str) -> Result<Article, LoadError> {
        let lease = self.begin(session);
        let result = self.run(url, &lease.cancel).await;

        let generation = lease.generation;
        if !lease.release() {
            glance_info!(
                "Load {} for session {} superseded",
                generation,
                session.unwrap_or_default()
            );
            return Err(LoadError::Superseded);
        }
        if let Err(err) = &result {
            glance_warn!("Load of {} failed: {}", url, err);
        }
        result
    }

    async fn run(&self, url: &str, cancel: &CancellationToken) -> Result<Article, LoadError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(LoadError::InvalidInput("URL is required".to_string()));
        }

        let target = match self.guard.check(url).await {
            GuardVerdict::Allowed(target) => target,
            GuardVerdict::Blocked(reason) => return Err(LoadError::from_block(reason)),
        };

        let output = self.fetcher.fetch(&target, cancel).await?;
        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref());
        glance_debug!(
            "Decoded {} bytes as {}",
            output.metadata.byte_len,
            decoded.encoding_label
        );
        let base_url = Url::parse(&output.metadata.final_url).ok();

        // Parsing is CPU-bound and the scraper tree is not Send.
        let extractor = Arc::clone(&self.extractor);
        let html = decoded.html;
        let article = tokio::task::spawn_blocking(move || {
            extractor
                .extract(&html, base_url.as_ref())
                .and_then(|content| build_article(content, base_url.as_ref()))
        })
        .await
        .map_err(|err| LoadError::Unexpected(err.to_string()))?;

        if cancel.is_cancelled() {
            return Err(LoadError::Superseded);
        }
        article.ok_or(LoadError::ExtractionFailure)
    }

    /// Sessions with a load in flight.
    pub fn active_sessions(&self) -> usize {
        lock(&self.sessions).len()
    }

    fn begin(&self, session: Option<&str>) -> SessionLease<'_> {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        if let Some(key) = session {
            let previous = lock(&self.sessions).insert(
                key.to_string(),
                SessionSlot {
                    generation,
                    cancel: cancel.clone(),
                },
            );
            if let Some(previous) = previous {
                glance_debug!(
                    "Session {} cancels load {} for load {}",
                    key,
                    previous.generation,
                    generation
                );
                previous.cancel.cancel();
            }
        }
        SessionLease {
            sessions: &self.sessions,
            key: session.map(str::to_string),
            generation,
            cancel,
        }
    }
}

/// Reattaches split punctuation and derives the plain text from the markup
/// as a client will parse it, so both word enumerations agree.
///
/// The tree is rendered and parsed again first: the HTML parser may move
/// text (table content outside a cell, for one), and the words must follow
/// the order the parser produces, not the order of the sanitized tree.
pub fn build_article(content: ExtractedContent, base_url: Option<&Url>) -> Option<Article> {
    let mut nodes = content.content;
    sync::reattach_punctuation(&mut nodes);
    let mut nodes = markup::parse_fragment(&markup::render(&nodes));
    sync::reattach_punctuation(&mut nodes);
    let plain_text = sync::plain_text(&nodes);
    if plain_text.is_empty() {
        return None;
    }

    let site_name = content
        .site_name
        .or_else(|| base_url.and_then(Url::host_str).map(str::to_string));
    Some(Article {
        title: content.title.unwrap_or_default(),
        html_content: markup::render(&nodes),
        plain_text,
        excerpt: content.excerpt,
        byline: content.byline,
        site_name,
    })
}
