//! Glance engine: guarded fetching, article extraction, word synchronization
//! and the playback driver.
mod decode;
mod driver;
mod engine;
mod extract;
mod fetch;
pub mod guard;
pub mod markup;
pub mod sync;
mod types;

pub use decode::{decode_html, DecodedHtml};
pub use driver::PlaybackHandle;
pub use engine::{build_article, ArticleService, ErrorClass, LoadError};
pub use extract::{ExtractedContent, Extractor, ReadabilityLikeExtractor};
pub use fetch::{default_content_types, FetchSettings, Fetcher, ReqwestFetcher, DEFAULT_USER_AGENT};
pub use guard::{
    ApprovedTarget, BlockReason, GuardSettings, GuardVerdict, Resolver, StaticResolver,
    SystemResolver, UrlGuard,
};
pub use sync::{annotate_html, plain_text, word_selector, AnnotatedMarkup};
pub use types::{Article, FailureKind, FetchError, FetchMetadata, FetchOutput};
