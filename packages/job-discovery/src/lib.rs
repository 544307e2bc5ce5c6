//! Job Listing Discovery Pipeline
//!
//! Walks a paginated listing site, narrows the stubs it finds through cheap
//! local filters and an optional LLM classifier, then fetches full details
//! for what is left.
//!
//! # Design Philosophy
//!
//! - The site adapter owns the browser; the pipeline only sees traits
//! - Per-item failures are data, fatal failures are errors
//! - Classifier trouble never removes a listing (fail open)
//! - Stages are pure where they can be
//!
//! # Usage
//!
//! ```rust,ignore
//! use job_discovery::{Pipeline, PipelineConfig, PipelineInput, TargetProfile, Language};
//! use job_discovery::ai::OpenAIClassifier;
//!
//! let pipeline = Pipeline::new(my_session, PipelineConfig::from_env()?)
//!     .with_classifier(OpenAIClassifier::from_env()?);
//!
//! let input = PipelineInput::new()
//!     .with_skip_ids(already_seen)
//!     .with_banned_words(["stage", "alternance"])
//!     .with_target_profile(TargetProfile::new("Juriste en droit de la famille", Language::Fr)?);
//!
//! let result = pipeline.run(&input).await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator seams (PageSession, PageHandle, Classifier)
//! - [`types`] - Stubs, items, verdicts, config and results
//! - [`pagination`] - Traversal engine with sticky advance strategies
//! - [`pipeline`] - Filters, classification, detail extraction, orchestration
//! - [`progress`] - Live progress feed
//! - [`testing`] - Scripted collaborators for testing

mod cancel;
pub mod error;
pub mod pagination;
pub mod pipeline;
pub mod progress;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{
    ClassifierError, ConfigError, DiscoveryError, DiscoveryResult, PageError, StrategyFailure,
};
pub use pagination::{Paginator, StrategyCursor, StrategyId, Traversal, TraversalEnd, TraversalOptions};
pub use pipeline::{
    BatchClassifier, BatchOutcome, DetailExtractor, DiscoveryReport, MultiSiteDiscovery, Pipeline,
    SiteReport,
};
pub use progress::{ProgressEvent, ProgressFeed, Stage};
pub use traits::{
    classifier::Classifier,
    session::{Advance, PageHandle, PageSession, ReadyTarget},
};
pub use types::{
    config::{DuplicatePolicy, Language, PipelineConfig, PipelineInput, TargetProfile},
    item::{CompleteItem, DetailOutcome, ItemDetail, ItemStub},
    result::PipelineResult,
    verdict::Verdict,
};

// Re-export for callers wiring cancellation
pub use tokio_util::sync::CancellationToken;
