//! Discovery pipeline stages.
//!
//! - `filter`: skip list, banned words and duplicate handling
//! - `prompts`: classifier question templates
//! - `classify`: batch semantic filter over stub names
//! - `detail`: per-item detail extraction
//! - `orchestrator`: runs the stages in order for one site
//! - `sources`: runs several sites and merges their results

pub mod classify;
pub mod detail;
pub mod filter;
pub mod orchestrator;
pub mod prompts;
pub mod sources;

pub use classify::{BatchClassifier, BatchOutcome};
pub use detail::DetailExtractor;
pub use orchestrator::Pipeline;
pub use sources::{DiscoveryReport, MultiSiteDiscovery, SiteReport};
