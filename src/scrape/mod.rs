mod classifier;
mod extractor;
mod fetcher;
mod orchestrator;

pub use classifier::{RuleSet, FEATURED_TAG};
pub use extractor::{extract_candidates, resolve_url};
pub use fetcher::PageFetcher;
pub use orchestrator::{Orchestrator, PassOutcome, PassSummary, SkipReason};
