pub mod error;
pub mod extraction;
pub mod merge;
pub mod orchestrator;
pub mod scoring;
pub mod sources;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use error::ProfilerIssue;
pub use extraction::{Extractor, KnowledgeProfile, PostDigest, ProfileFields};
pub use orchestrator::{Orchestrator, ProfileRun};
pub use scoring::{reliability_level, score, ScoringTable};
pub use sources::{SourceAdapter, SourceSpec};
pub use traits::{
    CompletionRequest, FetchError, FetchedPage, LanguageModel, OutputSchema, PageFetcher,
    PageRequest,
};
