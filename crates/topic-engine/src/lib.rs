//! Topic rotation and anti-repetition engine.
//!
//! Selects blog topics per category so that nothing is reused inside a
//! cooldown window and nothing semantically close to a recent topic is
//! picked. Also records usage, maintains the similarity index and grows the
//! topic pool through a text generation service.

pub mod curation;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod expansion;
pub mod external;
pub mod generator;
pub mod index;
pub mod lease;
pub mod normalize;
pub mod recorder;
pub mod selector;
pub mod similarity;
pub mod stats;
pub mod storage;

pub use curation::TopicCurator;
pub use eligibility::{CategorySnapshot, Eligibility, SelectionParams};
pub use engine::TopicEngine;
pub use error::{EngineError, ExternalService};
pub use expansion::{ExpansionRequest, ExpansionTrigger, TopicExpander};
pub use generator::{
    ApiTopicGenerator, ApiTopicGeneratorConfig, GeneratorError, GeneratorProvider,
    MockTopicGenerator, TopicGenerator,
};
pub use index::{RecalculationReport, SimilarityIndexBuilder};
pub use lease::CategoryLease;
pub use recorder::UsageRecorder;
pub use selector::{NotAvailable, Selection, SelectionRequest, Suggestion, TopicSelector};
pub use stats::StatsAggregator;
pub use storage::TopicStorage;
