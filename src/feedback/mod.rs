pub mod collector;
pub mod domain;

pub use collector::{
    FeedbackCollector, FeedbackError, FeedbackStatistics, TrainingExample, TrainingLabel,
    WorkflowFeedbackStatistics, DEFAULT_MAX_ENTRIES, DEFAULT_MIN_CORRECTIONS,
};
pub use domain::{FeedbackEntry, MatchType};
