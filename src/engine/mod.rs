pub mod metrics;
pub mod results;
pub mod trainer;

pub use metrics::{evaluate, EvaluationMetrics};
pub use results::TrainingOutcome;
pub use trainer::{infer, InferenceOutcome, TrainRequest, Trainer};
