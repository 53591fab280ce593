pub mod evaluator;
pub mod pipeline;
pub mod progress;

pub use pipeline::EvaluationPipeline;
