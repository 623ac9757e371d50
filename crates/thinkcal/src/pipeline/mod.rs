pub mod material;
pub mod prompt;
pub mod runner;
pub mod stage;

pub use material::{AggregationLevel, MaterialAggregator, MonthMaterial, YearMaterials};
pub use prompt::PromptSet;
pub use runner::ReportPipeline;
pub use stage::{FailureStage, ProcessOutcome};
