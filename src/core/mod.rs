pub mod audit;
pub mod engine;
pub mod export;
pub mod intake;
pub mod metadata;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod retention;
pub mod signals;
pub mod summary;

pub use crate::domain::model::{AnalysisOutcome, AnalysisReport, Document, Upload};
pub use crate::domain::ports::{ChatModel, ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
