pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use adapters::{LocalStorage, OpenAiClient};
pub use config::Settings;
pub use core::{engine::AnalysisEngine, pipeline::DocumentPipeline};
pub use utils::error::{AnalystError, Result};
