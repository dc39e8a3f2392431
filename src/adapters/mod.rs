// Adapters layer: concrete implementations of the domain ports.

pub mod openai;
pub mod storage;

pub use openai::OpenAiClient;
pub use storage::LocalStorage;
