pub mod exa;
pub mod gemini;

pub use exa::{ExaClient, SearchQuery, SearchResult};
pub use gemini::GeminiClient;
