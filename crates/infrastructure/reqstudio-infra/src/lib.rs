pub mod llm;

// Re-exports for convenience
pub use llm::{OllamaClient, OllamaConfig};
