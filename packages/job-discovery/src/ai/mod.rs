//! Classifier implementations for real LLM providers.

pub mod openai;

pub use openai::OpenAIClassifier;
