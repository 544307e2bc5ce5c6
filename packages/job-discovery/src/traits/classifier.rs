//! Classifier trait for natural-language yes/no questions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClassifierResult;

/// Answers one natural-language question with free text.
///
/// Implementations wrap a specific LLM provider. Retries, if any, belong
/// in the implementation; the pipeline asks each question once and treats
/// any error or blank answer as "no answer".
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn ask(&self, question: &str) -> ClassifierResult<String>;
}

#[async_trait]
impl<T: Classifier + ?Sized> Classifier for Arc<T> {
    async fn ask(&self, question: &str) -> ClassifierResult<String> {
        (**self).ask(question).await
    }
}
