//! Batch semantic filter.
//!
//! Sends the names of the surviving stubs to the classifier in fixed-size
//! batches, one question per batch, and removes the stubs it answers `-1`
//! for. The filter fails open: an error or a blank answer keeps the whole
//! batch.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cancel::guarded;
use crate::error::DiscoveryResult;
use crate::pipeline::prompts::batch_question;
use crate::traits::classifier::Classifier;
use crate::types::config::TargetProfile;
use crate::types::item::ItemStub;
use crate::types::verdict::{parse_batch_answer, Verdict};

/// Stubs split by the classifier, each side in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub kept: Vec<ItemStub>,
    pub removed: Vec<ItemStub>,
}

/// Filters stubs by name against a target profile.
pub struct BatchClassifier<'a> {
    classifier: &'a dyn Classifier,
    profile: &'a TargetProfile,
    batch_size: usize,
    cancel: CancellationToken,
}

impl<'a> BatchClassifier<'a> {
    pub fn new(classifier: &'a dyn Classifier, profile: &'a TargetProfile, batch_size: usize) -> Self {
        Self {
            classifier,
            profile,
            batch_size: batch_size.max(1),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Classify every stub. Only cancellation is an error.
    pub async fn classify(&self, stubs: Vec<ItemStub>) -> DiscoveryResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        let mut remaining = stubs.into_iter();
        let mut batch_number = 0;

        loop {
            let batch: Vec<ItemStub> = remaining.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            batch_number += 1;

            let verdicts = self.ask(batch_number, &batch).await?;
            let before = outcome.removed.len();

            for (stub, verdict) in batch.into_iter().zip(verdicts) {
                if verdict.keeps() {
                    outcome.kept.push(stub);
                } else {
                    outcome.removed.push(stub);
                }
            }

            debug!(
                batch = batch_number,
                removed = outcome.removed.len() - before,
                "Classified batch"
            );
        }

        Ok(outcome)
    }

    /// One verdict per stub in `batch`; all `Unknown` when there is no usable answer.
    async fn ask(&self, batch_number: usize, batch: &[ItemStub]) -> DiscoveryResult<Vec<Verdict>> {
        let names: Vec<&str> = batch.iter().map(|stub| stub.name.as_str()).collect();
        let question = batch_question(self.profile, &names);

        let answer = guarded(&self.cancel, self.classifier.ask(&question)).await?;
        let verdicts = match answer {
            Ok(answer) if !answer.trim().is_empty() => parse_batch_answer(&answer, batch.len()),
            Ok(_) => {
                warn!(batch = batch_number, "Classifier gave no answer, keeping batch");
                vec![Verdict::Unknown; batch.len()]
            }
            Err(e) => {
                warn!(batch = batch_number, error = %e, "Classifier failed, keeping batch");
                vec![Verdict::Unknown; batch.len()]
            }
        };

        Ok(verdicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClassifierError, ClassifierResult, DiscoveryError};
    use crate::testing::{batch_question_names, stubs, MockClassifier};
    use crate::types::config::Language;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Oracle {}

        #[async_trait]
        impl Classifier for Oracle {
            async fn ask(&self, question: &str) -> ClassifierResult<String>;
        }
    }

    fn profile() -> TargetProfile {
        TargetProfile::new("Rust backend work", Language::En).unwrap()
    }

    fn ids(stubs: &[ItemStub]) -> Vec<&str> {
        stubs.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_positional_verdicts_remove_rejections() {
        let classifier = MockClassifier::new().with_default_answer("1,-1,0");
        let profile = profile();

        let outcome = BatchClassifier::new(&classifier, &profile, 20)
            .classify(stubs(3))
            .await
            .unwrap();

        assert_eq!(ids(&outcome.kept), vec!["1", "3"]);
        assert_eq!(ids(&outcome.removed), vec!["2"]);
    }

    #[tokio::test]
    async fn test_one_question_per_batch() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_ask()
            .times(3)
            .returning(|_| Ok("1".to_string()));
        let profile = profile();

        let outcome = BatchClassifier::new(&oracle, &profile, 20)
            .classify(stubs(45))
            .await
            .unwrap();

        assert_eq!(outcome.kept.len(), 45);
    }

    #[tokio::test]
    async fn test_batches_carry_their_own_names() {
        let classifier = MockClassifier::new().with_default_answer("1");
        let profile = profile();

        BatchClassifier::new(&classifier, &profile, 2)
            .classify(stubs(5))
            .await
            .unwrap();

        let batches: Vec<Vec<String>> = classifier
            .questions()
            .iter()
            .filter_map(|q| batch_question_names(q))
            .collect();
        assert_eq!(
            batches,
            vec![
                vec!["Listing 1".to_string(), "Listing 2".to_string()],
                vec!["Listing 3".to_string(), "Listing 4".to_string()],
                vec!["Listing 5".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_verdicts_are_relative_to_each_batch() {
        // Second batch rejects its first item, which is stub 3 overall.
        let classifier = MockClassifier::new()
            .with_queued(Ok("1,1".to_string()))
            .with_queued(Ok("-1,1".to_string()));
        let profile = profile();

        let outcome = BatchClassifier::new(&classifier, &profile, 2)
            .classify(stubs(4))
            .await
            .unwrap();

        assert_eq!(ids(&outcome.removed), vec!["3"]);
        assert_eq!(ids(&outcome.kept), vec!["1", "2", "4"]);
    }

    #[tokio::test]
    async fn test_failed_batch_fails_open() {
        let classifier = MockClassifier::new()
            .with_queued(Err(ClassifierError::Network("connection reset".into())))
            .with_queued(Ok("-1,-1".to_string()));
        let profile = profile();

        let outcome = BatchClassifier::new(&classifier, &profile, 2)
            .classify(stubs(4))
            .await
            .unwrap();

        assert_eq!(ids(&outcome.kept), vec!["1", "2"]);
        assert_eq!(ids(&outcome.removed), vec!["3", "4"]);
    }

    #[tokio::test]
    async fn test_blank_answer_keeps_batch() {
        let classifier = MockClassifier::new().with_default_answer("   ");
        let profile = profile();

        let outcome = BatchClassifier::new(&classifier, &profile, 20)
            .classify(stubs(3))
            .await
            .unwrap();

        assert_eq!(outcome.kept.len(), 3);
        assert!(outcome.removed.is_empty());
    }

    #[tokio::test]
    async fn test_short_answer_keeps_unanswered_tail() {
        let classifier = MockClassifier::new().with_default_answer("-1, -1");
        let profile = profile();

        let outcome = BatchClassifier::new(&classifier, &profile, 20)
            .classify(stubs(4))
            .await
            .unwrap();

        assert_eq!(ids(&outcome.removed), vec!["1", "2"]);
        assert_eq!(ids(&outcome.kept), vec!["3", "4"]);
    }

    #[tokio::test]
    async fn test_empty_input_asks_nothing() {
        let mut oracle = MockOracle::new();
        oracle.expect_ask().never();
        let profile = profile();

        let outcome = BatchClassifier::new(&oracle, &profile, 20)
            .classify(Vec::new())
            .await
            .unwrap();

        assert_eq!(outcome, BatchOutcome::default());
    }

    #[tokio::test]
    async fn test_cancelled_before_asking() {
        let classifier = MockClassifier::new().with_default_answer("1");
        let profile = profile();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = BatchClassifier::new(&classifier, &profile, 20)
            .with_cancellation(cancel)
            .classify(stubs(3))
            .await
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::Cancelled));
    }
}
