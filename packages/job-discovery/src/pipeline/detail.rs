//! Detail extraction with per-item failure isolation.
//!
//! Each stub gets its own page. Whatever goes wrong while opening it,
//! waiting on it or reading it becomes a failed item; only cancellation
//! escapes this stage.

use std::fmt::Display;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cancel::guarded;
use crate::error::{DiscoveryResult, PageResult};
use crate::pipeline::prompts::description_question;
use crate::progress::{ProgressEvent, ProgressFeed};
use crate::traits::classifier::Classifier;
use crate::traits::session::{PageHandle, PageSession, ReadyTarget};
use crate::types::config::TargetProfile;
use crate::types::item::{CompleteItem, DetailOutcome, ItemDetail, ItemStub};
use crate::types::verdict::Verdict;

/// Fetches full details, optionally checking each description with a classifier.
pub struct DetailExtractor<'a, S: PageSession + ?Sized> {
    session: &'a S,
    judge: Option<(&'a dyn Classifier, &'a TargetProfile)>,
    cancel: CancellationToken,
    progress: Option<ProgressFeed>,
}

impl<'a, S: PageSession + ?Sized> DetailExtractor<'a, S> {
    pub fn new(session: &'a S) -> Self {
        Self {
            session,
            judge: None,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Ask `classifier` about each fetched description.
    pub fn with_classifier(mut self, classifier: &'a dyn Classifier, profile: &'a TargetProfile) -> Self {
        self.judge = Some((classifier, profile));
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFeed) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Extract every stub in order, one at a time.
    pub async fn extract_all(&self, stubs: &[ItemStub]) -> DiscoveryResult<Vec<DetailOutcome>> {
        let mut outcomes = Vec::with_capacity(stubs.len());

        for (index, stub) in stubs.iter().enumerate() {
            let remaining = stubs.len() - index;
            info!(id = %stub.id, name = %stub.name, remaining, "Extracting listing");

            let outcome = self.extract(stub).await?;
            if let (Some(progress), DetailOutcome::Extracted(item)) = (&self.progress, &outcome) {
                progress.publish(ProgressEvent::ItemExtracted {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    remaining: remaining - 1,
                });
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Extract one stub. Never fails except on cancellation.
    pub async fn extract(&self, stub: &ItemStub) -> DiscoveryResult<DetailOutcome> {
        let link = self.session.detail_link(&stub.id);

        let mut page = match guarded(&self.cancel, self.session.create_page()).await? {
            Ok(page) => page,
            Err(e) => return Ok(self.failed(stub, link, e)),
        };

        let fetched = self.fetch(page.as_mut(), &stub.id).await;
        if let Err(e) = page.close().await {
            warn!(id = %stub.id, error = %e, "Failed to close detail page");
        }

        let detail = match fetched? {
            Ok(detail) => detail,
            Err(e) => return Ok(self.failed(stub, link, e)),
        };

        let rejected = self.rejects(&stub.id, &detail).await?;
        let item = CompleteItem::accepted(&stub.id, link, detail);

        if rejected {
            info!(id = %stub.id, "Classifier rejected description");
            Ok(DetailOutcome::Extracted(item.with_ai_rejection()))
        } else {
            info!(id = %stub.id, name = %item.name, "Done extracting listing");
            Ok(DetailOutcome::Extracted(item))
        }
    }

    async fn fetch(
        &self,
        page: &mut dyn PageHandle,
        id: &str,
    ) -> DiscoveryResult<PageResult<ItemDetail>> {
        let target = ReadyTarget::Detail(id.to_string());
        if let Err(e) = guarded(&self.cancel, page.wait_for_ready(&target)).await? {
            return Ok(Err(e));
        }
        guarded(&self.cancel, page.fetch_detail(id)).await
    }

    /// Whether the classifier answered the rejection token for this detail.
    async fn rejects(&self, id: &str, detail: &ItemDetail) -> DiscoveryResult<bool> {
        let Some((classifier, profile)) = self.judge else {
            return Ok(false);
        };

        let question = description_question(profile, &detail.description);
        match guarded(&self.cancel, classifier.ask(&question)).await? {
            Ok(answer) => Ok(Verdict::parse(&answer) == Verdict::Reject),
            Err(e) => {
                warn!(id, error = %e, "Classifier failed on description, accepting");
                Ok(false)
            }
        }
    }

    fn failed(&self, stub: &ItemStub, link: String, reason: impl Display) -> DetailOutcome {
        let reason = reason.to_string();
        warn!(id = %stub.id, error = %reason, "Failed to extract listing");

        if let Some(progress) = &self.progress {
            progress.publish(ProgressEvent::ItemFailed {
                id: stub.id.clone(),
                reason: reason.clone(),
            });
        }

        DetailOutcome::Failed {
            id: stub.id.clone(),
            link,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClassifierError, DiscoveryError};
    use crate::testing::{stubs, MockClassifier, ScriptedSession, SessionCall};
    use crate::types::config::Language;

    fn profile() -> TargetProfile {
        TargetProfile::new("Accompagnement juridique des familles", Language::Fr).unwrap()
    }

    fn count(session: &ScriptedSession, call: &SessionCall) -> usize {
        session.calls().iter().filter(|c| *c == call).count()
    }

    #[tokio::test]
    async fn test_extracts_detail_with_session_link() {
        let session = ScriptedSession::new()
            .with_detail("7", ItemDetail::new("Juriste", "Conseil aux familles"));

        let outcome = DetailExtractor::new(&session)
            .extract(&ItemStub::new("7", "Juriste (H/F)"))
            .await
            .unwrap();

        let item = outcome.into_item();
        assert_eq!(item.name, "Juriste");
        assert_eq!(item.description, "Conseil aux familles");
        assert_eq!(item.link, "https://jobs.example.test/view/7");
        assert!(item.validated_by_ai.is_none());
        assert!(item.error.is_none());
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_item() {
        let session = ScriptedSession::new()
            .with_listing_page(stubs(3))
            .fail_detail("2");

        let outcomes = DetailExtractor::new(&session)
            .extract_all(&stubs(3))
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].is_failed());
        assert!(outcomes[1].is_failed());
        assert!(!outcomes[2].is_failed());

        let failed = outcomes[1].clone().into_item();
        assert_eq!(failed.id, "2");
        assert_eq!(failed.link, "https://jobs.example.test/view/2");
        assert!(failed.name.is_empty());
        assert!(failed.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_each_item_gets_its_own_page() {
        let session = ScriptedSession::new()
            .with_listing_page(stubs(4))
            .fail_detail("3");

        DetailExtractor::new(&session)
            .extract_all(&stubs(4))
            .await
            .unwrap();

        assert_eq!(count(&session, &SessionCall::CreatePage), 4);
        assert_eq!(count(&session, &SessionCall::Close), 4);
        assert_eq!(session.fetched_ids(), vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_page_open_failure_becomes_failed_item() {
        let session = ScriptedSession::new().with_failing_setup();

        let outcome = DetailExtractor::new(&session)
            .extract(&ItemStub::new("5", "Comptable"))
            .await
            .unwrap();

        assert!(outcome.is_failed());
        assert_eq!(outcome.id(), "5");
    }

    #[tokio::test]
    async fn test_close_failure_does_not_fail_item() {
        let session = ScriptedSession::new()
            .with_listing_page(stubs(1))
            .with_failing_closes();

        let outcome = DetailExtractor::new(&session)
            .extract(&stubs(1)[0])
            .await
            .unwrap();

        assert!(!outcome.is_failed());
    }

    #[tokio::test]
    async fn test_reject_token_marks_item() {
        let session = ScriptedSession::new()
            .with_detail("1", ItemDetail::new("Chef", "Cuisine  collective\n en EHPAD"))
            .with_detail("2", ItemDetail::new("Juriste", "Droit de la famille"));
        let classifier = MockClassifier::new()
            .with_answer("Cuisine collective en EHPAD", "-1")
            .with_default_answer("1");
        let profile = profile();

        let outcomes = DetailExtractor::new(&session)
            .with_classifier(&classifier, &profile)
            .extract_all(&[ItemStub::new("1", "Chef"), ItemStub::new("2", "Juriste")])
            .await
            .unwrap();

        let items: Vec<CompleteItem> = outcomes.into_iter().map(DetailOutcome::into_item).collect();
        assert_eq!(items[0].validated_by_ai, Some(false));
        assert_eq!(items[1].validated_by_ai, None);
        assert_eq!(classifier.questions().len(), 2);
    }

    #[tokio::test]
    async fn test_other_answers_accept() {
        let session = ScriptedSession::new().with_listing_page(stubs(3));
        let classifier = MockClassifier::new()
            .with_queued(Ok("0".to_string()))
            .with_queued(Ok("".to_string()))
            .with_queued(Err(ClassifierError::Api("429 Too Many Requests".into())));
        let profile = profile();

        let outcomes = DetailExtractor::new(&session)
            .with_classifier(&classifier, &profile)
            .extract_all(&stubs(3))
            .await
            .unwrap();

        assert!(outcomes
            .into_iter()
            .map(DetailOutcome::into_item)
            .all(|item| item.is_validated()));
    }

    #[tokio::test]
    async fn test_failed_fetch_skips_classifier() {
        let session = ScriptedSession::new().fail_detail("1");
        let classifier = MockClassifier::new().with_default_answer("-1");
        let profile = profile();

        let outcome = DetailExtractor::new(&session)
            .with_classifier(&classifier, &profile)
            .extract(&ItemStub::new("1", "x"))
            .await
            .unwrap();

        assert!(outcome.is_failed());
        assert!(classifier.questions().is_empty());
    }

    #[tokio::test]
    async fn test_progress_reports_items() {
        let session = ScriptedSession::new()
            .with_listing_page(stubs(2))
            .fail_detail("1");
        let feed = ProgressFeed::new();
        let mut rx = feed.subscribe();

        DetailExtractor::new(&session)
            .with_progress(feed)
            .extract_all(&stubs(2))
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            ProgressEvent::ItemFailed { ref id, .. } if id == "1"
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::ItemExtracted {
                id: "2".into(),
                name: "Listing 2".into(),
                remaining: 0
            }
        );
    }

    #[tokio::test]
    async fn test_cancellation_escapes() {
        let cancel = CancellationToken::new();
        let session = ScriptedSession::new()
            .with_listing_page(stubs(3))
            .cancel_on_detail("2", cancel.clone());

        let err = DetailExtractor::new(&session)
            .with_cancellation(cancel)
            .extract_all(&stubs(3))
            .await
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::Cancelled));
        assert_eq!(session.fetched_ids(), vec!["1", "2"]);
    }
}
