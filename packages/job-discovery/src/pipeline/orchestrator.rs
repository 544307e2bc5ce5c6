//! Pipeline orchestrator.
//!
//! Runs one discovery pass over a single page session:
//!
//! 1. Traverse every results page into stubs
//! 2. Collapse duplicate ids
//! 3. Drop skip-listed ids
//! 4. Drop names containing banned words
//! 5. Batch-classify names (when a classifier and a target profile are set)
//! 6. Extract details one by one, optionally checking each description
//! 7. Partition into validated and rejected

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cancel::{check, guarded};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::pagination::{Paginator, TraversalOptions};
use crate::pipeline::classify::BatchClassifier;
use crate::pipeline::detail::DetailExtractor;
use crate::pipeline::filter::{dedupe, skip_listed, without_banned_words};
use crate::progress::{ProgressEvent, ProgressFeed, Stage};
use crate::traits::classifier::Classifier;
use crate::traits::session::PageSession;
use crate::types::config::{PipelineConfig, PipelineInput};
use crate::types::item::{CompleteItem, DetailOutcome, ItemStub};
use crate::types::result::PipelineResult;

/// Discovery pipeline bound to one page session.
pub struct Pipeline<S: PageSession> {
    session: S,
    classifier: Option<Arc<dyn Classifier>>,
    config: PipelineConfig,
    cancel: CancellationToken,
    progress: Option<ProgressFeed>,
}

impl<S: PageSession> Pipeline<S> {
    pub fn new(session: S, config: PipelineConfig) -> Self {
        Self {
            session,
            classifier: None,
            config,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Enable semantic filtering (used only when the input has a target profile).
    pub fn with_classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
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

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Run, returning an empty result if the run aborts.
    ///
    /// Use [`try_run`](Self::try_run) to tell an aborted run from one that
    /// found nothing.
    pub async fn run(&self, input: &PipelineInput) -> PipelineResult {
        self.try_run(input)
            .await
            .unwrap_or_else(|_| PipelineResult::empty())
    }

    /// Run, surfacing the fatal error if the run aborts.
    pub async fn try_run(&self, input: &PipelineInput) -> DiscoveryResult<PipelineResult> {
        let run_id = Uuid::now_v7();
        let span = info_span!("discovery_run", %run_id);

        async {
            let result = self.execute(input).await;
            if let Err(e) = &result {
                error!(error = %e, "Discovery run aborted");
                self.publish(ProgressEvent::RunAborted {
                    reason: e.to_string(),
                });
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, input: &PipelineInput) -> DiscoveryResult<PipelineResult> {
        self.config.validate()?;
        let batch_size = input.effective_batch_size(&self.config)?;
        check(&self.cancel)?;

        info!("Looking for listings");
        let stubs = self.traverse().await?;
        let all_ids: Vec<String> = stubs.iter().map(|stub| stub.id.clone()).collect();
        info!(found = stubs.len(), "Listings found");

        let stubs = dedupe(stubs, self.config.duplicates);
        self.stage_done(Stage::Deduplication, stubs.len());

        let stubs = skip_listed(stubs, &input.skip_ids);
        info!(remaining = stubs.len(), "After skip list");
        self.stage_done(Stage::SkipList, stubs.len());

        let stubs = without_banned_words(stubs, &input.banned_words);
        info!(remaining = stubs.len(), "After banned words");
        self.stage_done(Stage::BannedWords, stubs.len());

        let judge = match (&self.classifier, &input.target_profile) {
            (Some(classifier), Some(profile)) => Some((classifier.as_ref(), profile)),
            _ => None,
        };

        let (stubs, batch_rejected) = match judge {
            Some((classifier, profile)) => {
                info!("Filtering names with the classifier");
                let outcome = BatchClassifier::new(classifier, profile, batch_size)
                    .with_cancellation(self.cancel.clone())
                    .classify(stubs)
                    .await?;
                info!(
                    remaining = outcome.kept.len(),
                    removed = outcome.removed.len(),
                    "After semantic filter"
                );
                self.stage_done(Stage::SemanticFilter, outcome.kept.len());
                (outcome.kept, outcome.removed)
            }
            None => (stubs, Vec::new()),
        };

        let mut extractor =
            DetailExtractor::new(&self.session).with_cancellation(self.cancel.clone());
        if let Some((classifier, profile)) = judge {
            extractor = extractor.with_classifier(classifier, profile);
        }
        if let Some(progress) = &self.progress {
            extractor = extractor.with_progress(progress.clone());
        }

        let outcomes = extractor.extract_all(&stubs).await?;
        self.stage_done(Stage::Details, outcomes.len());

        let mut result =
            PipelineResult::from_items(all_ids, outcomes.into_iter().map(DetailOutcome::into_item));

        if self.config.report_batch_rejections {
            result
                .rejected
                .extend(batch_rejected.into_iter().map(|stub| {
                    let link = self.session.detail_link(&stub.id);
                    CompleteItem::rejected_from_stub(stub, link)
                }));
        }

        info!(
            validated = result.validated.len(),
            rejected = result.rejected.len(),
            by_ai = result.rejected_by_ai().count(),
            with_error = result.errored().count(),
            "Discovery finished"
        );
        self.publish(ProgressEvent::RunCompleted {
            validated: result.validated.len(),
            rejected: result.rejected.len(),
        });

        Ok(result)
    }

    /// Gather every stub from a fresh listing page, closing it afterwards.
    async fn traverse(&self) -> DiscoveryResult<Vec<ItemStub>> {
        let mut page = guarded(&self.cancel, self.session.create_page())
            .await?
            .map_err(DiscoveryError::SessionSetup)?;

        let mut paginator =
            Paginator::new(TraversalOptions::from(&self.config)).with_cancellation(self.cancel.clone());
        if let Some(progress) = &self.progress {
            paginator = paginator.with_progress(progress.clone());
        }

        let traversal = paginator.traverse(page.as_mut()).await;
        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close listing page");
        }

        let traversal = traversal?;
        info!(pages = traversal.pages, end = ?traversal.end, "Traversal finished");
        self.stage_done(Stage::Traversal, traversal.stubs.len());
        Ok(traversal.stubs)
    }

    fn stage_done(&self, stage: Stage, remaining: usize) {
        self.publish(ProgressEvent::StageCompleted { stage, remaining });
    }

    fn publish(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress.publish(event);
        }
    }
}

impl<S: PageSession + 'static> Pipeline<S> {
    /// Erase the session type, e.g. to run pipelines for several sites together.
    pub fn boxed(self) -> Pipeline<Box<dyn PageSession>> {
        Pipeline {
            session: Box::new(self.session),
            classifier: self.classifier,
            config: self.config,
            cancel: self.cancel,
            progress: self.progress,
        }
    }
}
