//! Testing utilities including scripted collaborators.
//!
//! These are useful for testing applications that embed the discovery
//! pipeline without driving a real browser or calling a real LLM.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;

use crate::error::{ClassifierError, ClassifierResult, PageError, PageResult};
use crate::pagination::StrategyId;
use crate::traits::{
    classifier::Classifier,
    session::{Advance, PageHandle, PageSession, ReadyTarget},
};
use crate::types::item::{ItemDetail, ItemStub};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// `count` stubs with ids `"1"..="count"` and names `"Listing N"`.
pub fn stubs(count: usize) -> Vec<ItemStub> {
    (1..=count)
        .map(|n| ItemStub::new(n.to_string(), format!("Listing {n}")))
        .collect()
}

/// Names listed on the last line of a batch question, if it is one.
pub fn batch_question_names(question: &str) -> Option<Vec<String>> {
    let line = question.lines().last()?.trim();
    let inner = line.strip_prefix('"')?.strip_suffix('"')?;
    Some(inner.split("\",\"").map(str::to_string).collect())
}

/// Record of a call made to a scripted session or one of its pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    CreatePage,
    WaitForReady(ReadyTarget),
    ReadBatch { page: usize },
    Advance { strategy: StrategyId, page: usize },
    FetchDetail { id: String },
    Close,
}

#[derive(Default)]
struct SessionState {
    listing: Vec<Vec<ItemStub>>,
    position: usize,
    looping: bool,
    missing_listing: bool,
    failing_setup: bool,
    broken_strategies: HashSet<StrategyId>,
    strategy_failures: HashMap<StrategyId, HashSet<usize>>,
    details: HashMap<String, ItemDetail>,
    failing_details: HashSet<String>,
    failing_closes: bool,
    cancel_on_detail: HashMap<String, CancellationToken>,
}

/// A scripted page session.
///
/// Serves predefined listing pages, fails the advance strategies it is told
/// to fail and records every call. Pages opened from one session share the
/// listing position.
#[derive(Clone)]
pub struct ScriptedSession {
    state: Arc<RwLock<SessionState>>,
    calls: Arc<RwLock<Vec<SessionCall>>>,
    link_base: String,
}

impl ScriptedSession {
    /// Create an empty session (one empty listing page).
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            calls: Arc::default(),
            link_base: "https://jobs.example.test/view".to_string(),
        }
    }

    /// Use a different base for detail links.
    pub fn with_link_base(mut self, base: impl Into<String>) -> Self {
        self.link_base = base.into();
        self
    }

    /// Append one listing page.
    pub fn with_listing_page(self, page: Vec<ItemStub>) -> Self {
        write(&self.state).listing.push(page);
        self
    }

    /// Append several listing pages.
    pub fn with_pages(self, pages: impl IntoIterator<Item = Vec<ItemStub>>) -> Self {
        write(&self.state).listing.extend(pages);
        self
    }

    /// Advancing past the last page wraps to the first, forever.
    pub fn looping(self) -> Self {
        write(&self.state).looping = true;
        self
    }

    /// The listing never becomes ready.
    pub fn with_missing_listing(self) -> Self {
        write(&self.state).missing_listing = true;
        self
    }

    /// `create_page` always fails.
    pub fn with_failing_setup(self) -> Self {
        write(&self.state).failing_setup = true;
        self
    }

    /// The strategy fails on every page.
    pub fn with_broken_strategy(self, strategy: StrategyId) -> Self {
        write(&self.state).broken_strategies.insert(strategy);
        self
    }

    /// The strategy fails when advancing from listing page `page` (1-based).
    pub fn with_strategy_failing_on(self, strategy: StrategyId, page: usize) -> Self {
        write(&self.state)
            .strategy_failures
            .entry(strategy)
            .or_default()
            .insert(page);
        self
    }

    /// Predefined detail for an id.
    pub fn with_detail(self, id: impl Into<String>, detail: ItemDetail) -> Self {
        write(&self.state).details.insert(id.into(), detail);
        self
    }

    /// Fetching this id times out.
    pub fn fail_detail(self, id: impl Into<String>) -> Self {
        write(&self.state).failing_details.insert(id.into());
        self
    }

    /// Closing any page fails.
    pub fn with_failing_closes(self) -> Self {
        write(&self.state).failing_closes = true;
        self
    }

    /// Fetching this id cancels `token` and then never completes.
    pub fn cancel_on_detail(self, id: impl Into<String>, token: CancellationToken) -> Self {
        write(&self.state).cancel_on_detail.insert(id.into(), token);
        self
    }

    /// Get all calls made to this session and its pages.
    pub fn calls(&self) -> Vec<SessionCall> {
        read(&self.calls).clone()
    }

    /// Ids whose detail was fetched, in order.
    pub fn fetched_ids(&self) -> Vec<String> {
        read(&self.calls)
            .iter()
            .filter_map(|call| match call {
                SessionCall::FetchDetail { id } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SessionCall) {
        write(&self.calls).push(call);
    }
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn create_page(&self) -> PageResult<Box<dyn PageHandle>> {
        self.record(SessionCall::CreatePage);

        if read(&self.state).failing_setup {
            return Err(PageError::Interaction("browser failed to start".to_string()));
        }

        Ok(Box::new(ScriptedPage {
            session: self.clone(),
            closed: false,
        }))
    }

    fn detail_link(&self, id: &str) -> String {
        format!("{}/{}", self.link_base, id)
    }
}

/// A page opened from a [`ScriptedSession`].
pub struct ScriptedPage {
    session: ScriptedSession,
    closed: bool,
}

impl ScriptedPage {
    fn ensure_open(&self) -> PageResult<()> {
        if self.closed {
            Err(PageError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageHandle for ScriptedPage {
    async fn wait_for_ready(&mut self, target: &ReadyTarget) -> PageResult<()> {
        self.session.record(SessionCall::WaitForReady(target.clone()));
        self.ensure_open()?;

        if *target == ReadyTarget::Listing && read(&self.session.state).missing_listing {
            return Err(PageError::Timeout {
                what: "results list".to_string(),
            });
        }
        Ok(())
    }

    async fn read_current_batch(&mut self) -> PageResult<Vec<ItemStub>> {
        self.ensure_open()?;
        let state = read(&self.session.state);
        let page = state.position + 1;
        let batch = state.listing.get(state.position).cloned().unwrap_or_default();
        drop(state);

        self.session.record(SessionCall::ReadBatch { page });
        Ok(batch)
    }

    async fn advance(&mut self, strategy: StrategyId) -> PageResult<Advance> {
        self.ensure_open()?;
        let mut state = write(&self.session.state);
        let page = state.position + 1;
        self.session.record(SessionCall::Advance { strategy, page });

        let failing = state.broken_strategies.contains(&strategy)
            || state
                .strategy_failures
                .get(&strategy)
                .is_some_and(|pages| pages.contains(&page));
        if failing {
            return Err(PageError::Interaction(format!(
                "strategy {strategy} could not reach the next page"
            )));
        }

        if page < state.listing.len() {
            state.position += 1;
            Ok(Advance::Moved)
        } else if state.looping && !state.listing.is_empty() {
            state.position = 0;
            Ok(Advance::Moved)
        } else {
            Ok(Advance::LastPage)
        }
    }

    async fn fetch_detail(&mut self, id: &str) -> PageResult<ItemDetail> {
        self.session.record(SessionCall::FetchDetail { id: id.to_string() });
        self.ensure_open()?;

        let cancel = read(&self.session.state).cancel_on_detail.get(id).cloned();
        if let Some(token) = cancel {
            token.cancel();
            std::future::pending::<()>().await;
        }

        let state = read(&self.session.state);
        if state.failing_details.contains(id) {
            return Err(PageError::Timeout {
                what: format!("detail view of {id}"),
            });
        }

        if let Some(detail) = state.details.get(id) {
            return Ok(detail.clone());
        }

        let name = state
            .listing
            .iter()
            .flatten()
            .rev()
            .find(|stub| stub.id == id)
            .map(|stub| stub.name.clone())
            .unwrap_or_else(|| format!("Listing {id}"));
        Ok(ItemDetail::new(name, format!("Full description of listing {id}")))
    }

    async fn close(&mut self) -> PageResult<()> {
        self.session.record(SessionCall::Close);
        self.ensure_open()?;
        self.closed = true;

        if read(&self.session.state).failing_closes {
            return Err(PageError::Interaction("page refused to close".to_string()));
        }
        Ok(())
    }
}

type Responder = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A mock classifier for testing.
///
/// Answers are resolved in this order: unavailable mode, queued answers,
/// substring matches, the responder closure, the default answer. With
/// none of them applying, the answer is empty.
#[derive(Default)]
pub struct MockClassifier {
    /// Answer every question with an error
    unavailable: bool,

    /// One-shot answers, consumed in order
    queued: Arc<RwLock<VecDeque<ClassifierResult<String>>>>,

    /// Answers keyed by a substring of the question
    answers: Arc<RwLock<Vec<(String, String)>>>,

    responder: Option<Responder>,

    default_answer: Option<String>,

    /// Every question asked, in order
    questions: Arc<RwLock<Vec<String>>>,
}

impl MockClassifier {
    /// Create a mock that answers nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `answer` to any question containing `needle`.
    pub fn with_answer(self, needle: impl Into<String>, answer: impl Into<String>) -> Self {
        write(&self.answers).push((needle.into(), answer.into()));
        self
    }

    /// Queue a one-shot result.
    pub fn with_queued(self, result: ClassifierResult<String>) -> Self {
        write(&self.queued).push_back(result);
        self
    }

    /// Compute answers with a closure. `None` falls through to the default.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Answer used when nothing else matches.
    pub fn with_default_answer(mut self, answer: impl Into<String>) -> Self {
        self.default_answer = Some(answer.into());
        self
    }

    /// Fail every question.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Get all questions asked so far.
    pub fn questions(&self) -> Vec<String> {
        read(&self.questions).clone()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn ask(&self, question: &str) -> ClassifierResult<String> {
        write(&self.questions).push(question.to_string());

        if self.unavailable {
            return Err(ClassifierError::Unavailable(
                "mock classifier is offline".to_string(),
            ));
        }

        if let Some(queued) = write(&self.queued).pop_front() {
            return queued;
        }

        let matched = read(&self.answers)
            .iter()
            .find(|(needle, _)| question.contains(needle.as_str()))
            .map(|(_, answer)| answer.clone());
        if let Some(answer) = matched {
            return Ok(answer);
        }

        if let Some(answer) = self.responder.as_ref().and_then(|respond| respond(question)) {
            return Ok(answer);
        }

        Ok(self.default_answer.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_session_walks_pages() {
        let session = ScriptedSession::new()
            .with_listing_page(stubs(2))
            .with_listing_page(vec![ItemStub::new("3", "Listing 3")]);

        let mut page = session.create_page().await.unwrap();
        assert_eq!(page.read_current_batch().await.unwrap().len(), 2);
        assert_eq!(page.advance(StrategyId::new(1)).await.unwrap(), Advance::Moved);
        assert_eq!(page.read_current_batch().await.unwrap()[0].id, "3");
        assert_eq!(
            page.advance(StrategyId::new(1)).await.unwrap(),
            Advance::LastPage
        );
    }

    #[tokio::test]
    async fn test_detail_defaults_to_listing_name() {
        let session = ScriptedSession::new().with_listing_page(stubs(3));
        let mut page = session.create_page().await.unwrap();

        let detail = page.fetch_detail("2").await.unwrap();
        assert_eq!(detail.name, "Listing 2");
        assert_eq!(session.fetched_ids(), vec!["2".to_string()]);
        assert_eq!(session.detail_link("2"), "https://jobs.example.test/view/2");
    }

    #[tokio::test]
    async fn test_closed_page_rejects_calls() {
        let session = ScriptedSession::new();
        let mut page = session.create_page().await.unwrap();
        page.close().await.unwrap();

        assert!(matches!(
            page.fetch_detail("1").await,
            Err(PageError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_mock_classifier_resolution_order() {
        let classifier = MockClassifier::new()
            .with_queued(Ok("queued".to_string()))
            .with_answer("needle", "matched")
            .with_default_answer("fallback");

        assert_eq!(classifier.ask("needle").await.unwrap(), "queued");
        assert_eq!(classifier.ask("a needle here").await.unwrap(), "matched");
        assert_eq!(classifier.ask("other").await.unwrap(), "fallback");
        assert_eq!(classifier.questions().len(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_classifier_errors() {
        let classifier = MockClassifier::new().unavailable();
        assert!(classifier.ask("anything").await.is_err());
    }

    #[test]
    fn test_batch_question_names() {
        let question = "profile\ninstruction:\n\"Dev, Rust\",\"Cook\"";
        assert_eq!(
            batch_question_names(question),
            Some(vec!["Dev, Rust".to_string(), "Cook".to_string()])
        );
        assert_eq!(batch_question_names("profile\nno list here."), None);
    }
}
