//! Pagination traversal engine.
//!
//! Walks a paginated (or "load more") result set through a [`PageHandle`],
//! collecting every batch of stubs in discovery order. Page turns go
//! through an ordered list of advance strategies; the one that last worked
//! is tried first on the next page so known-broken strategies are not
//! re-probed on every page.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cancel::{guarded, settle};
use crate::error::{DiscoveryError, DiscoveryResult, PageResult, StrategyFailure};
use crate::progress::{ProgressEvent, ProgressFeed};
use crate::traits::session::{Advance, PageHandle, ReadyTarget};
use crate::types::config::PipelineConfig;
use crate::types::item::ItemStub;

/// 1-based number of an advance strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrategyId(usize);

impl StrategyId {
    pub fn new(number: usize) -> Self {
        Self(number.max(1))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sticky strategy choice for one traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyCursor {
    count: usize,
    preferred: usize,
}

impl StrategyCursor {
    pub fn new(count: usize) -> Self {
        Self {
            count: count.max(1),
            preferred: 0,
        }
    }

    /// Strategy tried first on the next advance.
    pub fn preferred(&self) -> StrategyId {
        StrategyId(self.preferred + 1)
    }

    /// Attempt order for one advance: the preferred strategy, the ones
    /// after it, then wrapping round to those before it.
    pub fn attempt_order(&self) -> Vec<StrategyId> {
        (0..self.count)
            .map(|offset| StrategyId((self.preferred + offset) % self.count + 1))
            .collect()
    }

    pub fn record_success(&mut self, strategy: StrategyId) {
        if (1..=self.count).contains(&strategy.get()) {
            self.preferred = strategy.get() - 1;
        }
    }
}

/// Traversal policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalOptions {
    pub strategy_count: usize,
    pub settle_delay: Duration,
    pub max_pages: Option<usize>,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for TraversalOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            strategy_count: config.strategy_count,
            settle_delay: config.settle_delay(),
            max_pages: config.max_pages,
        }
    }
}

/// Why a traversal stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalEnd {
    /// The paging control reported no further batch
    LastPage,

    /// The configured page cap was hit first
    PageCap,
}

/// Everything a traversal gathered.
#[derive(Debug, Clone)]
pub struct Traversal {
    pub stubs: Vec<ItemStub>,
    pub pages: usize,
    pub end: TraversalEnd,
}

/// Pagination engine. One instance per run; it owns the sticky cursor.
pub struct Paginator {
    options: TraversalOptions,
    cursor: StrategyCursor,
    cancel: CancellationToken,
    progress: Option<ProgressFeed>,
}

impl Paginator {
    pub fn new(options: TraversalOptions) -> Self {
        Self {
            cursor: StrategyCursor::new(options.strategy_count),
            options,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFeed) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn cursor(&self) -> &StrategyCursor {
        &self.cursor
    }

    /// Collect every batch until the last page (or the page cap).
    pub async fn traverse(&mut self, page: &mut dyn PageHandle) -> DiscoveryResult<Traversal> {
        let mut stubs: Vec<ItemStub> = Vec::new();
        let mut page_number = 0;

        let end = loop {
            page_number += 1;

            guarded(&self.cancel, page.wait_for_ready(&ReadyTarget::Listing))
                .await?
                .map_err(|source| DiscoveryError::Listing {
                    page: page_number,
                    source,
                })?;

            settle(&self.cancel, self.options.settle_delay).await?;

            let batch = guarded(&self.cancel, page.read_current_batch())
                .await?
                .map_err(|source| DiscoveryError::Listing {
                    page: page_number,
                    source,
                })?;

            let found = batch.len();
            info!(page = page_number, found, "Gathered listings");
            stubs.extend(batch);

            if let Some(progress) = &self.progress {
                progress.publish(ProgressEvent::PageGathered {
                    page: page_number,
                    found,
                    total: stubs.len(),
                });
            }

            if self.options.max_pages.is_some_and(|cap| page_number >= cap) {
                warn!(page = page_number, "Page cap reached, stopping traversal");
                break TraversalEnd::PageCap;
            }

            match self.advance(page, page_number, stubs.len()).await? {
                Advance::Moved => continue,
                Advance::LastPage => break TraversalEnd::LastPage,
            }
        };

        Ok(Traversal {
            stubs,
            pages: page_number,
            end,
        })
    }

    /// Turn to the next batch, falling back through the strategies.
    pub async fn advance(
        &mut self,
        page: &mut dyn PageHandle,
        page_number: usize,
        gathered: usize,
    ) -> DiscoveryResult<Advance> {
        let preferred = self.cursor.preferred();
        let mut failures = Vec::new();

        for strategy in self.cursor.attempt_order() {
            debug!(page = page_number, %strategy, "Trying advance strategy");

            match self.attempt(page, strategy).await? {
                Ok(advance) => {
                    if strategy != preferred {
                        info!(from = %preferred, to = %strategy, "Switching advance strategy");
                    }
                    self.cursor.record_success(strategy);
                    return Ok(advance);
                }
                Err(e) => {
                    warn!(page = page_number, %strategy, error = %e, "Advance strategy failed");
                    failures.push(StrategyFailure {
                        strategy,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(DiscoveryError::TraversalExhausted {
            page: page_number,
            gathered,
            failures,
        })
    }

    async fn attempt(
        &self,
        page: &mut dyn PageHandle,
        strategy: StrategyId,
    ) -> DiscoveryResult<PageResult<Advance>> {
        let ready = guarded(&self.cancel, page.wait_for_ready(&ReadyTarget::Pager(strategy))).await?;
        if let Err(e) = ready {
            return Ok(Err(e));
        }
        guarded(&self.cancel, page.advance(strategy)).await
    }
}
