//! Page session traits.
//!
//! A site adapter implements these on top of its browser driver. The
//! pipeline never sees selectors or DOM; it only asks for readiness,
//! batches, page turns and details.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PageResult;
use crate::pagination::StrategyId;
use crate::types::item::{ItemDetail, ItemStub};

/// What a readiness wait is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadyTarget {
    /// The results list of the current batch
    Listing,

    /// The paging control a given advance strategy relies on
    Pager(StrategyId),

    /// The detail view of one listing
    Detail(String),
}

/// Result of one advance attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next batch
    Moved,

    /// The paging control shows no further batch
    LastPage,
}

/// Factory for pages, owned by one pipeline run.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Open a fresh page.
    async fn create_page(&self) -> PageResult<Box<dyn PageHandle>>;

    /// Public link for a listing id.
    ///
    /// Synchronous so failed and rejected items can still carry a link.
    fn detail_link(&self, id: &str) -> String;
}

/// One open page.
#[async_trait]
pub trait PageHandle: Send {
    /// Block until `target` is present and stable.
    async fn wait_for_ready(&mut self, target: &ReadyTarget) -> PageResult<()>;

    /// Read every stub in the currently loaded batch, in display order.
    async fn read_current_batch(&mut self) -> PageResult<Vec<ItemStub>>;

    /// Try to load the next batch with the given strategy.
    ///
    /// An `Err` means the strategy itself did not work; reaching the end
    /// of the results is `Ok(Advance::LastPage)`.
    async fn advance(&mut self, strategy: StrategyId) -> PageResult<Advance>;

    /// Load the full detail for a listing.
    async fn fetch_detail(&mut self, id: &str) -> PageResult<ItemDetail>;

    /// Close the page.
    async fn close(&mut self) -> PageResult<()>;
}

#[async_trait]
impl<T: PageSession + ?Sized> PageSession for Arc<T> {
    async fn create_page(&self) -> PageResult<Box<dyn PageHandle>> {
        (**self).create_page().await
    }

    fn detail_link(&self, id: &str) -> String {
        (**self).detail_link(id)
    }
}

#[async_trait]
impl<T: PageSession + ?Sized> PageSession for Box<T> {
    async fn create_page(&self) -> PageResult<Box<dyn PageHandle>> {
        (**self).create_page().await
    }

    fn detail_link(&self, id: &str) -> String {
        (**self).detail_link(id)
    }
}
