//! Cancellation at suspension points.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{DiscoveryError, DiscoveryResult};

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn guarded<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> DiscoveryResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DiscoveryError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Sleep for `delay`, returning early with an error on cancellation.
pub(crate) async fn settle(
    cancel: &CancellationToken,
    delay: std::time::Duration,
) -> DiscoveryResult<()> {
    if delay.is_zero() {
        return check(cancel);
    }
    guarded(cancel, tokio::time::sleep(delay)).await
}

/// Fail fast if already cancelled.
pub(crate) fn check(cancel: &CancellationToken) -> DiscoveryResult<()> {
    if cancel.is_cancelled() {
        Err(DiscoveryError::Cancelled)
    } else {
        Ok(())
    }
}
