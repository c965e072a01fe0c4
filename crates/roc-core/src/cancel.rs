//! Cooperative cancellation helpers.
//!
//! Every suspension point in a state or a spawn loop is wrapped in
//! [`guard`] (or [`sleep`]), which races the work against the scope's
//! token. Cancellation is checked first, so work that becomes ready in the
//! same poll as the cancellation is still discarded.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// The scope a suspended operation belonged to was cancelled.
///
/// This is the expected outcome of a superseded transition or a stopped
/// spawn loop, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Run `work` until it completes or `token` is cancelled.
///
/// Returns [`Cancelled`] without polling `work` when the token is already
/// cancelled. Dropping `work` on cancellation releases whatever it held.
pub async fn guard<F>(token: &CancellationToken, work: F) -> Result<F::Output, Cancelled>
where
    F: Future,
{
    if token.is_cancelled() {
        return Err(Cancelled);
    }
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Cancelled),
        output = work => Ok(output),
    }
}

/// Wait for `duration` unless `token` is cancelled first.
pub async fn sleep(token: &CancellationToken, duration: Duration) -> Result<(), Cancelled> {
    guard(token, tokio::time::sleep(duration)).await
}

/// Fail fast when `token` has already been cancelled.
pub fn checkpoint(token: &CancellationToken) -> Result<(), Cancelled> {
    if token.is_cancelled() {
        Err(Cancelled)
    } else {
        Ok(())
    }
}
