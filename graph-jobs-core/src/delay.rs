//! Abortable delay between poll attempts.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Cancelled;

/// Sleeps for `duration` unless `cancel` fires first.
///
/// An already-cancelled token fails without starting the timer. The cancellation
/// listener is the `cancelled()` future, dropped on whichever branch completes first.
pub async fn abortable_sleep(
    duration: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<(), Cancelled> {
    let Some(token) = cancel else {
        tokio::time::sleep(duration).await;
        return Ok(());
    };
    if token.is_cancelled() {
        return Err(Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
