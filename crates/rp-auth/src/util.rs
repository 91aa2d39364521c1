//! Small shared helpers

use rp_types::{AppError, AppResult};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Cancellable sleep. Every fixed delay in the flows goes through here so a
/// caller can abort a stuck attempt without killing the process.
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> AppResult<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
