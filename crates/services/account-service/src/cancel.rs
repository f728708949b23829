//! Cancellation and deadline support for storage calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{AppError, AppResult};

/// Run a storage operation unless the token fires first.
///
/// An already-cancelled token fails before the operation is polled, so
/// nothing reaches the backend. A token cancelled mid-flight drops the
/// in-flight future and returns [`AppError::Cancelled`].
pub async fn run_cancellable<T, F>(
    cancel: &CancellationToken,
    operation: &'static str,
    fut: F,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(AppError::cancelled(operation));
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AppError::cancelled(operation)),
        result = fut => result,
    }
}

/// Token that cancels itself once `timeout` has elapsed.
///
/// Must be called from within a tokio runtime.
pub fn cancel_after(timeout: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let timer = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            () = timer.cancelled() => {}
            () = tokio::time::sleep(timeout) => timer.cancel(),
        }
    });

    token
}
