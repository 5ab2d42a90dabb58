pub mod admin;
pub mod auth;
pub mod bookings;
pub mod extract;
pub mod health;
pub mod services;
pub mod users;
pub mod vehicles;

use crate::errors::{AppError, AppResult};

/// Runs bcrypt work on the blocking pool. Callers must not hold the
/// database guard across this await.
pub(crate) async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("blocking task failed: {e}")))?
}
