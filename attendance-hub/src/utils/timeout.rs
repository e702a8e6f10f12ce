//! Bounded waits for external I/O.

use std::future::Future;
use std::time::Duration;

use crate::{Error, Result};

/// Await `fut`, failing with `Error::Timeout` once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: operation.to_string(),
            after_ms: limit.as_millis() as u64,
        }),
    }
}
