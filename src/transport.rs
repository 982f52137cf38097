//! Seam between the power control logic and the wireless stack.
//!
//! [`Transport`] hands out exclusively owned [`Link`]s. Callers release a link
//! with [`Link::disconnect`] on every exit path; a link is never shared between
//! concurrent operations.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::TransportError;

/// One advertisement seen during a scan pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceAdvertisement {
    pub address: String,
    pub name: Option<String>,
}

impl DeviceAdvertisement {
    pub fn has_name_prefix(&self, prefix: &str) -> bool {
        self.name.as_deref().is_some_and(|name| name.starts_with(prefix))
    }
}

/// A primary service and the characteristics it exposes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteService {
    pub uuid: Uuid,
    pub characteristics: Vec<Uuid>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    type Link: Link;

    /// Runs one finite scan pass.
    async fn scan(&self) -> Result<Vec<DeviceAdvertisement>, TransportError>;

    /// Makes the given addresses connectable, typically by scanning once for
    /// all of them. Called before a batch of concurrent connects so that no
    /// single connect has to drive the radio on its own.
    async fn prepare(&self, _addresses: &[String], _timeout: Duration) -> Result<(), TransportError> {
        Ok(())
    }

    /// Opens a connection to `address`. The implementation owns the deadline:
    /// it gives up after `timeout` and releases anything it half opened before
    /// returning, so callers must not cancel this future from outside.
    async fn connect(&self, address: &str, timeout: Duration)
    -> Result<Self::Link, TransportError>;
}

#[async_trait]
pub trait Link: Send + Sync {
    async fn services(&self) -> Result<Vec<RemoteService>, TransportError>;

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, TransportError>;

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Applies the per-operation timeout to a transport call.
pub async fn bounded<T, F>(timeout: Duration, operation: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
}

/// Like [`bounded`], but runs `cleanup` when `operation` fails or runs out of
/// time, before the error is returned.
pub async fn bounded_or_cleanup<T, F, C, CF>(
    timeout: Duration,
    operation: F,
    cleanup: C,
) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
    C: FnOnce() -> CF,
    CF: Future<Output = ()>,
{
    match bounded(timeout, operation).await {
        Ok(value) => Ok(value),
        Err(err) => {
            cleanup().await;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_prefix() {
        let advertisement = DeviceAdvertisement {
            address: "AA:BB:CC:DD:EE:FF".to_string(),
            name: Some("LHB-1234ABCD".to_string()),
        };
        assert!(advertisement.has_name_prefix("LHB-"));
        assert!(!advertisement.has_name_prefix("HTC BS"));

        let unnamed = DeviceAdvertisement {
            name: None,
            ..advertisement
        };
        assert!(!unnamed.has_name_prefix("LHB-"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result: Result<(), _> = bounded(Duration::from_secs(4), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_runs_after_timeout() {
        let cleaned = std::cell::Cell::new(false);
        let flag = &cleaned;
        let result: Result<(), _> = bounded_or_cleanup(
            Duration::from_secs(4),
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            },
            move || async move { flag.set(true) },
        )
        .await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
        assert!(cleaned.get());
    }

    #[tokio::test]
    async fn test_cleanup_skipped_on_success() {
        let cleaned = std::cell::Cell::new(false);
        let flag = &cleaned;
        let result = bounded_or_cleanup(
            Duration::from_secs(4),
            async { Ok(1) },
            move || async move { flag.set(true) },
        )
        .await;
        assert_eq!(result.ok(), Some(1));
        assert!(!cleaned.get());
    }

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let result = bounded(Duration::from_secs(4), async { Ok(7) }).await;
        assert_eq!(result.ok(), Some(7));
    }
}
