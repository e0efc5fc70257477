//! # Mds
//!
//! Capability traits for the Movesense MDS SDK. The SDK owns the BLE link, so the bridge
//! only ever talks to it through these calls and receives results through the listeners.
//!

use async_trait::async_trait;

use std::fmt;
use std::sync::Arc;

/// Error reported by MDS through an `on_error` callback or a failed call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status {status}: {message}")]
pub struct MdsError {
    status: u16,
    message: String,
}

impl MdsError {
    /// Create new `MdsError`
    pub fn new(status: u16, message: impl Into<String>) -> MdsError {
        MdsError {
            status,
            message: message.into(),
        }
    }

    /// Status code as reported by the device or SDK
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for MDS calls
pub type MdsResult<T> = std::result::Result<T, MdsError>;

/// Connection events for one `connect` call.
#[async_trait]
pub trait ConnectionListener: Send + Sync {
    /// BLE link is up, device not yet usable.
    async fn on_connect(&self, _address: &str) {}

    /// Device is ready. `serial` is the identifier used in resource URIs.
    async fn on_connection_complete(&self, _address: &str, _serial: &str) {}

    async fn on_error(&self, _error: MdsError) {}

    async fn on_disconnect(&self, _address: &str) {}
}

/// Events for one subscription
#[async_trait]
pub trait NotificationListener: Send + Sync {
    /// Dispatched for every notification. Contains the raw JSON payload.
    async fn on_notification(&self, data: &str);

    async fn on_error(&self, _error: MdsError) {}
}

/// Handle to an active subscription
#[async_trait]
pub trait MdsSubscription: Send + Sync {
    /// Ends the subscription. The handle is spent whether or not this succeeds.
    async fn unsubscribe(self: Box<Self>) -> MdsResult<()>;
}

impl fmt::Debug for dyn MdsSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MdsSubscription")
    }
}

/// The calls the bridge makes into MDS.
///
/// `connect` and `disconnect` return as soon as the request is issued; completion is
/// reported through the [`ConnectionListener`].
#[async_trait]
pub trait Mds: Send + Sync {
    async fn connect(&self, address: &str, listener: Arc<dyn ConnectionListener>);

    async fn disconnect(&self, address: &str);

    /// Subscribes `listener` to the resource named by `contract` through the event
    /// listener at `uri`.
    async fn subscribe(
        &self,
        uri: &str,
        contract: &str,
        listener: Arc<dyn NotificationListener>,
    ) -> MdsResult<Box<dyn MdsSubscription>>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mds_error_display() {
        let error = MdsError::new(404, "Not Found");

        assert_eq!(error.status(), 404);
        assert_eq!(error.message(), "Not Found");
        assert_eq!(error.to_string(), "status 404: Not Found");
    }
}
