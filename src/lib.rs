//! movesense-bridge relays ECG and heart rate data from Movesense devices to a UI layer
//! The device side is reached through the MDS SDK, abstracted here as the [`Mds`] trait
//!
//! ## Usage
//!
//! Example of how to wire the relay and controller together against a fake device
//!
//! ```rust,no_run
//! use movesense_bridge::{
//!     async_trait, BridgeConfig, BridgeRelay, MethodCall, MethodChannel, SessionController,
//!     SimulatedMds,
//! };
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl MethodChannel for Printer {
//!     // Receives every `ecgSample` and `hrSample` invocation on the UI context
//!     async fn invoke_method(&self, method: &str, argument: i32) {
//!         println!("{}: {}", method, argument);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     // The relay hands back the UI context that must be driven somewhere
//!     let (relay, ui) = BridgeRelay::new();
//!     let relay = Arc::new(relay);
//!     relay.set_channel(Arc::new(Printer));
//!     tokio::spawn(ui.run());
//!
//!     let mds = Arc::new(SimulatedMds::new());
//!     let controller = SessionController::new(mds.clone(), relay, BridgeConfig::default());
//!
//!     let reply = controller
//!         .handle(MethodCall::new("connect").arg("address", "0C:8C:DC:3F:B2:CD"))
//!         .await;
//!     println!("connect: {:?}", reply);
//! }
//! ```

pub use async_trait::async_trait;

mod command;
mod config;
mod controller;
mod mds;
mod mds_uri;
mod relay;
mod response;
mod simulated;

pub use command::{Command, MethodCall, MethodResult, INVALID_ARGS};
pub use config::{BridgeConfig, DEFAULT_CHANNEL, DEFAULT_SAMPLE_RATE};
pub use controller::{DeviceSession, SessionController};
pub use mds::{
    ConnectionListener, Mds, MdsError, MdsResult, MdsSubscription, NotificationListener,
};
pub use mds_uri::{
    subscription_contract, Resource, SCHEME_PREFIX, URI_ECG_ROOT, URI_EVENTLISTENER, URI_HR,
};
pub use relay::{BridgeRelay, MethodChannel, UiContext, ECG_SAMPLE_METHOD, HR_SAMPLE_METHOD};
pub use response::{EcgBody, EcgResponse, HrBody, HrResponse};
pub use simulated::SimulatedMds;

/// Error type for command, session and payload errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A command was missing a required argument
    #[error("{0}")]
    InvalidArgs(String),
    /// An operation needed a connected device but there was none
    #[error("no device connected")]
    NotConnected,
    /// Notification payload from the device could not be parsed
    #[error("invalid notification data: {0}")]
    InvalidData(#[from] serde_json::Error),
}

/// Result simplification type
pub type BridgeResult<T> = std::result::Result<T, Error>;
