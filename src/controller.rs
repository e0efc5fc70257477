//! # Controller
//!
//! The session controller turns UI commands into MDS calls and MDS callbacks into session
//! state or samples for the relay.
//!
//! All session state lives in one [`DeviceSession`] behind one mutex, so commands and
//! callbacks arriving from different tasks see a single writer. The lock is never held
//! while calling into MDS, since MDS may call back into the controller from inside a call.
//!

use crate::command::{Command, MethodCall, MethodResult, INVALID_ARGS};
use crate::config::BridgeConfig;
use crate::mds::{ConnectionListener, Mds, MdsError, MdsSubscription, NotificationListener};
use crate::mds_uri::{subscription_contract, Resource};
use crate::relay::BridgeRelay;
use crate::response::{EcgResponse, HrResponse};
use crate::{BridgeResult, Error};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::{Mutex, MutexGuard};

use std::sync::Arc;

type Subscription = Option<Box<dyn MdsSubscription>>;

/// Connection and streaming state for the one device the bridge talks to
#[derive(Debug, Default)]
pub struct DeviceSession {
    /// Serial reported on connection complete, used in resource URIs
    serial: Option<String>,
    connected_at: Option<DateTime<Utc>>,
    ecg_subscription: Subscription,
    hr_subscription: Subscription,
}

impl DeviceSession {
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    pub fn is_connected(&self) -> bool {
        self.serial.is_some()
    }

    pub fn is_streaming_ecg(&self) -> bool {
        self.ecg_subscription.is_some()
    }

    pub fn is_streaming_hr(&self) -> bool {
        self.hr_subscription.is_some()
    }

    /// Empties both subscription slots. The handles must then go to `stop_collection`.
    fn take_subscriptions(&mut self) -> (Subscription, Subscription) {
        (self.ecg_subscription.take(), self.hr_subscription.take())
    }

    /// Forget the device. Returns the subscriptions that still have to be ended.
    fn disconnected(&mut self) -> (Subscription, Subscription) {
        self.serial = None;
        self.connected_at = None;
        self.take_subscriptions()
    }
}

/// Ends both subscriptions. Called without the session locked.
async fn stop_collection((ecg, hr): (Subscription, Subscription)) {
    unsubscribe(ecg, "ECG").await;
    unsubscribe(hr, "HR").await;
}

async fn unsubscribe(subscription: Subscription, stream: &str) {
    if let Some(subscription) = subscription {
        if let Err(why) = subscription.unsubscribe().await {
            error!("Could not unsubscribe {}: {}", stream, why);
        }
    }
}

struct Inner {
    mds: Arc<dyn Mds>,
    relay: Arc<BridgeRelay>,
    config: BridgeConfig,
    session: Mutex<DeviceSession>,
}

/// Handles UI commands and listens to MDS connection events.
///
/// ## Example
///
/// ```rust,no_run
/// # use movesense_bridge::*;
/// # use std::sync::Arc;
/// # async fn run(mds: Arc<dyn Mds>, relay: Arc<BridgeRelay>) {
/// let controller = SessionController::new(mds, relay, BridgeConfig::default());
///
/// // Returns as soon as the request is issued, the session fills in on connection complete
/// controller.handle(MethodCall::new("connect").arg("address", "0C:8C:DC:3F:B2:CD")).await;
///
/// // Later, once connected
/// controller.handle(MethodCall::new("startECG").arg("sampleRate", 250)).await;
/// # }
/// ```
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(
        mds: Arc<dyn Mds>,
        relay: Arc<BridgeRelay>,
        config: BridgeConfig,
    ) -> SessionController {
        SessionController {
            inner: Arc::new(Inner {
                mds,
                relay,
                config,
                session: Mutex::new(DeviceSession::default()),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Handle one method call from the UI and produce its reply
    pub async fn handle(&self, call: MethodCall) -> MethodResult {
        let command = match Command::parse(&call) {
            Ok(command) => command,
            Err(why) => {
                warn!("Rejecting {}: {}", call.method, why);
                return MethodResult::error(INVALID_ARGS, why.to_string());
            }
        };

        match command {
            Command::Connect { address } => {
                self.connect(&address).await;
                MethodResult::Success
            }
            Command::Disconnect { address } => self.disconnect(address.as_deref()).await,
            Command::StartEcg { sample_rate } => {
                let sample_rate = sample_rate.unwrap_or(self.inner.config.default_sample_rate);
                // Reported as success either way, the failure is only logged
                let _ = self.start_streaming(sample_rate).await;
                MethodResult::Success
            }
            Command::StopEcg => {
                self.stop_streaming().await;
                MethodResult::Success
            }
            Command::Unknown(method) => {
                debug!("Method not implemented: {}", method);
                MethodResult::NotImplemented
            }
        }
    }

    /// Ask MDS to connect. Completion arrives later through [`ConnectionListener`].
    pub async fn connect(&self, address: &str) {
        info!("Connecting to: {}", address);

        let listener: Arc<dyn ConnectionListener> = self.inner.clone();
        self.inner.mds.connect(address, listener).await;
    }

    /// Ask MDS to disconnect the device at `address` and end the session right away. The
    /// `on_disconnect` that MDS sends later finds nothing left to tear down.
    ///
    /// MDS disconnects by BLE address, which the session does not know. Without an
    /// address nothing is sent; the call is answered with success if a device is
    /// connected and left unanswered otherwise.
    pub async fn disconnect(&self, address: Option<&str>) -> MethodResult {
        let address = match address {
            Some(address) => address,
            None => {
                let session = self.inner.session.lock().await;
                return match session.serial() {
                    Some(serial) => {
                        warn!("Disconnect without address, {} stays connected", serial);
                        MethodResult::Success
                    }
                    None => MethodResult::NoReply,
                };
            }
        };

        info!("Disconnecting: {}", address);
        self.inner.mds.disconnect(address).await;

        let subscriptions = self.inner.session.lock().await.disconnected();
        stop_collection(subscriptions).await;

        MethodResult::Success
    }

    /// Replace any running streams with ECG at `sample_rate` plus heart rate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if no device has completed connection, or if the
    /// device went away while subscribing. Nothing stays subscribed in that case.
    pub async fn start_streaming(&self, sample_rate: u32) -> BridgeResult<()> {
        let (serial, previous) = {
            let mut session = self.inner.session.lock().await;

            match session.serial.clone() {
                Some(serial) => (serial, session.take_subscriptions()),
                None => {
                    error!("Cannot start ECG: No device connected");
                    return Err(Error::NotConnected);
                }
            }
        };

        stop_collection(previous).await;

        let ecg = EcgListener {
            relay: self.inner.relay.clone(),
        };
        let ecg = self
            .subscribe(&serial, Resource::Ecg { sample_rate }, Arc::new(ecg))
            .await;

        let hr = HrListener {
            relay: self.inner.relay.clone(),
        };
        let hr = self.subscribe(&serial, Resource::HeartRate, Arc::new(hr)).await;

        let (stale, gone) = {
            let mut session = self.inner.session.lock().await;

            if session.serial() != Some(serial.as_str()) {
                warn!("{} disconnected while subscribing", serial);
                ((ecg, hr), true)
            } else {
                // A concurrent start may have filled the slots meanwhile
                let stale = session.take_subscriptions();
                session.ecg_subscription = ecg;
                session.hr_subscription = hr;
                (stale, false)
            }
        };

        stop_collection(stale).await;

        if gone {
            return Err(Error::NotConnected);
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        serial: &str,
        resource: Resource,
        listener: Arc<dyn NotificationListener>,
    ) -> Subscription {
        let contract = match subscription_contract(serial, resource) {
            Ok(contract) => contract,
            Err(why) => {
                error!("Could not build contract for {:?}: {}", resource, why);
                return None;
            }
        };
        debug!("Subscribing to: {}", contract);

        match self
            .inner
            .mds
            .subscribe(&self.inner.config.event_listener_uri, &contract, listener)
            .await
        {
            Ok(subscription) => Some(subscription),
            Err(why) => {
                error!("Could not subscribe to {}: {}", contract, why);
                None
            }
        }
    }

    /// Unsubscribe ECG and heart rate. Does nothing if neither is running.
    pub async fn stop_streaming(&self) {
        let subscriptions = self.inner.session.lock().await.take_subscriptions();
        stop_collection(subscriptions).await;
    }

    /// Locks the session for inspection. Commands and callbacks wait while the guard lives.
    pub async fn session(&self) -> MutexGuard<'_, DeviceSession> {
        self.inner.session.lock().await
    }

    /// Serial of the connected device
    pub async fn connected_serial(&self) -> Option<String> {
        self.inner.session.lock().await.serial.clone()
    }

    /// Whether the ECG and heart rate subscriptions are active
    pub async fn streaming(&self) -> (bool, bool) {
        let session = self.inner.session.lock().await;
        (session.is_streaming_ecg(), session.is_streaming_hr())
    }
}

#[async_trait]
impl ConnectionListener for Inner {
    async fn on_connect(&self, address: &str) {
        debug!("onConnect: {}", address);
    }

    async fn on_connection_complete(&self, address: &str, serial: &str) {
        info!("Connection complete: {} ({})", serial, address);

        let mut session = self.session.lock().await;
        session.serial = Some(serial.to_string());
        session.connected_at = Some(Utc::now());
    }

    // Not forwarded to the UI
    async fn on_error(&self, error: MdsError) {
        error!("Connection Error: {}", error);
    }

    async fn on_disconnect(&self, address: &str) {
        let subscriptions = {
            let mut session = self.session.lock().await;

            match session.connected_at {
                Some(since) => info!(
                    "onDisconnect: {} after {}s",
                    address,
                    (Utc::now() - since).num_seconds()
                ),
                None => info!("onDisconnect: {}", address),
            }

            session.disconnected()
        };

        stop_collection(subscriptions).await;
    }
}

/// Forwards every sample of an ECG notification
struct EcgListener {
    relay: Arc<BridgeRelay>,
}

#[async_trait]
impl NotificationListener for EcgListener {
    async fn on_notification(&self, data: &str) {
        match EcgResponse::new(data) {
            Ok(response) => {
                for sample in response.samples() {
                    self.relay.send_sample(*sample);
                }
            }
            Err(why) => debug!("Dropping ECG notification: {}", why),
        }
    }

    async fn on_error(&self, error: MdsError) {
        error!("ECG Subscription Error: {}", error);
    }
}

/// Forwards the average of a heart rate notification
struct HrListener {
    relay: Arc<BridgeRelay>,
}

#[async_trait]
impl NotificationListener for HrListener {
    async fn on_notification(&self, data: &str) {
        match HrResponse::new(data) {
            Ok(response) => self.relay.send_hr(response.bpm()),
            Err(why) => debug!("Dropping HR notification: {}", why),
        }
    }

    async fn on_error(&self, error: MdsError) {
        error!("HR Subscription Error: {}", error);
    }
}
