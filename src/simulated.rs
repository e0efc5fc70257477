//! In-process MDS simulator
//!
//! Stands in for the MDS SDK so the bridge can run without a device. Connection events and
//! notifications are scripted by the caller.

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use tokio::sync::Mutex;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::mds::{
    ConnectionListener, Mds, MdsError, MdsResult, MdsSubscription, NotificationListener,
};

#[derive(Deserialize)]
struct Contract {
    #[serde(rename = "Uri")]
    uri: String,
}

#[derive(Default)]
struct SimState {
    /// Listener per BLE address with a connect in progress or done
    connections: BTreeMap<String, Arc<dyn ConnectionListener>>,
    /// Active subscriptions by id, ids increase with creation order
    subscriptions: BTreeMap<u64, (String, Arc<dyn NotificationListener>)>,
    next_id: u64,
    connect_requests: Vec<String>,
    disconnect_requests: Vec<String>,
    fail_subscribe: bool,
    fail_unsubscribe: bool,
}

/// A fake MDS. Clones share the same state.
#[derive(Clone, Default)]
pub struct SimulatedMds {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedMds {
    pub fn new() -> SimulatedMds {
        SimulatedMds::default()
    }

    /// Complete the connection to `address`, reporting `serial`. Returns false if nothing
    /// asked to connect to `address`.
    pub async fn complete_connection(&self, address: &str, serial: &str) -> bool {
        match self.listener(address).await {
            Some(listener) => {
                listener.on_connection_complete(address, serial).await;
                true
            }
            None => false,
        }
    }

    /// Report a connection error for `address`
    pub async fn fail_connection(&self, address: &str, error: MdsError) -> bool {
        match self.listener(address).await {
            Some(listener) => {
                listener.on_error(error).await;
                true
            }
            None => false,
        }
    }

    /// Lose the link to `address` as if the device went out of range
    pub async fn drop_connection(&self, address: &str) -> bool {
        let listener = self.state.lock().await.connections.remove(address);

        match listener {
            Some(listener) => {
                listener.on_disconnect(address).await;
                true
            }
            None => false,
        }
    }

    /// Deliver `payload` to every subscription whose resource ends with `resource`, e.g.
    /// `"/Meas/HR"`. Returns the number of subscriptions notified.
    pub async fn notify(&self, resource: &str, payload: &str) -> usize {
        let listeners = self.matching(resource).await;

        for listener in &listeners {
            listener.on_notification(payload).await;
        }

        listeners.len()
    }

    /// Report a subscription error to every subscription matching `resource`
    pub async fn subscription_error(&self, resource: &str, error: MdsError) -> usize {
        let listeners = self.matching(resource).await;

        for listener in &listeners {
            listener.on_error(error.clone()).await;
        }

        listeners.len()
    }

    /// Resources currently subscribed, oldest first
    pub async fn active_subscriptions(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .subscriptions
            .values()
            .map(|(resource, _)| resource.clone())
            .collect()
    }

    pub async fn connect_requests(&self) -> Vec<String> {
        self.state.lock().await.connect_requests.clone()
    }

    pub async fn disconnect_requests(&self) -> Vec<String> {
        self.state.lock().await.disconnect_requests.clone()
    }

    /// Make every following `subscribe` fail
    pub async fn set_fail_subscribe(&self, fail: bool) {
        self.state.lock().await.fail_subscribe = fail;
    }

    /// Make every following `unsubscribe` fail. The subscription stays active on the device.
    pub async fn set_fail_unsubscribe(&self, fail: bool) {
        self.state.lock().await.fail_unsubscribe = fail;
    }

    async fn listener(&self, address: &str) -> Option<Arc<dyn ConnectionListener>> {
        self.state.lock().await.connections.get(address).cloned()
    }

    // Listeners are collected first so none is called with the state locked
    async fn matching(&self, resource: &str) -> Vec<Arc<dyn NotificationListener>> {
        self.state
            .lock()
            .await
            .subscriptions
            .values()
            .filter(|(subscribed, _)| subscribed.ends_with(resource))
            .map(|(_, listener)| listener.clone())
            .collect()
    }
}

#[async_trait]
impl Mds for SimulatedMds {
    async fn connect(&self, address: &str, listener: Arc<dyn ConnectionListener>) {
        {
            let mut state = self.state.lock().await;
            state.connect_requests.push(address.to_string());
            state.connections.insert(address.to_string(), listener.clone());
        }

        listener.on_connect(address).await;
    }

    async fn disconnect(&self, address: &str) {
        let listener = {
            let mut state = self.state.lock().await;
            state.disconnect_requests.push(address.to_string());
            state.connections.remove(address)
        };

        if let Some(listener) = listener {
            listener.on_disconnect(address).await;
        }
    }

    async fn subscribe(
        &self,
        uri: &str,
        contract: &str,
        listener: Arc<dyn NotificationListener>,
    ) -> MdsResult<Box<dyn MdsSubscription>> {
        let contract: Contract =
            serde_json::from_str(contract).map_err(|why| MdsError::new(400, why.to_string()))?;

        let mut state = self.state.lock().await;
        if state.fail_subscribe {
            return Err(MdsError::new(404, format!("{} not found", contract.uri)));
        }

        let id = state.next_id;
        state.next_id += 1;
        debug!("Simulated subscribe {} via {}", contract.uri, uri);
        state.subscriptions.insert(id, (contract.uri, listener));

        Ok(Box::new(SimSubscription {
            id,
            state: self.state.clone(),
        }))
    }
}

struct SimSubscription {
    id: u64,
    state: Arc<Mutex<SimState>>,
}

#[async_trait]
impl MdsSubscription for SimSubscription {
    async fn unsubscribe(self: Box<Self>) -> MdsResult<()> {
        let mut state = self.state.lock().await;
        if state.fail_unsubscribe {
            return Err(MdsError::new(503, "Service Unavailable"));
        }

        state.subscriptions.remove(&self.id);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Count(Mutex<usize>);

    #[async_trait]
    impl NotificationListener for Count {
        async fn on_notification(&self, _data: &str) {
            *self.0.lock().await += 1;
        }
    }

    #[tokio::test]
    async fn notify_matches_suffix() {
        let mds = SimulatedMds::new();
        let count = Arc::new(Count(Mutex::new(0)));

        let subscription = mds
            .subscribe("suunto://MDS/EventListener", r#"{"Uri": "1234/Meas/HR"}"#, count.clone())
            .await
            .unwrap();

        assert_eq!(mds.notify("/Meas/HR", "{}").await, 1);
        assert_eq!(mds.notify("/Meas/ECG/125", "{}").await, 0);
        assert_eq!(*count.0.lock().await, 1);

        subscription.unsubscribe().await.unwrap();
        assert_eq!(mds.notify("/Meas/HR", "{}").await, 0);
    }

    #[tokio::test]
    async fn bad_contract() {
        let mds = SimulatedMds::new();
        let count = Arc::new(Count(Mutex::new(0)));

        let result = mds.subscribe("suunto://MDS/EventListener", "1234/Meas/HR", count).await;

        assert_eq!(result.unwrap_err().status(), 400);
    }

    #[test]
    fn unknown_address() {
        let mds = SimulatedMds::new();

        assert!(!tokio_test::block_on(mds.complete_connection("00:00:00:00:00:00", "1")));
        assert!(!tokio_test::block_on(mds.drop_connection("00:00:00:00:00:00")));
        assert!(tokio_test::block_on(mds.connect_requests()).is_empty());
    }
}
