//! # Relay
//!
//! Forwards samples to the UI. Every invocation is queued onto the [`UiContext`] so the
//! caller, usually an MDS callback, never waits on the UI.
//!

use async_trait::async_trait;
use futures::stream::StreamExt;
use log::debug;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use std::sync::{Arc, RwLock};

/// Remote procedure receiving each ECG sample
pub const ECG_SAMPLE_METHOD: &str = "ecgSample";
/// Remote procedure receiving each heart rate value
pub const HR_SAMPLE_METHOD: &str = "hrSample";

/// UI side of the bridge. Invocations are fire and forget, no reply is awaited.
#[async_trait]
pub trait MethodChannel: Send + Sync {
    async fn invoke_method(&self, method: &str, argument: i32);
}

struct UiTask {
    channel: Arc<dyn MethodChannel>,
    method: &'static str,
    argument: i32,
}

/// Holds the registered UI channel and posts invocations to the UI context
pub struct BridgeRelay {
    channel: RwLock<Option<Arc<dyn MethodChannel>>>,
    ui: mpsc::UnboundedSender<UiTask>,
}

impl BridgeRelay {
    /// Creates a new relay with no channel registered, together with the UI context
    /// its invocations run on.
    pub fn new() -> (BridgeRelay, UiContext) {
        let (ui, rx) = mpsc::unbounded_channel();

        let relay = BridgeRelay {
            channel: RwLock::new(None),
            ui,
        };

        (relay, UiContext { tasks: UnboundedReceiverStream::new(rx) })
    }

    /// Registers the UI channel. Last writer wins.
    pub fn set_channel(&self, channel: Arc<dyn MethodChannel>) {
        let mut slot = match self.channel.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(channel);
    }

    pub fn has_channel(&self) -> bool {
        self.channel().is_some()
    }

    /// Schedules `ecgSample(value)`. Dropped if no channel is registered yet.
    pub fn send_sample(&self, value: i32) {
        self.post(ECG_SAMPLE_METHOD, value);
    }

    /// Schedules `hrSample(value)`. Dropped if no channel is registered yet.
    pub fn send_hr(&self, value: i32) {
        self.post(HR_SAMPLE_METHOD, value);
    }

    fn channel(&self) -> Option<Arc<dyn MethodChannel>> {
        match self.channel.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn post(&self, method: &'static str, argument: i32) {
        if let Some(channel) = self.channel() {
            let task = UiTask {
                channel,
                method,
                argument,
            };

            if self.ui.send(task).is_err() {
                debug!("UI context is gone, dropping {}({})", method, argument);
            }
        }
    }
}

/// The UI execution context. Runs queued invocations one at a time in submission order.
pub struct UiContext {
    tasks: UnboundedReceiverStream<UiTask>,
}

impl UiContext {
    /// Run until the relay is dropped
    pub async fn run(mut self) {
        while let Some(task) = self.tasks.next().await {
            task.channel.invoke_method(task.method, task.argument).await;
        }

        debug!("Relay dropped, UI context stopping");
    }

    /// Runs everything queued so far and returns how many invocations ran.
    pub async fn drain(&mut self) -> usize {
        let mut ran = 0;

        while let Ok(task) = self.tasks.as_mut().try_recv() {
            task.channel.invoke_method(task.method, task.argument).await;
            ran += 1;
        }

        ran
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, i32)>>,
    }

    #[async_trait]
    impl MethodChannel for Recorder {
        async fn invoke_method(&self, method: &str, argument: i32) {
            self.calls.lock().unwrap().push((method.to_string(), argument));
        }
    }

    #[tokio::test]
    async fn no_channel_is_silent() {
        let (relay, mut ui) = BridgeRelay::new();

        relay.send_sample(1);
        relay.send_hr(60);

        assert!(!relay.has_channel());
        assert_eq!(ui.drain().await, 0);
    }

    #[tokio::test]
    async fn forwards_in_order() {
        let (relay, mut ui) = BridgeRelay::new();
        let recorder = Arc::new(Recorder::default());
        relay.set_channel(recorder.clone());

        relay.send_sample(100);
        relay.send_hr(72);
        relay.send_sample(98);

        // Nothing runs until the UI context does
        assert!(recorder.calls.lock().unwrap().is_empty());
        assert_eq!(ui.drain().await, 3);

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("ecgSample".to_string(), 100),
                ("hrSample".to_string(), 72),
                ("ecgSample".to_string(), 98),
            ]
        );
    }

    #[tokio::test]
    async fn last_channel_wins() {
        let (relay, mut ui) = BridgeRelay::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        relay.set_channel(first.clone());
        relay.set_channel(second.clone());
        relay.send_hr(80);
        ui.drain().await;

        assert!(first.calls.lock().unwrap().is_empty());
        assert_eq!(second.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn send_after_ui_context_dropped() {
        let (relay, ui) = BridgeRelay::new();
        relay.set_channel(Arc::new(Recorder::default()));
        drop(ui);

        relay.send_sample(5);
    }

    #[test]
    fn drain_outside_runtime() {
        let (relay, mut ui) = BridgeRelay::new();
        let recorder = Arc::new(Recorder::default());
        relay.set_channel(recorder.clone());
        relay.send_hr(55);

        assert_eq!(tokio_test::block_on(ui.drain()), 1);
        assert_eq!(*recorder.calls.lock().unwrap(), vec![("hrSample".to_string(), 55)]);
    }

    #[tokio::test]
    async fn run_stops_when_relay_dropped() {
        let (relay, ui) = BridgeRelay::new();
        let recorder = Arc::new(Recorder::default());
        relay.set_channel(recorder.clone());
        relay.send_sample(7);
        drop(relay);

        ui.run().await;

        assert_eq!(*recorder.calls.lock().unwrap(), vec![("ecgSample".to_string(), 7)]);
    }
}
