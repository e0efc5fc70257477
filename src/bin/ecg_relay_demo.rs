// Streams scripted ECG and heart rate data through the bridge and prints what the UI receives
//
// Settings can be overridden with BRIDGE_CONFIG, e.g. BRIDGE_CONFIG='{"defaultSampleRate": 250}'

use log::info;
use movesense_bridge::{
    async_trait, BridgeConfig, BridgeRelay, MethodCall, MethodChannel, SessionController,
    SimulatedMds,
};
use std::env;
use std::sync::Arc;
use tokio::time::{self, Duration};

const ADDRESS: &str = "0C:8C:DC:3F:B2:CD";
const SERIAL: &str = "210630000366";

struct Printer;

#[async_trait]
impl MethodChannel for Printer {
    async fn invoke_method(&self, method: &str, argument: i32) {
        println!("{}: {}", method, argument);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match env::var("BRIDGE_CONFIG") {
        Ok(json) => BridgeConfig::from_json(&json)?,
        Err(_) => BridgeConfig::default(),
    };

    let (relay, ui) = BridgeRelay::new();
    let relay = Arc::new(relay);
    relay.set_channel(Arc::new(Printer));
    info!("Registered channel {}", config.channel_name);
    let ui_task = tokio::spawn(ui.run());

    let mds = Arc::new(SimulatedMds::new());
    let controller = SessionController::new(mds.clone(), relay.clone(), config);

    let reply = controller
        .handle(MethodCall::new("connect").arg("address", ADDRESS))
        .await;
    println!("connect: {:?}", reply);
    mds.complete_connection(ADDRESS, SERIAL).await;

    let reply = controller.handle(MethodCall::new("startECG")).await;
    println!("startECG: {:?}", reply);

    let ecg_resource = format!("/Meas/ECG/{}", controller.config().default_sample_rate);
    let mut interval = time::interval(Duration::from_millis(100));
    for i in 0..10 {
        interval.tick().await;

        let samples: Vec<i32> = (0..4).map(|n| ((i * 4 + n) % 16) * 25 - 200).collect();
        let ecg = serde_json::json!({ "Body": { "Samples": samples, "Timestamp": i * 100 } });
        mds.notify(&ecg_resource, &ecg.to_string()).await;

        if i % 5 == 0 {
            let average = 70.0 + i as f32 * 0.3;
            let hr = serde_json::json!({ "Body": { "average": average, "rrData": [850] } });
            mds.notify("/Meas/HR", &hr.to_string()).await;
        }
    }

    let reply = controller.handle(MethodCall::new("stopECG")).await;
    println!("stopECG: {:?}", reply);

    let reply = controller
        .handle(MethodCall::new("disconnect").arg("address", ADDRESS))
        .await;
    println!("disconnect: {:?}", reply);

    // Dropping the last relay handle lets the UI context finish what is queued
    drop(controller);
    drop(relay);
    match time::timeout(Duration::from_secs(1), ui_task).await {
        Ok(joined) => joined?,
        Err(_) => info!("UI context still running, exiting"),
    }

    Ok(())
}
