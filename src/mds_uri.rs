use crate::BridgeResult;

use serde::Serialize;

/// Scheme used for every MDS resource reached through the SDK
pub const SCHEME_PREFIX: &str = "suunto://";
/// Event listener all subscriptions are made through
pub const URI_EVENTLISTENER: &str = "suunto://MDS/EventListener";
/// ECG measurement resource, followed by the sample rate
pub const URI_ECG_ROOT: &str = "/Meas/ECG/";
/// Heart rate measurement resource
pub const URI_HR: &str = "/Meas/HR";

/// A list of device resources that can be subscribed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Electrocardiogram at the given sample rate (Hz)
    Ecg { sample_rate: u32 },
    HeartRate,
}

impl Resource {
    /// Path of this resource on the device with the given serial
    pub fn path(&self, serial: &str) -> String {
        match self {
            Resource::Ecg { sample_rate } => format!("{}{}{}", serial, URI_ECG_ROOT, sample_rate),
            Resource::HeartRate => format!("{}{}", serial, URI_HR),
        }
    }
}

#[derive(Serialize)]
struct Contract<'a> {
    #[serde(rename = "Uri")]
    uri: &'a str,
}

/// Build the JSON subscription contract for a resource, e.g. `{"Uri":"2106...Meas/HR"}`
pub fn subscription_contract(serial: &str, resource: Resource) -> BridgeResult<String> {
    let path = resource.path(serial);

    Ok(serde_json::to_string(&Contract { uri: &path })?)
}
