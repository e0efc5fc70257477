use crate::mds_uri::URI_EVENTLISTENER;
use crate::BridgeResult;

use serde::Deserialize;

/// Name of the method channel shared with the UI
pub const DEFAULT_CHANNEL: &str = "ecg_channel";
/// ECG sample rate used when `startECG` does not name one
pub const DEFAULT_SAMPLE_RATE: u32 = 125;

/// Settings for the bridge. Every field has a default, so a partial JSON object is enough.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    pub channel_name: String,
    pub default_sample_rate: u32,
    pub event_listener_uri: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            channel_name: DEFAULT_CHANNEL.to_string(),
            default_sample_rate: DEFAULT_SAMPLE_RATE,
            event_listener_uri: URI_EVENTLISTENER.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load settings from a JSON object, e.g. `{"defaultSampleRate": 250}`
    pub fn from_json(data: &str) -> BridgeResult<BridgeConfig> {
        Ok(serde_json::from_str(data)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_override() {
        let config = BridgeConfig::from_json(r#"{"defaultSampleRate": 250}"#).unwrap();

        assert_eq!(config.default_sample_rate, 250);
        assert_eq!(config.channel_name, "ecg_channel");
        assert_eq!(config.event_listener_uri, "suunto://MDS/EventListener");
    }

    #[test]
    fn empty_is_default() {
        assert_eq!(BridgeConfig::from_json("{}").unwrap(), BridgeConfig::default());
        assert!(BridgeConfig::from_json("[]").is_err());
    }
}
