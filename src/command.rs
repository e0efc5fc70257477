//! # Command
//!
//! Inbound method calls from the UI and the replies sent back for them
//!

use crate::{BridgeResult, Error};

use log::warn;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Error code replied when a required argument is missing
pub const INVALID_ARGS: &str = "INVALID_ARGS";

/// A method call from the UI: a name and a flat map of primitive arguments
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub arguments: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> MethodCall {
        MethodCall {
            method: method.into(),
            arguments: Map::new(),
        }
    }

    /// Adds an argument, builder style
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> MethodCall {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn has_argument(&self, key: &str) -> bool {
        self.arguments.contains_key(key)
    }

    /// String argument, `None` when absent or not a string
    pub fn argument_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    /// Unsigned integer argument, `None` when absent, not an integer or out of range
    pub fn argument_u32(&self, key: &str) -> Option<u32> {
        self.arguments
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
    }
}

/// Reply to a [`MethodCall`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodResult {
    Success,
    Error { code: String, message: String },
    NotImplemented,
    /// The call is left unanswered
    NoReply,
}

impl MethodResult {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> MethodResult {
        MethodResult::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Commands understood by the session controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect { address: String },
    /// Without an address the currently connected device is meant
    Disconnect { address: Option<String> },
    /// Start ECG and heart rate streaming. `None` uses the configured default rate.
    StartEcg { sample_rate: Option<u32> },
    StopEcg,
    Unknown(String),
}

impl Command {
    /// Decode a method call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgs`] if `connect` has no string `address`
    pub fn parse(call: &MethodCall) -> BridgeResult<Command> {
        match call.method.as_str() {
            "connect" => match call.argument_str("address") {
                Some(address) => Ok(Command::Connect {
                    address: address.to_string(),
                }),
                None => Err(Error::InvalidArgs("Address is null".to_string())),
            },
            "disconnect" => Ok(Command::Disconnect {
                address: call.argument_str("address").map(str::to_string),
            }),
            "startECG" => {
                let sample_rate = call.argument_u32("sampleRate");
                if sample_rate.is_none() && call.has_argument("sampleRate") {
                    warn!("Ignoring sampleRate {:?}", call.arguments.get("sampleRate"));
                }

                Ok(Command::StartEcg { sample_rate })
            }
            "stopECG" => Ok(Command::StopEcg),
            other => Ok(Command::Unknown(other.to_string())),
        }
    }
}
