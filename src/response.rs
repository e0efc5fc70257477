//! # Response
//!
//! Response contains the notification payloads MDS delivers for the ECG and heart rate
//! subscriptions. Structures to interpret this data are found here
//!

use crate::BridgeResult;

use serde::Deserialize;

/// ECG notification, e.g. `{"Body": {"Samples": [...], "Timestamp": 1234}, "Uri": "..."}`
#[derive(Debug, Deserialize)]
pub struct EcgResponse {
    #[serde(rename = "Body")]
    body: EcgBody,
    #[serde(rename = "Uri", default)]
    uri: Option<String>,
}

/// Body of an ECG notification
#[derive(Debug, Deserialize)]
pub struct EcgBody {
    #[serde(rename = "Samples")]
    samples: Vec<i32>,
    #[serde(rename = "Timestamp", default)]
    timestamp: Option<u32>,
}

impl EcgResponse {
    /// Parse an ECG notification payload
    pub fn new(data: &str) -> BridgeResult<EcgResponse> {
        Ok(serde_json::from_str(data)?)
    }

    /// Samples in the order the device recorded them
    pub fn samples(&self) -> &[i32] {
        &self.body.samples
    }

    /// Device timestamp of the first sample (ms)
    pub fn timestamp(&self) -> Option<u32> {
        self.body.timestamp
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Consumes self and returns all samples
    pub fn into_samples(self) -> Vec<i32> {
        self.body.samples
    }
}

/// Heart rate notification, e.g. `{"Body": {"average": 72.7, "rrData": [812]}, "Uri": "..."}`
#[derive(Debug, Deserialize)]
pub struct HrResponse {
    #[serde(rename = "Body")]
    body: HrBody,
    #[serde(rename = "Uri", default)]
    uri: Option<String>,
}

/// Body of a heart rate notification
#[derive(Debug, Deserialize)]
pub struct HrBody {
    average: f32,
    #[serde(rename = "rrData", default)]
    rr_data: Vec<u16>,
}

impl HrResponse {
    /// Parse a heart rate notification payload
    pub fn new(data: &str) -> BridgeResult<HrResponse> {
        Ok(serde_json::from_str(data)?)
    }

    /// Average heart rate as reported by the device
    pub fn average(&self) -> f32 {
        self.body.average
    }

    /// Average heart rate truncated toward zero, the value forwarded to the UI
    pub fn bpm(&self) -> i32 {
        self.body.average as i32
    }

    /// R-R intervals (ms)
    pub fn rr(&self) -> &[u16] {
        &self.body.rr_data
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;

    #[test]
    fn ecg_response_new() {
        let response = EcgResponse::new(
            concat!(
                r#"{"Body": {"Samples": [100, 102, 98], "Timestamp": 599618}, "#,
                r#""Uri": "210630000366/Meas/ECG/125", "Method": "PUT"}"#,
            ),
        )
        .unwrap();

        assert_eq!(response.samples(), &[100, 102, 98]);
        assert_eq!(response.timestamp(), Some(599618));
        assert_eq!(response.uri(), Some("210630000366/Meas/ECG/125"));
    }

    #[test]
    fn ecg_response_negative_samples() {
        let response = EcgResponse::new(r#"{"Body": {"Samples": [-1, -32768, 0]}}"#).unwrap();

        assert_eq!(response.timestamp(), None);
        assert_eq!(response.into_samples(), vec![-1, -32768, 0]);
    }

    #[test]
    fn hr_response_new() {
        let hr = HrResponse::new(r#"{"Body": {"average": 72.7, "rrData": [812, 830]}}"#).unwrap();

        assert!((hr.average() - 72.7).abs() < f32::EPSILON);
        assert_eq!(hr.bpm(), 72);
        assert_eq!(hr.rr(), &[812, 830]);
    }

    // Truncated, not rounded
    #[test]
    fn hr_bpm_truncates() {
        let hr = HrResponse::new(r#"{"Body": {"average": 59.99}}"#).unwrap();

        assert_eq!(hr.bpm(), 59);
        assert!(hr.rr().is_empty());
    }

    #[test]
    fn malformed_payloads() {
        assert!(matches!(EcgResponse::new("not json"), Err(Error::InvalidData(_))));
        assert!(matches!(EcgResponse::new(r#"{"Body": {}}"#), Err(Error::InvalidData(_))));
        assert!(matches!(
            EcgResponse::new(r#"{"Body": {"Samples": [1.5]}}"#),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            HrResponse::new(r#"{"body": {"average": 60}}"#),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(HrResponse::new("null"), Err(Error::InvalidData(_))));
    }
}
