use std::{
    fs,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wfrac::{generate_frame, EncodeError, Mode};

/*
Requests are POSTed as JSON to http://<host>:51443/beaver/command/<command>

{
   "apiVer":"1.0",
   "command":"setAirconStat",
   "deviceId":"homebridge-12345",
   "operatorId":"...",
   "timestamp":1700000000,
   "contents":{
      "airconId":"...",
      "airconStat":"AADrj6w..."
   }
}
*/

pub const PORT: u16 = 51443;
pub const API_VERSION: &str = "1.0";

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response has no contents.airconStat")]
    MissingAirconStat,
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
}

/// One adapter, as registered during pairing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub host: String,
    pub device_id: String,
    pub operator_id: String,
    pub aircon_id: String,
}

fn default_name() -> String {
    "WF-RAC AC".into()
}

impl DeviceConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EnvelopeError> {
        let path = path.as_ref();
        log::info!("reading device config from: {}", path.display());
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn endpoint(&self, command: Command) -> String {
        endpoint(&self.host, command)
    }

    pub fn get_aircon_stat(&self, timestamp: u64) -> Envelope {
        Envelope::new(self, Command::GetAirconStat, timestamp, None)
    }

    pub fn set_aircon_stat(
        &self,
        power: bool,
        temperature: f32,
        mode: Mode,
        timestamp: u64,
    ) -> Result<Envelope, EnvelopeError> {
        let contents = Contents {
            aircon_id: Some(self.aircon_id.clone()),
            aircon_stat: Some(generate_frame(power, temperature, mode)?),
        };
        Ok(Envelope::new(self, Command::SetAirconStat, timestamp, Some(contents)))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Command {
    GetAirconStat,
    SetAirconStat,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Contents {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aircon_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aircon_stat: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub api_ver: String,
    pub command: Command,
    pub device_id: String,
    pub operator_id: String,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Contents>,
}

impl Envelope {
    pub fn new(
        device: &DeviceConfig,
        command: Command,
        timestamp: u64,
        contents: Option<Contents>,
    ) -> Self {
        Self {
            api_ver: API_VERSION.into(),
            command,
            device_id: device.device_id.clone(),
            operator_id: device.operator_id.clone(),
            timestamp,
            contents,
        }
    }
}

/// Only `contents` matters, anything else the adapter sends back is ignored.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Response {
    #[serde(default)]
    pub contents: Option<Contents>,
}

pub fn endpoint(host: &str, command: Command) -> String {
    format!("http://{}:{}/beaver/command/{}", host, PORT, command.as_ref())
}

/// Seconds since the epoch, as the adapter wants it.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Pulls the base64 status payload out of a `getAirconStat` response body.
pub fn aircon_stat_from_response(body: &str) -> Result<String, EnvelopeError> {
    let response: Response = serde_json::from_str(body)?;
    response
        .contents
        .and_then(|c| c.aircon_stat)
        .ok_or(EnvelopeError::MissingAirconStat)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn device() -> DeviceConfig {
        serde_json::from_value(json!({
            "host": "192.168.1.20",
            "deviceId": "homebridge-4242",
            "operatorId": "9b1d0c1e-0000-4000-8000-000000000000",
            "airconId": "a0b1c2d3e4f5",
        }))
        .unwrap()
    }

    #[test]
    fn test_config() {
        let device = device();
        assert_eq!(device.name, "WF-RAC AC");
        assert_eq!(device.aircon_id, "a0b1c2d3e4f5");
        assert_eq!(
            device.endpoint(Command::SetAirconStat),
            "http://192.168.1.20:51443/beaver/command/setAirconStat"
        );
    }

    #[test]
    fn test_get_envelope() {
        let envelope = device().get_aircon_stat(1_700_000_000);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "apiVer": "1.0",
                "command": "getAirconStat",
                "deviceId": "homebridge-4242",
                "operatorId": "9b1d0c1e-0000-4000-8000-000000000000",
                "timestamp": 1_700_000_000u64,
            })
        );
    }

    #[test]
    fn test_set_envelope() {
        let envelope = device()
            .set_aircon_stat(true, 22.0, Mode::Cool, 1_700_000_000)
            .unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["command"], "setAirconStat");
        assert_eq!(value["contents"]["airconId"], "a0b1c2d3e4f5");
        assert_eq!(
            value["contents"]["airconStat"],
            "AADrj6wAAAAIAAAQCwAAAAAAAf/////MywAASQcsAAAACAAAAAEAAAAAAAH/////sDs="
        );

        assert!(matches!(
            device().set_aircon_stat(true, 99.0, Mode::Cool, 0),
            Err(EnvelopeError::Encode(EncodeError::TemperatureOutOfRange(_)))
        ));
    }

    #[test]
    fn test_response() {
        let body = r#"{"apiVer":"1.0","command":"getAirconStat","result":0,
            "contents":{"airconId":"a0b1c2d3e4f5","airconStat":"AAEC"}}"#;
        assert_eq!(aircon_stat_from_response(body).unwrap(), "AAEC");

        assert!(matches!(
            aircon_stat_from_response(r#"{"result":1}"#),
            Err(EnvelopeError::MissingAirconStat)
        ));
        assert!(matches!(
            aircon_stat_from_response("<html>"),
            Err(EnvelopeError::Json(_))
        ));
    }
}
