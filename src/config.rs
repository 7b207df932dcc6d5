//! System configuration parameters
//!
//! All tunable parameters for the TogglePub firmware: broker connection,
//! topics, quality of service, debounce window and the retry policy owned
//! by the connection supervisor. Defaults are compiled in; a JSON blob can
//! override them at boot.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::publish::QoS;
use crate::drivers::button::DEFAULT_DEBOUNCE_MS;
use crate::error::{Error, Result};

/// Identifier baked into every topic and used as client id / username.
pub const DEVICE_ID: &str = "e312050e-3060-4c89-9108-bbd6ad301342";

/// Payload published when the button asks the remote device to switch on.
pub const DEVICE_ON_MESSAGE: &str = "TURN ON";
/// Payload published when the button asks the remote device to switch off.
pub const DEVICE_OFF_MESSAGE: &str = "TURN OFF";

/// Slots in the interrupt → publisher command queue.
pub const INBOUND_QUEUE_DEPTH: usize = 3;
/// Slots in the publisher → supervisor escalation queue.
pub const ESCALATION_QUEUE_DEPTH: usize = 1;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    // --- Broker ---
    /// Broker host name
    pub broker_host: String<64>,
    /// Broker TCP port
    pub broker_port: u16,
    /// Use `mqtts://` (server TLS)
    pub secure: bool,
    /// MQTT client identifier
    pub client_id: String<64>,
    /// Username sent in CONNECT
    pub username: String<64>,
    /// Password sent in CONNECT
    pub password: String<64>,

    // --- Topics ---
    /// Topic every toggle is published on
    pub publish_topic: String<128>,
    /// Topic filter the session subscribes to for device commands
    pub subscribe_topic: String<128>,
    /// QoS level for publish and subscribe (0, 1 or 2)
    pub qos: u8,

    // --- Timing ---
    /// Minimum time between the first edge and an accepted toggle (ms)
    pub debounce_ms: u32,
    /// Timeout for MQTT operations (ms)
    pub mqtt_timeout_ms: u32,
    /// Keep-alive ping interval (seconds)
    pub keep_alive_secs: u16,

    // --- Retry policy (connection supervisor) ---
    /// Reconnect attempts after an escalated failure
    pub max_conn_retries: u16,
    /// Delay between reconnect attempts (ms)
    pub conn_retry_interval_ms: u32,

    // --- Network link ---
    /// Wi-Fi station SSID
    pub wifi_ssid: String<32>,
    /// Wi-Fi station password (empty for open networks)
    pub wifi_password: String<64>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            // Broker
            broker_host: fixed("mqtt.tesaiot.com"),
            broker_port: 8884, // server-TLS, password auth
            secure: true,
            client_id: fixed(DEVICE_ID),
            username: fixed(DEVICE_ID),
            password: String::new(),

            // Topics
            publish_topic: topic(DEVICE_ID, "/telemetry"),
            subscribe_topic: topic(DEVICE_ID, "/commands/#"),
            qos: 1,

            // Timing
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            mqtt_timeout_ms: 10_000, // room for the QoS 1 PUBACK
            keep_alive_secs: 180,

            // Retry policy
            max_conn_retries: 150,
            conn_retry_interval_ms: 2000,

            // Network link
            wifi_ssid: String::new(),
            wifi_password: String::new(),
        }
    }
}

impl PublisherConfig {
    /// Parse a JSON override blob and validate it.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let config: Self =
            serde_json::from_slice(bytes).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the publish path cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.broker_host.is_empty() {
            return Err(Error::Config("broker host is empty"));
        }
        if self.broker_port == 0 {
            return Err(Error::Config("broker port is zero"));
        }
        if self.publish_topic.is_empty() {
            return Err(Error::Config("publish topic is empty"));
        }
        QoS::from_u8(self.qos)?;
        if self.debounce_ms == 0 {
            return Err(Error::Config("debounce window must be at least 1 ms"));
        }
        if self.keep_alive_secs == 0 {
            return Err(Error::Config("keep-alive must be non-zero"));
        }
        Ok(())
    }

    /// Validated QoS level.
    pub fn qos_level(&self) -> Result<QoS> {
        QoS::from_u8(self.qos)
    }

    /// Broker URL understood by the ESP-IDF MQTT client.
    pub fn broker_url(&self) -> std::string::String {
        let scheme = if self.secure { "mqtts" } else { "mqtt" };
        format!("{}://{}:{}", scheme, self.broker_host, self.broker_port)
    }
}

/// Copy `s` into a fixed-capacity string, truncated at the capacity.
fn fixed<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

fn topic<const N: usize>(device_id: &str, suffix: &str) -> String<N> {
    fixed(&format!("device/{device_id}{suffix}"))
}
