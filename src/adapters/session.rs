//! Broker session adapters.
//!
//! Implements [`SessionPort`] (publish) and [`ConnectionPort`] (lifecycle).
//!
//! - **`target_os = "espidf"`**: [`EspSession`] wraps the ESP-IDF MQTT client.
//!   A receiver thread tracks connectivity from the connection event stream
//!   and feeds echoed toggle messages into [`DeviceState`].
//! - **all other targets**: [`SimSession`], an in-memory broker with
//!   deterministic failure injection for host tests and the simulation.
//!
//! [`SharedSession`] lets the publish coordinator and the connection
//! supervisor hold the same session from different tasks.

use std::sync::{Arc, Mutex, MutexGuard};
#[cfg(any(target_os = "espidf", test))]
use std::sync::atomic::{AtomicBool, Ordering};

use crate::app::ports::{ConnectionPort, SessionPort};
use crate::app::publish::PublishRecord;
use crate::error::{PublishError, SessionError};

#[cfg(target_os = "espidf")]
pub use esp::EspSession;
#[cfg(not(target_os = "espidf"))]
pub use sim::SimSession;

// ───────────────────────────────────────────────────────────────
// Shared handle
// ───────────────────────────────────────────────────────────────

/// One session, many tasks. Each call holds the lock for its duration, so a
/// reconnect and a publish never overlap.
pub struct SharedSession<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> SharedSession<S> {
    pub fn new(session: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Lock the session. A panic in another holder does not poison it for
    /// good: the session state is still usable.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S> Clone for SharedSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SessionPort> SessionPort for SharedSession<S> {
    fn publish(&mut self, record: &PublishRecord<'_>) -> Result<(), PublishError> {
        self.lock().publish(record)
    }
}

impl<S: ConnectionPort> ConnectionPort for SharedSession<S> {
    fn is_connected(&self) -> bool {
        self.lock().is_connected()
    }

    fn reconnect(&mut self) -> Result<(), SessionError> {
        self.lock().reconnect()
    }
}

// ───────────────────────────────────────────────────────────────
// Per-connection link flag
// ───────────────────────────────────────────────────────────────

/// Connectivity of the current broker connection.
///
/// Each connect hands out a fresh flag to its receiver. A receiver left over
/// from a dropped client keeps writing to its own flag, which nothing reads
/// any more.
#[cfg(any(target_os = "espidf", test))]
#[derive(Default)]
struct LinkState {
    current: Arc<AtomicBool>,
}

#[cfg(any(target_os = "espidf", test))]
impl LinkState {
    /// Start tracking a new connection, initially down. Returns the handle
    /// for that connection's receiver.
    fn renew(&mut self) -> Arc<AtomicBool> {
        self.current = Arc::new(AtomicBool::new(false));
        Arc::clone(&self.current)
    }

    fn is_up(&self) -> bool {
        self.current.load(Ordering::Acquire)
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF MQTT client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
    };
    use esp_idf_svc::sys::{EspError, ESP_ERR_INVALID_ARG, ESP_ERR_TIMEOUT};
    use log::{debug, info, warn};

    use crate::app::device_state::DeviceState;
    use crate::app::ports::{ConnectionPort, SessionPort};
    use crate::app::publish::{self, PublishRecord};
    use crate::config::PublisherConfig;
    use crate::error::{PublishError, SessionError};

    use super::LinkState;

    const CONNECT_POLL_MS: u64 = 100;
    const RX_STACK_KB: usize = 6;

    fn mqtt_qos(qos: publish::QoS) -> QoS {
        match qos {
            publish::QoS::AtMostOnce => QoS::AtMostOnce,
            publish::QoS::AtLeastOnce => QoS::AtLeastOnce,
            publish::QoS::ExactlyOnce => QoS::ExactlyOnce,
        }
    }

    pub struct EspSession {
        config: PublisherConfig,
        device: &'static DeviceState,
        client: Option<EspMqttClient<'static>>,
        link: LinkState,
    }

    impl EspSession {
        /// Connect to the broker and subscribe to the device command topic.
        pub fn connect(
            config: &PublisherConfig,
            device: &'static DeviceState,
        ) -> Result<Self, SessionError> {
            let mut session = Self {
                config: config.clone(),
                device,
                client: None,
                link: LinkState::default(),
            };
            session.open()?;
            Ok(session)
        }

        fn open(&mut self) -> Result<(), SessionError> {
            let url = self.config.broker_url();
            let conf = MqttClientConfiguration {
                client_id: Some(self.config.client_id.as_str()),
                username: Some(self.config.username.as_str()).filter(|u| !u.is_empty()),
                password: Some(self.config.password.as_str()).filter(|p| !p.is_empty()),
                keep_alive_interval: Some(Duration::from_secs(self.config.keep_alive_secs.into())),
                network_timeout: Duration::from_millis(self.config.mqtt_timeout_ms.into()),
                crt_bundle_attach: if self.config.secure {
                    Some(esp_idf_svc::sys::esp_crt_bundle_attach)
                } else {
                    None
                },
                ..Default::default()
            };

            info!("session: connecting to {}", url);
            let (mut client, conn) = EspMqttClient::new(url.as_str(), &conf)
                .map_err(|e: EspError| SessionError::ConnectFailed(e.code()))?;

            spawn_receiver(conn, self.link.renew(), self.device)?;

            let deadline = Instant::now() + Duration::from_millis(self.config.mqtt_timeout_ms.into());
            while !self.link.is_up() {
                if Instant::now() >= deadline {
                    warn!("session: no CONNACK within {} ms", self.config.mqtt_timeout_ms);
                    return Err(SessionError::ConnectFailed(ESP_ERR_TIMEOUT as i32));
                }
                thread::sleep(Duration::from_millis(CONNECT_POLL_MS));
            }

            let qos = self
                .config
                .qos_level()
                .map_err(|_| SessionError::ConnectFailed(ESP_ERR_INVALID_ARG as i32))?;
            client
                .subscribe(self.config.subscribe_topic.as_str(), mqtt_qos(qos))
                .map_err(|e| SessionError::ConnectFailed(e.code()))?;
            info!("session: connected, subscribed to {}", self.config.subscribe_topic);

            self.client = Some(client);
            Ok(())
        }
    }

    fn spawn_receiver(
        mut conn: EspMqttConnection,
        connected: Arc<AtomicBool>,
        device: &'static DeviceState,
    ) -> Result<(), SessionError> {
        thread::Builder::new()
            .name("mqtt-rx".into())
            .stack_size(RX_STACK_KB * 1024)
            .spawn(move || {
                // Ends when the owning client is dropped.
                while let Ok(event) = conn.next() {
                    match event.payload() {
                        EventPayload::Connected(_) => connected.store(true, Ordering::Release),
                        EventPayload::Disconnected => {
                            connected.store(false, Ordering::Release);
                            warn!("session: broker disconnected");
                        }
                        EventPayload::Received { data, details: Details::Complete, .. } => {
                            if device.apply_message(data) {
                                debug!("session: device is now {}", if device.is_on() { "on" } else { "off" });
                            }
                        }
                        _ => {}
                    }
                }
                connected.store(false, Ordering::Release);
            })
            .map(|_| ())
            .map_err(|_| SessionError::ConnectFailed(-1))
    }

    impl SessionPort for EspSession {
        fn publish(&mut self, record: &PublishRecord<'_>) -> Result<(), PublishError> {
            let client = match self.client.as_mut() {
                Some(c) if self.link.is_up() => c,
                _ => return Err(PublishError::NotConnected),
            };
            client
                .publish(record.topic, mqtt_qos(record.qos), record.retain, record.payload)
                .map(|_| ())
                .map_err(|e| PublishError::Rejected(e.code()))
        }
    }

    impl ConnectionPort for EspSession {
        fn is_connected(&self) -> bool {
            self.client.is_some() && self.link.is_up()
        }

        fn reconnect(&mut self) -> Result<(), SessionError> {
            // Dropping the client ends its receiver thread.
            self.client = None;
            self.open()
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use log::info;

    use crate::app::device_state::DeviceState;
    use crate::app::ports::{ConnectionPort, SessionPort};
    use crate::app::publish::PublishRecord;
    use crate::error::{PublishError, SessionError};

    /// In-memory broker session.
    #[derive(Default)]
    pub struct SimSession {
        connected: bool,
        reject_next: u32,
        refuse_reconnects: u32,
        reconnects: u32,
        published: Vec<(String, Vec<u8>)>,
        echo: Option<&'static DeviceState>,
    }

    impl SimSession {
        /// A session that starts out connected.
        pub fn new() -> Self {
            Self {
                connected: true,
                ..Default::default()
            }
        }

        /// Route every accepted toggle back into `device`, as the remote
        /// device would after acting on it.
        pub fn with_echo(mut self, device: &'static DeviceState) -> Self {
            self.echo = Some(device);
            self
        }

        /// Simulate a dropped broker connection.
        pub fn drop_link(&mut self) {
            self.connected = false;
        }

        /// The next `n` publishes are rejected by the broker.
        pub fn reject_next(&mut self, n: u32) {
            self.reject_next = n;
        }

        /// The next `n` reconnect attempts fail.
        pub fn refuse_reconnects(&mut self, n: u32) {
            self.refuse_reconnects = n;
        }

        pub fn published(&self) -> &[(String, Vec<u8>)] {
            &self.published
        }

        pub fn reconnects(&self) -> u32 {
            self.reconnects
        }
    }

    impl SessionPort for SimSession {
        fn publish(&mut self, record: &PublishRecord<'_>) -> Result<(), PublishError> {
            if !self.connected {
                return Err(PublishError::NotConnected);
            }
            if self.reject_next > 0 {
                self.reject_next -= 1;
                return Err(PublishError::Rejected(-1));
            }
            self.published.push((record.topic.into(), record.payload.to_vec()));
            if let Some(device) = self.echo {
                device.apply_message(record.payload);
            }
            Ok(())
        }
    }

    impl ConnectionPort for SimSession {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn reconnect(&mut self) -> Result<(), SessionError> {
            self.reconnects += 1;
            if self.refuse_reconnects > 0 {
                self.refuse_reconnects -= 1;
                return Err(SessionError::ConnectFailed(-1));
            }
            self.connected = true;
            info!("session(sim): reconnected");
            Ok(())
        }
    }
}
