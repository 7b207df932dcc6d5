//! Wi-Fi station-mode adapter.
//!
//! Brings the network link up before the broker session is opened.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF Wi-Fi driver via
//!   `esp_idf_svc::wifi::BlockingWifi`.
//! - **all other targets**: only credential validation; the simulation has
//!   no link to bring up.
//!
//! ## Connection policy
//!
//! A fixed number of connect attempts with a fixed pause between them.
//! Anything longer-lived belongs to the connection supervisor.

use core::fmt;

use heapless::String;

use crate::config::PublisherConfig;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl core::error::Error for ConnectivityError {}

/// Connect attempts before giving up on the link.
pub const CONNECT_ATTEMPTS: u32 = 5;
/// Pause between connect attempts.
pub const RETRY_DELAY_MS: u64 = 3_000;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: String<32>,
    password: String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let mut creds = Self {
            ssid: String::new(),
            password: String::new(),
        };
        creds.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(creds)
    }

    /// Credentials from the configuration. An empty SSID means none are set.
    pub fn from_config(config: &PublisherConfig) -> Result<Self, ConnectivityError> {
        if config.wifi_ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        Self::new(&config.wifi_ssid, &config.wifi_password)
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::WifiLink;

#[cfg(target_os = "espidf")]
mod esp {
    use std::thread;
    use std::time::Duration;

    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{error, info, warn};

    use super::{ConnectivityError, WifiCredentials, CONNECT_ATTEMPTS, RETRY_DELAY_MS};

    /// An up station link. Dropping it takes the link down.
    pub struct WifiLink {
        wifi: BlockingWifi<EspWifi<'static>>,
    }

    impl WifiLink {
        pub fn connect(
            modem: Modem,
            sys_loop: EspSystemEventLoop,
            nvs: Option<EspDefaultNvsPartition>,
            creds: &WifiCredentials,
        ) -> Result<Self, ConnectivityError> {
            let esp_wifi = EspWifi::new(modem, sys_loop.clone(), nvs)
                .map_err(|_| ConnectivityError::ConnectionFailed)?;
            let mut wifi = BlockingWifi::wrap(esp_wifi, sys_loop)
                .map_err(|_| ConnectivityError::ConnectionFailed)?;

            let auth_method = if creds.is_open() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            wifi.set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: creds.ssid().try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
                password: creds
                    .password()
                    .try_into()
                    .map_err(|_| ConnectivityError::InvalidPassword)?,
                auth_method,
                ..Default::default()
            }))
            .map_err(|_| ConnectivityError::ConnectionFailed)?;

            wifi.start().map_err(|_| ConnectivityError::ConnectionFailed)?;
            info!("WiFi: connecting to '{}'", creds.ssid());

            for attempt in 1..=CONNECT_ATTEMPTS {
                match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
                    Ok(()) => {
                        info!("WiFi: connected on attempt {}", attempt);
                        return Ok(Self { wifi });
                    }
                    Err(e) => warn!("WiFi: attempt {}/{} failed: {}", attempt, CONNECT_ATTEMPTS, e),
                }
                if attempt < CONNECT_ATTEMPTS {
                    if let Err(e) = wifi.disconnect() {
                        warn!("WiFi: disconnect before retry failed: {}", e);
                    }
                    thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
                }
            }

            error!("WiFi: giving up after {} attempts", CONNECT_ATTEMPTS);
            Err(ConnectivityError::ConnectionFailed)
        }

        pub fn is_up(&self) -> bool {
            self.wifi.is_connected().unwrap_or(false)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
