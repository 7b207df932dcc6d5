//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter   | Implements                  | Connects to              |
//! |-----------|-----------------------------|--------------------------|
//! | `session` | SessionPort, ConnectionPort | ESP-IDF MQTT client      |
//! | `time`    | Clock                       | ESP32 system timer       |
//! | `wifi`    | -                           | ESP-IDF WiFi STA         |

pub mod session;
pub mod time;
pub mod wifi;
