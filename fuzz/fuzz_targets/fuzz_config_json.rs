//! Fuzz target: `PublisherConfig::from_json`
//!
//! Arbitrary bytes as a boot-time configuration override. Parsing must never
//! panic, and anything it accepts must pass validation and yield a usable
//! QoS level and broker URL.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use togglepub::config::PublisherConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = PublisherConfig::from_json(data) {
        assert!(config.validate().is_ok());
        assert!(config.qos_level().is_ok());
        assert!(config.debounce_ms > 0);
        let url = config.broker_url();
        assert!(url.starts_with("mqtt://") || url.starts_with("mqtts://"));
    }
});
