//! Outbound publish description.

use crate::error::{Error, Result};

/// Delivery guarantee requested for a publish. Passed straight through to
/// the session; the publish path attaches no meaning to it.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl QoS {
    pub const fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            _ => Err(Error::Config("qos must be 0, 1 or 2")),
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One publish attempt. Built on the stack right before the session call
/// and dropped right after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishRecord<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    /// Always `false`: toggles are edge events, not state.
    pub retain: bool,
    /// Always `false`: the coordinator never resends.
    pub dup: bool,
}

impl<'a> PublishRecord<'a> {
    pub fn new(topic: &'a str, payload: &'a [u8], qos: QoS) -> Self {
        Self {
            topic,
            payload,
            qos,
            retain: false,
            dup: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_levels_map_to_wire_values() {
        for level in 0..=2 {
            assert_eq!(QoS::from_u8(level).unwrap().as_u8(), level);
        }
        assert!(QoS::from_u8(3).is_err());
    }

    #[test]
    fn record_never_retains_or_duplicates() {
        let r = PublishRecord::new("t", b"TURN ON", QoS::AtLeastOnce);
        assert!(!r.retain);
        assert!(!r.dup);
        assert_eq!(r.payload, b"TURN ON");
    }
}
