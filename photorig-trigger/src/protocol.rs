//! Binary UDP protocol spoken with the shutter/flash microcontrollers
//!
//! All messages are ASCII-tagged datagrams. Status and announce messages
//! carry the controller's single-byte network id as the final byte. The
//! configuration command appends a binary payload with big-endian
//! multi-byte fields.

use serde::Deserialize;
use thiserror::Error;

/// Broadcast by the gateway every discovery period.
pub const DISCOVER_MESSAGE: &[u8] = b"discovering";
/// Broadcast to every controller on a fire directive. No payload, no ack.
pub const FIRE_MESSAGE: &[u8] = b"fire";

/// Every controller drives the same number of shutter channels.
pub const CHANNEL_COUNT: u8 = 24;

const TAG_ANNOUNCE: &[u8] = b"macAddressAnnounce";
const TAG_CAPTURE_COMPLETE: &[u8] = b"captureComplete";
const TAG_RECEIVED_CONFIGURATION: &[u8] = b"receivedConfiguration";
const TAG_CONFIGURATION: &[u8] = b"configuration";

/// Datagrams the gateway can receive on its listen port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundMessage {
    /// First-contact announce from a controller.
    Announce { netid: u8 },
    /// A controller finished executing a capture.
    CaptureComplete { netid: u8 },
    /// A controller applied a configuration command.
    ReceivedConfiguration { netid: u8 },
    /// Echo of our own discovery broadcast; ignored by the listener.
    Discover,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("datagram too short ({0} bytes)")]
    TooShort(usize),
    #[error("unknown message tag")]
    UnknownTag,
}

/// Parse an inbound datagram. Messages we only ever send (configuration,
/// fire) are not accepted inbound.
pub fn parse_datagram(data: &[u8]) -> Result<InboundMessage, ProtocolError> {
    if data == DISCOVER_MESSAGE || data == b"discover" {
        return Ok(InboundMessage::Discover);
    }
    if data.len() < 2 {
        return Err(ProtocolError::TooShort(data.len()));
    }
    let (tag, netid) = (&data[..data.len() - 1], data[data.len() - 1]);
    match tag {
        t if t == TAG_ANNOUNCE => Ok(InboundMessage::Announce { netid }),
        t if t == TAG_CAPTURE_COMPLETE => Ok(InboundMessage::CaptureComplete { netid }),
        t if t == TAG_RECEIVED_CONFIGURATION => Ok(InboundMessage::ReceivedConfiguration { netid }),
        _ => Err(ProtocolError::UnknownTag),
    }
}

/// Shutter/flash settings carried by an upstream configuration payload.
/// Missing fields take the rig defaults; unknown fields are ignored so a
/// payload aimed at cameras can be applied without failing the whole round.
#[derive(Debug, Clone, Deserialize)]
pub struct ShutterConfig {
    /// Shutter open time, milliseconds.
    #[serde(default = "default_open_time")]
    pub open_time: u16,
    /// Shutter close time, milliseconds.
    #[serde(default = "default_close_time")]
    pub close_time: u16,
    /// Flash power, percent (0-100).
    #[serde(default = "default_flash_power")]
    pub flash_power: f64,
    /// Flash duration, milliseconds.
    #[serde(default = "default_flash_time")]
    pub flash_time: u16,
}

fn default_open_time() -> u16 { 100 }
fn default_close_time() -> u16 { 200 }
fn default_flash_power() -> f64 { 0.5 }
fn default_flash_time() -> u16 { 150 }

impl Default for ShutterConfig {
    fn default() -> Self {
        Self {
            open_time: default_open_time(),
            close_time: default_close_time(),
            flash_power: default_flash_power(),
            flash_time: default_flash_time(),
        }
    }
}

impl ShutterConfig {
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        serde_json::from_value(payload.clone()).unwrap_or_default()
    }

    /// Percent scaled into a byte: 100% -> 255. Rounded to nearest.
    pub fn flash_power_byte(&self) -> u8 {
        (self.flash_power * 2.55).round() as u8
    }
}

/// Encode the configuration command for one controller:
/// tag, netid, channel count, flash power byte, 3 x u16 flash duration
/// (tenths of a millisecond), then per channel a (u16 open, u16 close)
/// pair, also in tenths. Every channel gets the same pair.
pub fn encode_configuration(netid: u8, config: &ShutterConfig) -> Vec<u8> {
    let mut data = Vec::with_capacity(TAG_CONFIGURATION.len() + 3 + 6 + CHANNEL_COUNT as usize * 4);
    data.extend_from_slice(TAG_CONFIGURATION);
    data.push(netid);
    data.push(CHANNEL_COUNT);
    data.push(config.flash_power_byte());
    // times go on the wire in tenths of a millisecond; u16 caps at 6553ms
    let flash_tenths = config.flash_time.saturating_mul(10);
    for _ in 0..3 {
        data.extend_from_slice(&flash_tenths.to_be_bytes());
    }
    let open_tenths = config.open_time.saturating_mul(10);
    let close_tenths = config.close_time.saturating_mul(10);
    for _ in 0..CHANNEL_COUNT {
        data.extend_from_slice(&open_tenths.to_be_bytes());
        data.extend_from_slice(&close_tenths.to_be_bytes());
    }
    data
}
