/* Error taxonomy for the WS-28xx driver core.
 *
 * Using explicit variants instead of opaque strings lets the service loop
 * take structured recovery actions (e.g. retrying a `TransportFault` but
 * never retrying a `CodecFault`). */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("USB transport error: {0}")]
    TransportFault(#[from] TransportError),

    #[error("frame decode error: {0}")]
    CodecFault(#[from] CodecError),

    #[error("no response from console within the expected window")]
    ProtocolTimeout,

    #[error("transceiver is not paired with a console")]
    Unpaired,

    #[error("operation cancelled by shutdown")]
    Cancelled,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("operation timed out waiting for the driver")]
    Timeout,
}

/* USB I/O failures. Always retryable by the caller up to a budget;
 * never swallowed. */
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("USB device not found (vid={vid:#06x} pid={pid:#06x})")]
    DeviceNotFound { vid: u16, pid: u16 },

    #[error("USB control transfer failed: {0}")]
    Usb(#[from] rusb::Error),

    #[error("USB transfer returned {actual} bytes, expected {expected}")]
    ShortTransfer { expected: usize, actual: usize },
}

/* Frame decode/encode failures. Logged and discarded by the service
 * loop; never retried — the next poll cycle naturally recovers. */
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CodecError {
    #[error("frame too short: expected at least {expected}, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("checksum mismatch: computed {computed:#06x}, received {received:#06x}")]
    ChecksumMismatch { computed: u16, received: u16 },

    #[error("unknown response type {0:#04x}")]
    UnknownResponseType(u8),

    #[error("nibble field out of range: {field} = {value:#x}")]
    NibbleOutOfRange { field: &'static str, value: u32 },

    #[error("device id mismatch: frame carries {frame:#06x}, expected {expected:#06x}")]
    DeviceIdMismatch { frame: u16, expected: u16 },
}

pub type Result<T, E = DriverError> = std::result::Result<T, E>;
